//! 18-band gain model and the effects-chain descriptor.
//!
//! Gains live in dB (-12 to +12). The engine wants linear multipliers in
//! mpv's `superequalizer` syntax: `superequalizer=1b=1.995:2b=1.000:...`.

/// Number of EQ bands
pub const BAND_COUNT: usize = 18;

/// Per-band gains in dB
pub type Gains = [f32; BAND_COUNT];

/// Band centre frequencies in Hz
pub const EQ_BANDS: [u32; BAND_COUNT] = [
    65, 92, 131, 185, 262, 370, 523, 740, 1047, 1480, 2093, 2960, 4186, 5920, 8372, 11840, 16744,
    20000,
];

const EQ_BAND_LABELS: [&str; BAND_COUNT] = [
    "65", "92", "131", "185", "262", "370", "523", "740", "1K", "1.5K", "2.1K", "3K", "4.2K",
    "5.9K", "8.4K", "12K", "17K", "20K",
];

pub const GAIN_MIN_DB: f32 = -12.0;
pub const GAIN_MAX_DB: f32 = 12.0;

/// Valid multiplier range of the superequalizer filter
const LINEAR_MAX: f32 = 20.0;

const FILTER_NAME: &str = "superequalizer";

/// Clamp a dB value into the supported range (NaN counts as flat).
pub fn clamp_db(db: f32) -> f32 {
    if db.is_nan() {
        return 0.0;
    }
    db.clamp(GAIN_MIN_DB, GAIN_MAX_DB)
}

/// dB -> linear multiplier: `10^(dB/20)`, clamped to `[0, 20]`.
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0).clamp(0.0, LINEAR_MAX)
}

/// Linear multiplier -> dB, floored at the minimum gain.
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        return GAIN_MIN_DB;
    }
    clamp_db(20.0 * linear.log10())
}

pub fn is_flat(gains: &Gains) -> bool {
    gains.iter().all(|g| *g == 0.0)
}

/// Build the effects descriptor. Empty string means "no filter".
pub fn build_effects_string(gains: &Gains, enabled: bool) -> String {
    if !enabled || is_flat(gains) {
        return String::new();
    }

    let bands: Vec<String> = gains
        .iter()
        .enumerate()
        .map(|(i, db)| format!("{}b={:.3}", i + 1, db_to_linear(clamp_db(*db))))
        .collect();

    format!("{}={}", FILTER_NAME, bands.join(":"))
}

/// Parse a descriptor back into dB gains.
///
/// Returns `None` for the empty descriptor and for anything that is not a
/// superequalizer chain. Bands missing from the text stay flat.
pub fn descriptor_gains(descriptor: &str) -> Option<Gains> {
    let body = descriptor.trim().strip_prefix(FILTER_NAME)?.strip_prefix('=')?;

    let mut gains = [0.0; BAND_COUNT];
    for part in body.split(':').filter(|p| !p.is_empty()) {
        let (band, value) = part.split_once("b=")?;
        let band: usize = band.parse().ok()?;
        let value: f32 = value.parse().ok()?;
        if band == 0 || band > BAND_COUNT {
            return None;
        }
        gains[band - 1] = linear_to_db(value);
    }
    Some(gains)
}

/// Display label for a band, `"?"` when out of range.
pub fn band_label(index: usize) -> &'static str {
    EQ_BAND_LABELS.get(index).copied().unwrap_or("?")
}

/// Centre frequency for a band, `0` when out of range.
pub fn band_frequency(index: usize) -> u32 {
    EQ_BANDS.get(index).copied().unwrap_or(0)
}
