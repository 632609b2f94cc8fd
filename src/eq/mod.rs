//! Equalizer state: 18 band gains, an on/off switch and named presets.

pub mod gains;
pub mod presets;

pub use gains::{
    band_frequency, band_label, build_effects_string, descriptor_gains, Gains, BAND_COUNT,
    EQ_BANDS, GAIN_MAX_DB, GAIN_MIN_DB,
};
pub use presets::{get_default_presets, EqPreset, PresetBook, CUSTOM_LABEL, FLAT_PRESET};

use gains::clamp_db;
use serde::Serialize;

/// Read model pushed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EqualizerSnapshot {
    pub gains: Gains,
    pub enabled: bool,
    pub active_preset: String,
    pub presets: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Equalizer {
    gains: Gains,
    enabled: bool,
    active_preset: String,
    presets: PresetBook,
}

impl Equalizer {
    /// Start from the last active preset, or the saved custom gains when
    /// that preset no longer exists.
    pub fn new(presets: PresetBook, active_preset: &str, custom_gains: &[f32], enabled: bool) -> Self {
        let mut eq = Self {
            gains: [0.0; BAND_COUNT],
            enabled,
            active_preset: active_preset.to_string(),
            presets,
        };
        match eq.presets.find(active_preset).map(|p| p.gains.clone()) {
            Some(preset_gains) => eq.set_all(&preset_gains),
            None => eq.set_all(custom_gains),
        }
        eq.active_preset = active_preset.to_string();
        eq
    }

    /// Set one band. Returns `false` (and changes nothing) for a bad index.
    /// Any manual edit detaches the gains from the active preset.
    pub fn set_band(&mut self, index: usize, db: f32) -> bool {
        match self.gains.get_mut(index) {
            Some(gain) => {
                *gain = clamp_db(db);
                self.active_preset = CUSTOM_LABEL.to_string();
                true
            }
            None => false,
        }
    }

    /// Set bands from the front; extra values are ignored, missing ones kept.
    pub fn set_all(&mut self, values: &[f32]) {
        for (gain, db) in self.gains.iter_mut().zip(values) {
            *gain = clamp_db(*db);
        }
        self.active_preset = CUSTOM_LABEL.to_string();
    }

    pub fn reset_to_flat(&mut self) {
        self.gains = [0.0; BAND_COUNT];
        self.active_preset = FLAT_PRESET.to_string();
    }

    pub fn toggle_enabled(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    /// Replace all gains with a named preset. `false` if no such preset.
    pub fn load_preset(&mut self, name: &str) -> bool {
        let Some(preset_gains) = self.presets.find(name).map(|p| p.gains.clone()) else {
            return false;
        };
        self.gains = [0.0; BAND_COUNT];
        self.set_all(&preset_gains);
        self.active_preset = name.to_string();
        true
    }

    /// Save the current gains; returns the name actually used.
    pub fn save_as_preset(&mut self, name: &str) -> String {
        self.presets.save_custom(name, &self.gains)
    }

    pub fn effects_string(&self) -> String {
        build_effects_string(&self.gains, self.enabled)
    }

    pub fn gains(&self) -> &Gains {
        &self.gains
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn active_preset(&self) -> &str {
        &self.active_preset
    }

    pub fn presets(&self) -> &PresetBook {
        &self.presets
    }

    pub fn snapshot(&self) -> EqualizerSnapshot {
        EqualizerSnapshot {
            gains: self.gains,
            enabled: self.enabled,
            active_preset: self.active_preset.clone(),
            presets: self.presets.names(),
        }
    }
}
