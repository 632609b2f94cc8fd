//! Built-in 18-band EQ stage for the bundled engine.
//!
//! The engine receives the same `superequalizer` descriptor an external
//! player would, parses it back into dB gains and runs one peaking biquad
//! per band and channel.

mod limiter;

pub use limiter::limiter;

#[cfg(feature = "eq")]
use biquad::{Biquad, Coefficients, DirectForm1, ToHertz, Type, Q_BUTTERWORTH_F32};

use crate::eq::{descriptor_gains, Gains, BAND_COUNT, EQ_BANDS};
use crate::error::EngineError;
use rodio::Source;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Samples between checks for new gains
const REFRESH_SAMPLES: usize = 2048;

/// Active effects chain, shared between the engine handle and the audio
/// thread. `None` means bypass.
#[derive(Clone, Default)]
pub struct EffectsChain {
    gains: Arc<RwLock<Option<Gains>>>,
}

impl EffectsChain {
    /// Install a descriptor. The empty string clears the chain.
    pub fn apply(&self, descriptor: &str) -> Result<(), EngineError> {
        let parsed = if descriptor.trim().is_empty() {
            None
        } else {
            let gains = descriptor_gains(descriptor)
                .ok_or_else(|| EngineError::InvalidEffects(descriptor.to_string()))?;
            Some(gains)
        };
        if let Ok(mut current) = self.gains.write() {
            *current = parsed;
        }
        Ok(())
    }

    pub fn current(&self) -> Option<Gains> {
        self.gains.read().ok().and_then(|g| *g)
    }
}

/// Preamp that cancels the largest boost so the bank cannot clip on its own.
fn preamp_for(gains: &Gains) -> f32 {
    let max_boost = gains.iter().cloned().fold(0.0f32, f32::max);
    if max_boost > 0.0 {
        10.0_f32.powf(-max_boost / 20.0)
    } else {
        1.0
    }
}

#[cfg(feature = "eq")]
fn peaking(sample_rate: f32, freq: f32, gain_db: f32) -> Option<Coefficients<f32>> {
    Coefficients::<f32>::from_params(
        Type::PeakingEQ(gain_db),
        sample_rate.hz(),
        freq.hz(),
        Q_BUTTERWORTH_F32,
    )
    .ok()
}

/// Per-channel peaking filters for every band below Nyquist.
#[cfg(feature = "eq")]
struct FilterBank {
    sample_rate: f32,
    /// (band index, centre frequency)
    bands: Vec<(usize, f32)>,
    channels: Vec<Vec<DirectForm1<f32>>>,
}

#[cfg(feature = "eq")]
impl FilterBank {
    fn new(sample_rate: u32, channels: u16) -> Self {
        let sample_rate = sample_rate.max(1) as f32;
        let nyquist = sample_rate / 2.0;

        let mut bands = Vec::with_capacity(BAND_COUNT);
        let mut flat = Vec::with_capacity(BAND_COUNT);
        for (index, freq) in EQ_BANDS.iter().enumerate() {
            let freq = *freq as f32;
            if freq >= nyquist {
                continue;
            }
            if let Some(coeffs) = peaking(sample_rate, freq, 0.0) {
                bands.push((index, freq));
                flat.push(DirectForm1::<f32>::new(coeffs));
            }
        }

        Self {
            sample_rate,
            bands,
            channels: vec![flat; usize::from(channels.max(1))],
        }
    }

    fn retune(&mut self, gains: &Gains) {
        for (slot, (index, freq)) in self.bands.iter().enumerate() {
            let Some(coeffs) = peaking(self.sample_rate, *freq, gains[*index]) else {
                continue;
            };
            for filters in self.channels.iter_mut() {
                filters[slot].update_coefficients(coeffs);
            }
        }
    }

    fn process(&mut self, channel: usize, sample: f32) -> f32 {
        match self.channels.get_mut(channel) {
            Some(filters) => filters.iter_mut().fold(sample, |x, f| f.run(x)),
            None => sample,
        }
    }
}

/// Stub bank for when the eq feature is disabled
#[cfg(not(feature = "eq"))]
struct FilterBank;

#[cfg(not(feature = "eq"))]
impl FilterBank {
    fn new(_sample_rate: u32, _channels: u16) -> Self {
        Self
    }

    fn retune(&mut self, _gains: &Gains) {}

    fn process(&mut self, _channel: usize, sample: f32) -> f32 {
        sample
    }
}

/// Source adapter applying the current [`EffectsChain`].
pub struct EqSource<S> {
    inner: S,
    chain: EffectsChain,
    active: Option<Gains>,
    bank: FilterBank,
    preamp: f32,
    channels: u16,
    sample_rate: u32,
    channel: usize,
    since_refresh: usize,
}

impl<S> EqSource<S>
where
    S: Source<Item = f32>,
{
    pub fn new(inner: S, chain: EffectsChain) -> Self {
        let channels = inner.channels().max(1);
        let sample_rate = inner.sample_rate();
        let mut source = Self {
            inner,
            chain,
            active: None,
            bank: FilterBank::new(sample_rate, channels),
            preamp: 1.0,
            channels,
            sample_rate,
            channel: 0,
            since_refresh: 0,
        };
        source.refresh();
        source
    }

    fn refresh(&mut self) {
        let wanted = self.chain.current();
        if wanted == self.active {
            return;
        }
        match &wanted {
            Some(gains) => {
                self.bank.retune(gains);
                self.preamp = preamp_for(gains);
            }
            None => self.preamp = 1.0,
        }
        self.active = wanted;
    }
}

impl<S> Iterator for EqSource<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let sample = self.inner.next()?;

        // Only retune on frame boundaries
        if self.channel == 0 && self.since_refresh >= REFRESH_SAMPLES {
            self.refresh();
            self.since_refresh = 0;
        }
        self.since_refresh += 1;

        let out = if self.active.is_some() {
            limiter(self.bank.process(self.channel, sample * self.preamp))
        } else {
            sample
        };
        self.channel = (self.channel + 1) % usize::from(self.channels);
        Some(out)
    }
}

impl<S> Source for EqSource<S>
where
    S: Source<Item = f32>,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.inner.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eq::build_effects_string;
    use rodio::buffer::SamplesBuffer;

    fn tone(channels: u16, rate: u32, len: usize) -> SamplesBuffer<f32> {
        let samples: Vec<f32> = (0..len)
            .map(|i| (i as f32 * 0.05).sin() * 0.5)
            .collect();
        SamplesBuffer::new(channels, rate, samples)
    }

    fn boosted() -> String {
        let mut gains = [0.0; BAND_COUNT];
        gains[0] = 12.0;
        gains[1] = 9.0;
        build_effects_string(&gains, true)
    }

    #[test]
    fn chain_parses_and_clears() {
        let chain = EffectsChain::default();
        assert!(chain.current().is_none());

        chain.apply(&boosted()).unwrap();
        let gains = chain.current().unwrap();
        assert!((gains[0] - 12.0).abs() < 0.01);

        chain.apply("").unwrap();
        assert!(chain.current().is_none());
    }

    #[test]
    fn bogus_descriptor_is_rejected_and_keeps_chain() {
        let chain = EffectsChain::default();
        chain.apply(&boosted()).unwrap();
        let err = chain.apply("loudnorm=I=-16").unwrap_err();
        assert!(matches!(err, EngineError::InvalidEffects(_)));
        assert!(chain.current().is_some());
    }

    #[test]
    fn bypass_is_bit_exact() {
        let input: Vec<f32> = tone(2, 44_100, 512).collect();
        let output: Vec<f32> = EqSource::new(tone(2, 44_100, 512), EffectsChain::default()).collect();
        assert_eq!(input, output);
    }

    #[test]
    fn keeps_stream_format() {
        let source = EqSource::new(tone(2, 48_000, 64), EffectsChain::default());
        assert_eq!(source.channels(), 2);
        assert_eq!(source.sample_rate(), 48_000);
    }

    #[cfg(feature = "eq")]
    #[test]
    fn boost_changes_signal_within_ceiling() {
        let chain = EffectsChain::default();
        chain.apply(&boosted()).unwrap();

        let input: Vec<f32> = tone(2, 44_100, 4096).collect();
        let output: Vec<f32> = EqSource::new(tone(2, 44_100, 4096), chain).collect();
        assert_eq!(input.len(), output.len());
        assert_ne!(input, output);
        assert!(output.iter().all(|s| s.abs() <= 0.98));
    }

    #[cfg(feature = "eq")]
    #[test]
    fn bands_above_nyquist_are_skipped() {
        let bank = FilterBank::new(32_000, 2);
        assert_eq!(bank.bands.len(), BAND_COUNT - 2);
        assert_eq!(bank.channels.len(), 2);
    }

    #[test]
    fn preamp_cancels_largest_boost() {
        let mut gains = [0.0; BAND_COUNT];
        assert_eq!(preamp_for(&gains), 1.0);
        gains[4] = 6.0;
        gains[5] = -12.0;
        assert!((preamp_for(&gains) - 0.501).abs() < 0.01);
    }
}
