use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// Identifies one `load_and_play` request. Notifications carry the
/// generation they belong to so late ones for an old track can be dropped.
pub type Generation = u64;

/// Where to seek.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SeekTarget {
    /// Seconds forward (positive) or backward (negative)
    Relative(f64),
    /// Seconds from the start
    Absolute(f64),
}

/// Asynchronous notification from the audio engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineNotification {
    Position(f64),
    Duration(f64),
    PauseChanged(bool),
    EndOfMedia,
    /// The media failed after it was accepted (decode error, dropped stream)
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    pub generation: Generation,
    pub notification: EngineNotification,
}

impl EngineEvent {
    pub fn new(generation: Generation, notification: EngineNotification) -> Self {
        Self {
            generation,
            notification,
        }
    }
}

/// Channel engines publish their notifications on. Sending never blocks,
/// so it is safe from audio or decoder threads.
pub type EngineEventSender = UnboundedSender<EngineEvent>;

/// Transport contract of an audio rendering engine 🎵
///
/// Commands are requests: the engine confirms the actual transport state
/// through [`EngineNotification`]s. Only `load_and_play` failures matter to
/// the caller; the rest are logged and otherwise ignored.
///
/// `load_and_play` must not wait for the media. It refuses what it can tell
/// is unplayable on the spot and reports anything found later as
/// [`EngineNotification::Error`] under the same generation.
pub trait AudioEngine: Send {
    fn load_and_play(&mut self, url: &str, generation: Generation) -> Result<(), EngineError>;
    fn pause(&mut self) -> Result<(), EngineError>;
    fn resume(&mut self) -> Result<(), EngineError>;
    fn stop(&mut self) -> Result<(), EngineError>;
    fn seek(&mut self, target: SeekTarget) -> Result<(), EngineError>;
    fn set_volume(&mut self, percent: u8) -> Result<(), EngineError>;
    fn set_muted(&mut self, muted: bool) -> Result<(), EngineError>;
    /// Empty descriptor clears all effects.
    fn set_effects_chain(&mut self, descriptor: &str) -> Result<(), EngineError>;
}
