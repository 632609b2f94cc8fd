use crate::eq::EqualizerSnapshot;
use crate::model::Track;
use crate::player::PlaybackState;
use crate::queue::QueueSnapshot;
use serde::Serialize;

/// Pushed to the presentation layer after every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StateUpdate {
    Playback(PlaybackState),
    Queue(QueueSnapshot),
    Equalizer(EqualizerSnapshot),
    /// One-line message for the user ("End of queue", "Playback failed: ...")
    Notice(String),
}

/// Tracks to install as the queue when a play request succeeds.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueContext {
    pub tracks: Vec<Track>,
    pub start_index: usize,
}

/// Everything the presentation layer can ask for.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Play `track`; `url` defaults to the catalog's stream URL
    Play {
        track: Track,
        url: Option<String>,
        context: Option<QueueContext>,
    },
    TogglePause,
    Stop,
    Next,
    Previous,
    SeekRelative(f64),
    SeekAbsolute(f64),
    SetVolume(u8),
    VolumeUp,
    VolumeDown,
    ToggleMute,
    SetShuffle(bool),
    ToggleShuffle,
    CycleRepeat,
    Add(Track),
    InsertNext(Track),
    Remove(usize),
    Move { from: usize, to: usize },
    ClearQueue,
    JumpTo(usize),
    SetBand { index: usize, db: f32 },
    LoadPreset(String),
    SavePreset(String),
    ResetEq,
    ToggleEq,
    Quit,
}
