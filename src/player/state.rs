use crate::model::Track;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackStatus {
    pub fn label(self) -> &'static str {
        match self {
            PlaybackStatus::Stopped => "stopped",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
        }
    }
}

/// Transport state. Lives as long as the process and is updated in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    /// Only set while not stopped
    pub current_track: Option<Track>,
    pub position_secs: f64,
    pub duration_secs: f64,
    /// 0-100, unaffected by mute
    pub volume: u8,
    pub muted: bool,
    /// Set once the current track instance has been reported as played
    pub scrobble_reported: bool,
}

impl PlaybackState {
    pub fn new(volume: u8) -> Self {
        Self {
            status: PlaybackStatus::Stopped,
            current_track: None,
            position_secs: 0.0,
            duration_secs: 0.0,
            volume: volume.min(100),
            muted: false,
            scrobble_reported: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status != PlaybackStatus::Stopped
    }
}
