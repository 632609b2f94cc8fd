use serde::{Deserialize, Serialize};

/// A playable song as handed over by the catalog.
///
/// The core only relies on `id` and `duration_secs`; the rest is carried
/// along for whoever renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    #[serde(default = "unknown_artist")]
    pub artist: String,
    #[serde(default = "unknown_album")]
    pub album: String,
    /// Catalog-reported length in seconds (0 when unknown)
    #[serde(default)]
    pub duration_secs: u32,
    #[serde(default)]
    pub suffix: Option<String>, // "flac", "mp3", ...
    #[serde(default)]
    pub bitrate: Option<u32>, // kbps
}

fn unknown_artist() -> String {
    "Unknown Artist".to_string()
}

fn unknown_album() -> String {
    "Unknown Album".to_string()
}

impl Track {
    pub fn new(id: &str, title: &str, duration_secs: u32) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            artist: unknown_artist(),
            album: unknown_album(),
            duration_secs,
            suffix: None,
            bitrate: None,
        }
    }

    pub fn with_artist(mut self, artist: &str) -> Self {
        self.artist = artist.to_string();
        self
    }

    pub fn with_album(mut self, album: &str) -> Self {
        self.album = album.to_string();
        self
    }
}

/// Queue repeat policy. Persisted as `off` / `all` / `one`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    /// Off -> All -> One -> Off
    pub fn next(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RepeatMode::Off => "Off",
            RepeatMode::All => "All",
            RepeatMode::One => "One",
        }
    }
}

impl std::str::FromStr for RepeatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(RepeatMode::Off),
            "all" => Ok(RepeatMode::All),
            "one" => Ok(RepeatMode::One),
            other => Err(format!("unknown repeat mode '{}'", other)),
        }
    }
}

/// Format seconds as `M:SS` or `H:MM:SS`.
pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
