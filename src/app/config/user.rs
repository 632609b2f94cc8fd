use crate::error::ConfigError;
use crate::player::DEFAULT_VOLUME_STEP;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// User-editable configuration (read-only for the app after load)
/// stored in `config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_volume_step")]
    pub volume_step: u8,
    /// Seconds for `f` / `g` without an argument
    #[serde(default = "default_seek_step")]
    pub seek_step_secs: f64,
    /// "Previous" restarts the current track past this point
    #[serde(default = "default_restart_threshold")]
    pub restart_threshold_secs: f64,
    /// How many upcoming tracks the status line lists
    #[serde(default = "default_upcoming")]
    pub upcoming_count: usize,
    /// `tracing` filter directive for the log file
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Subsonic/Navidrome server. Without one, tracks are local files or URLs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: String,
    pub username: String,
    pub password: String,
}

fn default_volume_step() -> u8 {
    DEFAULT_VOLUME_STEP
}

fn default_seek_step() -> f64 {
    10.0
}

fn default_restart_threshold() -> f64 {
    3.0
}

fn default_upcoming() -> usize {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            volume_step: default_volume_step(),
            seek_step_secs: default_seek_step(),
            restart_threshold_secs: default_restart_threshold(),
            upcoming_count: default_upcoming(),
            log_level: default_log_level(),
            server: None,
        }
    }
}

impl UserConfig {
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
