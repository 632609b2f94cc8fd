use crate::eq::{EqPreset, Gains, BAND_COUNT, FLAT_PRESET};
use crate::error::ConfigError;
use crate::model::RepeatMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Automatically saved session state
/// stored in `state.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistentState {
    #[serde(default = "default_volume")]
    pub volume: u8,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub repeat: RepeatMode,
    #[serde(default = "default_preset")]
    pub last_preset_name: String,
    #[serde(default = "default_eq_enabled")]
    pub eq_enabled: bool,
    #[serde(default = "default_bands")]
    pub eq_bands: Gains,
    /// User presets only; built-ins are never written out
    #[serde(default)]
    pub presets: Vec<EqPreset>,
}

fn default_volume() -> u8 {
    75
}

fn default_preset() -> String {
    FLAT_PRESET.to_string()
}

fn default_eq_enabled() -> bool {
    true
}

fn default_bands() -> Gains {
    [0.0; BAND_COUNT]
}

impl Default for PersistentState {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            shuffle: false,
            repeat: RepeatMode::Off,
            last_preset_name: default_preset(),
            eq_enabled: default_eq_enabled(),
            eq_bands: default_bands(),
            presets: Vec::new(),
        }
    }
}

impl PersistentState {
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let mut state: Self = toml::from_str(&content)?;
        state.volume = state.volume.min(100);
        Ok(state)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Save to `state.toml` in the config directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&super::AppConfig::get_state_path())
    }
}
