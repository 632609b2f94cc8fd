use std::path::{Path, PathBuf};

pub mod persistence;
pub mod user;

pub use persistence::PersistentState;
pub use user::{ServerConfig, UserConfig};

const APP_DIR: &str = "naviplay";
const CONFIG_FILE: &str = "config.toml";
const STATE_FILE: &str = "state.toml";
pub const LOG_FILE: &str = "naviplay.log";

pub struct AppConfig; // Namespace only

impl AppConfig {
    pub fn get_config_dir() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let xdg_dir = home.join(".config").join(APP_DIR);

        if !xdg_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(&xdg_dir) {
                tracing::warn!(dir = %xdg_dir.display(), error = %e, "cannot create config dir");
            }
        }

        xdg_dir
    }

    pub fn get_config_path() -> PathBuf {
        Self::get_config_dir().join(CONFIG_FILE)
    }

    pub fn get_state_path() -> PathBuf {
        Self::get_config_dir().join(STATE_FILE)
    }

    /// Load both files from the default config directory.
    pub fn load() -> (UserConfig, PersistentState) {
        Self::load_from(&Self::get_config_dir())
    }

    /// Load both files from `dir`. A missing `config.toml` is written out with
    /// defaults; anything unreadable falls back to defaults.
    pub fn load_from(dir: &Path) -> (UserConfig, PersistentState) {
        let config_path = dir.join(CONFIG_FILE);
        let state_path = dir.join(STATE_FILE);

        let user_config = if config_path.exists() {
            UserConfig::load_from(&config_path).unwrap_or_else(|e| {
                tracing::warn!(path = %config_path.display(), error = %e, "using default config");
                UserConfig::default()
            })
        } else {
            let c = UserConfig::default();
            if let Err(e) = c.save_to(&config_path) {
                tracing::warn!(path = %config_path.display(), error = %e, "cannot write default config");
            }
            c
        };

        let state = if state_path.exists() {
            PersistentState::load_from(&state_path).unwrap_or_else(|e| {
                tracing::warn!(path = %state_path.display(), error = %e, "discarding saved state");
                PersistentState::default()
            })
        } else {
            PersistentState::default()
        };

        (user_config, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eq::EqPreset;
    use crate::model::RepeatMode;

    #[test]
    fn first_run_writes_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let (config, state) = AppConfig::load_from(dir.path());

        assert_eq!(config, UserConfig::default());
        assert_eq!(state, PersistentState::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
        assert!(!dir.path().join(STATE_FILE).exists());
    }

    #[test]
    fn state_survives_a_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = PersistentState {
            volume: 40,
            shuffle: true,
            repeat: RepeatMode::One,
            last_preset_name: "Mine".to_string(),
            ..PersistentState::default()
        };
        state.eq_bands[3] = -4.5;
        state.presets.push(EqPreset::new("Mine", &state.eq_bands));
        state.save_to(&dir.path().join(STATE_FILE)).unwrap();

        let (_, loaded) = AppConfig::load_from(dir.path());
        assert_eq!(loaded, state);
    }

    #[test]
    fn corrupt_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "volume_step = \"loud\"").unwrap();
        std::fs::write(dir.path().join(STATE_FILE), "[[[").unwrap();

        let (config, state) = AppConfig::load_from(dir.path());
        assert_eq!(config, UserConfig::default());
        assert_eq!(state, PersistentState::default());
    }

    #[test]
    fn server_section_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "upcoming_count = 5\n\n[server]\nurl = \"https://music.example.org\"\nusername = \"alice\"\npassword = \"sesame\"\n",
        )
        .unwrap();

        let (config, _) = AppConfig::load_from(dir.path());
        let server = config.server.unwrap();
        assert_eq!(server.url, "https://music.example.org");
        assert_eq!(server.username, "alice");
        assert_eq!(config.upcoming_count, 5);
        assert!(!UserConfig::default().to_toml().unwrap().contains("[server]"));
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "volume_step = 10\n").unwrap();
        std::fs::write(dir.path().join(STATE_FILE), "volume = 180\nrepeat = \"all\"\n").unwrap();

        let (config, state) = AppConfig::load_from(dir.path());
        assert_eq!(config.volume_step, 10);
        assert_eq!(config.restart_threshold_secs, 3.0);
        assert_eq!(state.volume, 100);
        assert_eq!(state.repeat, RepeatMode::All);
        assert!(state.eq_enabled);
    }
}
