use crate::hotkey::{KeyCode, DEFAULT_HOTKEY_CHARACTER, DOUBLE_TAP_WINDOW};
use crate::licensing::{LicensingConfig, KEYCHAIN_SERVICE, TRIAL_DAYS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings file name inside the app's config directory
const CONFIG_FILE: &str = "config.json";

/// Error types for loading and saving settings
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not determine the config directory")]
    NoConfigDir,

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Application settings, stored as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub hotkey_character: char,
    pub double_tap_window_ms: u64,
    pub trial_days: i64,
    pub keychain_service: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            hotkey_character: DEFAULT_HOTKEY_CHARACTER,
            double_tap_window_ms: DOUBLE_TAP_WINDOW.as_millis() as u64,
            trial_days: TRIAL_DAYS,
            keychain_service: KEYCHAIN_SERVICE.to_string(),
        }
    }
}

impl CoreConfig {
    /// `<config dir>/lingobar/config.json`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join("lingobar").join(CONFIG_FILE))
    }

    /// Load settings; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: CoreConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Write settings atomically, creating the directory if needed
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        KeyCode::from_char(self.hotkey_character)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.double_tap_window_ms == 0 {
            return Err(ConfigError::Invalid(
                "double_tap_window_ms must be positive".to_string(),
            ));
        }
        // The trial can be shortened for testing but never extended
        if !(1..=TRIAL_DAYS).contains(&self.trial_days) {
            return Err(ConfigError::Invalid(format!(
                "trial_days must be between 1 and {}",
                TRIAL_DAYS
            )));
        }
        if self.keychain_service.trim().is_empty() {
            return Err(ConfigError::Invalid("keychain_service is empty".to_string()));
        }
        Ok(())
    }

    pub fn double_tap_window(&self) -> Duration {
        Duration::from_millis(self.double_tap_window_ms)
    }

    pub fn licensing(&self) -> LicensingConfig {
        LicensingConfig {
            service: self.keychain_service.clone(),
            trial_days: self.trial_days,
        }
    }
}
