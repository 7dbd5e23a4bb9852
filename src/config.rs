//! Application configuration
//!
//! Read from `<config dir>/playerbind/config.toml`. A missing file is created with the
//! defaults, missing keys fall back to their defaults.

use crate::assignment::AssignmentSettings;
use crate::input::CollectorSettings;
use crate::players::GameSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = "playerbind";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct InputSettings {
    /// Length of one scheduling tick
    pub tick_interval_ms: u64,
    /// Capacity of the input event channel
    pub event_buffer: usize,
    /// Sleep between empty gilrs polls
    pub poll_sleep_us: u64,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            event_buffer: 1000,
            poll_sleep_us: 100,
        }
    }
}

impl InputSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn collector_settings(&self) -> CollectorSettings {
        CollectorSettings {
            poll_sleep_us: self.poll_sleep_us,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback level when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default)]
pub struct AppConfig {
    pub assignment: AssignmentSettings,
    pub input: InputSettings,
    pub game: GameSettings,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Loads the config at `path`, writing the defaults there first if it is missing
    pub async fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if !tokio::fs::try_exists(path).await.map_err(io_err)? {
            info!("No config at {}, writing defaults", path.display());
            let config = Self::default();
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
            }
            tokio::fs::write(path, config.to_toml_string()?)
                .await
                .map_err(io_err)?;
            return Ok(config);
        }

        let content = tokio::fs::read_to_string(path).await.map_err(io_err)?;
        let config = Self::from_toml_str(&content)?;
        debug!("Loaded config from {}: {:?}", path.display(), config);
        if config.game.player_names.is_empty() {
            warn!("Config lists no player names, no game can be started");
        }
        Ok(config)
    }
}
