//! Runtime configuration, loaded from a JSON file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::compute::DEFAULT_TICK_RATE_HZ;
use crate::level::{LevelCatalog, LevelError};

/// Names the config file to read instead of the default.
pub const CONFIG_ENV_VAR: &str = "PLATFORM_GAME_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "platform_game.json";
pub const MAX_TICK_RATE_HZ: u32 = 240;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path} at `{field}`: {source}")]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("tick_rate_hz must be between 1 and 240, got {0}")]
    TickRate(u32),
    #[error(transparent)]
    Levels(#[from] LevelError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    pub tick_rate_hz: u32,
    /// Directory of `*.json` level files replacing the built-in levels.
    pub levels_dir: Option<PathBuf>,
    pub start_level: usize,
    /// Where tracing output goes; `$HOME/.platform_game.log` when unset.
    pub log_file: Option<PathBuf>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            levels_dir: None,
            start_level: 0,
            log_file: None,
        }
    }
}

impl GameConfig {
    /// Load from the file named by `PLATFORM_GAME_CONFIG`, or
    /// `platform_game.json` in the working directory.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    /// A missing file means defaults; anything else wrong with it is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_json(path, &text),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "config_missing_using_defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn from_json(path: &Path, text: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(text);
        let config: GameConfig = serde_path_to_error::deserialize(&mut deserializer).map_err(
            |err| ConfigError::Parse {
                path: path.to_path_buf(),
                field: err.path().to_string(),
                source: err.into_inner(),
            },
        )?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate_hz == 0 || self.tick_rate_hz > MAX_TICK_RATE_HZ {
            return Err(ConfigError::TickRate(self.tick_rate_hz));
        }
        Ok(())
    }

    /// The configured level directory, or the built-in levels.
    pub fn catalog(&self) -> Result<LevelCatalog, ConfigError> {
        let catalog = match &self.levels_dir {
            Some(dir) => LevelCatalog::from_dir(dir)?,
            None => LevelCatalog::builtin()?,
        };
        Ok(catalog)
    }
}
