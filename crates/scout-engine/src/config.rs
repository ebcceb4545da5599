//! Configuration loading.

use scout_common::Config;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config not found at {0}")]
    Missing(PathBuf),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from the default locations:
    /// 1. ./config/config.json
    /// 2. ~/.scout/config.json
    ///
    /// `Missing` when neither exists; credential-dependent steps are
    /// then skipped, not fatal.
    pub async fn load_default() -> Result<Config, ConfigError> {
        let local = PathBuf::from("./config/config.json");
        if local.exists() {
            return Self::load_from(&local).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".scout").join("config.json");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Err(ConfigError::Missing(local))
    }

    pub async fn load_from(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }
}
