use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Analysis store tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Explicit db file location. Default: platform data dir, overridable
    /// via the SCANTRACK_DB_PATH env var.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    #[serde(default = "StoreConfig::default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Write retries on transient SQLITE_BUSY.
    #[serde(default = "StoreConfig::default_retry_attempts")]
    pub retry_attempts: u32,
}

impl StoreConfig {
    fn default_busy_timeout_ms() -> u64 {
        2500
    }
    fn default_retry_attempts() -> u32 {
        3
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            busy_timeout_ms: Self::default_busy_timeout_ms(),
            retry_attempts: Self::default_retry_attempts(),
        }
    }
}

/// Across-components pass tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Worker cap for the parallel pass. 0 = one worker per core.
    #[serde(default)]
    pub workers: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = get_config_path();

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = get_config_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}

fn get_config_path() -> PathBuf {
    let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config_dir.join("scantrack").join("config.toml")
}
