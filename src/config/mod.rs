//! Configuration management for depot

pub mod schema;

pub use schema::Config;

use crate::error::{DepotError, DepotResult};
use crate::store::MemoryStoreRegistry;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("depot")
            .join("config.toml")
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> DepotResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> DepotResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| DepotError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| DepotError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> DepotResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content)
            .await
            .map_err(|e| DepotError::io(format!("writing config to {}", self.config_path.display()), e))?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Build the store registry from the `[[stores]]` entries
    pub fn registry(&self, config: &Config) -> DepotResult<MemoryStoreRegistry> {
        let stores = config
            .stores
            .iter()
            .map(|store| {
                store.to_store().map_err(|reason| DepotError::ConfigInvalid {
                    path: self.config_path.clone(),
                    reason,
                })
            })
            .collect::<DepotResult<Vec<_>>>()?;

        MemoryStoreRegistry::from_stores(stores)
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> DepotResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DepotError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
