//! Configuration management for cdktest

pub mod schema;

pub use schema::Config;

use crate::error::{CdkTestError, CdkTestResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// File name of project-local configuration
pub const LOCAL_CONFIG_FILE: &str = ".cdktest.toml";

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
            .join("cdktest")
            .join("config.toml")
    }

    /// Find the nearest `.cdktest.toml` in `start` or any ancestor
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(LOCAL_CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> CdkTestResult<Config> {
        self.load_merged(None).await
    }

    /// Load global configuration with a project-local file layered on top
    ///
    /// Keys set in the local file win; tables are merged key by key.
    pub async fn load_merged(&self, local: Option<&Path>) -> CdkTestResult<Config> {
        let mut merged = if self.config_path.exists() {
            read_table(&self.config_path).await?
        } else {
            debug!("Config file not found, using defaults");
            toml::Table::new()
        };

        if let Some(local) = local {
            debug!("Merging local config {}", local.display());
            merge_tables(&mut merged, read_table(local).await?);
        }

        let path = local.unwrap_or(&self.config_path);
        toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| CdkTestError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
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

async fn read_table(path: &Path) -> CdkTestResult<toml::Table> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| CdkTestError::io(format!("reading config from {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| CdkTestError::ConfigInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(overlay_table) => {
                if let Some(toml::Value::Table(base_table)) = base.get_mut(&key) {
                    merge_tables(base_table, overlay_table);
                } else {
                    base.insert(key, toml::Value::Table(overlay_table));
                }
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}
