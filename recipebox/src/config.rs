//! Application configuration
//!
//! Central location for collection names, user-facing prompt strings,
//! and storage limits used throughout the sync core. `StoreConfig` is the
//! only runtime-tunable piece and is read from a JSON file.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

// ===== Remote Collections =====

/// Per-owner collection holding saved recipe documents
pub const RECIPES_COLLECTION: &str = "SavedRecipes";

/// Collection holding one profile document per owner, keyed by owner id
pub const PROFILE_COLLECTION: &str = "Users";

/// Profile field holding the owner's dietary preference
pub const DIET_PREFERENCE_FIELD: &str = "diet";

// ===== Recipe Identity =====

/// Catalog id reserved for user-authored recipes
pub const CUSTOM_RECIPE_CATALOG_ID: i64 = 0;

// ===== Deletion Prompt =====

pub const DELETE_PROMPT_HEADING: &str = "Remove Recipe";
pub const DELETE_CONFIRM_LABEL: &str = "Remove";
pub const DELETE_CANCEL_LABEL: &str = "Cancel";

// ===== Storage Limits =====

/// Store configuration file name inside the data directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Default SQLite database file name inside the data directory
pub const DEFAULT_DATABASE_FILE_NAME: &str = "recipes.db";

/// Upper bound on pooled SQLite connections.
/// Writers serialize on SQLite anyway; more connections only add memory.
pub const MAX_POOL_CONNECTIONS: u32 = 16;

/// Default busy timeout for SQLite connections in milliseconds
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Capacity of the cache-updated broadcast channel.
/// Slow observers past this lag skip straight to the newest event.
pub const CACHE_EVENT_CAPACITY: usize = 16;

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_database_file_name")]
    pub database_file_name: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_database_file_name() -> String {
    DEFAULT_DATABASE_FILE_NAME.to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_file_name: default_database_file_name(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from a JSON file, using defaults if the file is absent
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).await?;
        let config: StoreConfig = serde_json::from_str(&contents)?;
        config.validate()?;

        tracing::info!("Loaded store config from {:?}", path);
        Ok(config)
    }

    /// Persist configuration as pretty JSON
    pub async fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_file_name.trim().is_empty() {
            return Err(AppError::Config(
                "database_file_name must not be empty".to_string(),
            ));
        }

        if self.max_connections == 0 || self.max_connections > MAX_POOL_CONNECTIONS {
            return Err(AppError::Config(format!(
                "max_connections must be between 1 and {}",
                MAX_POOL_CONNECTIONS
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = StoreConfig::load(&temp.path().join("missing.json"))
            .await
            .unwrap();

        assert_eq!(config, StoreConfig::default());
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, r#"{ "max_connections": 2 }"#).unwrap();

        let config = StoreConfig::load(&path).await.unwrap();

        assert_eq!(config.max_connections, 2);
        assert_eq!(config.database_file_name, DEFAULT_DATABASE_FILE_NAME);
        assert_eq!(config.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.json");

        let config = StoreConfig {
            database_file_name: "kitchen.db".to_string(),
            max_connections: 3,
            busy_timeout_ms: 250,
        };
        config.save(&path).await.unwrap();

        assert_eq!(StoreConfig::load(&path).await.unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_bad_pool_size() {
        let config = StoreConfig {
            max_connections: 0,
            ..StoreConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        let config = StoreConfig {
            max_connections: MAX_POOL_CONNECTIONS + 1,
            ..StoreConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
