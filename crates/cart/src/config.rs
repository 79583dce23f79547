//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `MARKETPLACE_CART_DIR` - Directory for stored snapshots (default: `.marketplace`)
//! - `MARKETPLACE_CART_KEY` - Storage key for the cart snapshot (default: `marketplace-cart`)
//! - `RUST_LOG` - Log filter, read by the binary's tracing subscriber

use std::path::PathBuf;

use thiserror::Error;

use crate::persist::DEFAULT_STORAGE_KEY;
use crate::storage::{FileStorage, validate_key};

const DEFAULT_STORAGE_DIR: &str = ".marketplace";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartConfig {
    /// Directory holding snapshot files
    pub storage_dir: PathBuf,
    /// Key the cart snapshot is stored under
    pub storage_key: String,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let storage_dir = PathBuf::from(get_or_default(
            &lookup,
            "MARKETPLACE_CART_DIR",
            DEFAULT_STORAGE_DIR,
        ));
        if storage_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "MARKETPLACE_CART_DIR".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let storage_key = get_or_default(&lookup, "MARKETPLACE_CART_KEY", DEFAULT_STORAGE_KEY);
        validate_key(&storage_key).map_err(|e| {
            ConfigError::InvalidEnvVar("MARKETPLACE_CART_KEY".to_string(), e.to_string())
        })?;

        Ok(Self {
            storage_dir,
            storage_key,
        })
    }

    /// File storage rooted at the configured directory.
    #[must_use]
    pub fn file_storage(&self) -> FileStorage {
        FileStorage::new(&self.storage_dir)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a variable with a default value.
fn get_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}
