//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration management for the catalog engine, supporting
//! TOML files and environment variables with validation and type-safe access
//! to all system settings.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files (TOML), environment variables
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: Type checking, range validation
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables (highest priority)
//! 2. Configuration files
//! 3. Default values (lowest priority)

use crate::errors::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Durable storage settings
    pub storage: StorageConfig,
    /// Search behavior
    pub search: SearchConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Durable storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file path
    pub db_path: PathBuf,
    /// Compress uploaded-document collections (extracted text gets large)
    pub enable_compression: bool,
}

/// Search behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum results displayed by the CLI
    pub max_results: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!("Configuration file not found: {:?}, using defaults", path);
            let mut config = Self::default();
            config.apply_env_overrides()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Config {
            message: format!("Failed to read config file {:?}: {}", path, e),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| CatalogError::Config {
            message: format!("Failed to parse config file {:?}: {}", path, e),
        })?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(db_path) = std::env::var("PRECEDENT_CATALOG_DB_PATH") {
            self.storage.db_path = PathBuf::from(db_path);
        }
        if let Ok(level) = std::env::var("PRECEDENT_CATALOG_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(max) = std::env::var("PRECEDENT_CATALOG_MAX_RESULTS") {
            self.search.max_results = max.parse().map_err(|_| CatalogError::Config {
                message: "Invalid value in PRECEDENT_CATALOG_MAX_RESULTS".to_string(),
            })?;
        }
        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.search.max_results == 0 {
            return Err(CatalogError::Validation {
                field: "search.max_results".to_string(),
                reason: "Maximum results must be greater than zero".to_string(),
            });
        }

        if self.storage.db_path.as_os_str().is_empty() {
            return Err(CatalogError::Validation {
                field: "storage.db_path".to_string(),
                reason: "Database path cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                db_path: PathBuf::from("./data/precedent_catalog.db"),
                enable_compression: true,
            },
            search: SearchConfig { max_results: 50 },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_max_results_rejected() {
        let mut config = Config::default();
        config.search.max_results = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_partial_toml() {
        let parsed: std::result::Result<Config, _> = toml::from_str(
            r#"
            [storage]
            db_path = "/tmp/catalog.db"
            enable_compression = false

            [search]
            max_results = 25

            [logging]
            level = "debug"
            "#,
        );
        let config = parsed.expect("valid config");
        assert_eq!(config.search.max_results, 25);
        assert!(!config.storage.enable_compression);
    }
}
