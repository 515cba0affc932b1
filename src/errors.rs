//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the catalog engine, providing structured
//! error types and conversion utilities for all system components.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from various system components
//! - **Output**: Structured error types with context
//! - **Error Categories**: Dataset, Lookup, Storage, Configuration, Generic
//!
//! ## Key Features
//! - Taxonomy matching the recovery model: malformed datasets fall back to
//!   last-good state, missing items are skipped, persistence failures are
//!   surfaced as recoverable warnings
//! - Automatic error conversion and chaining
//! - Recoverability classification for boundary handling

use thiserror::Error;

/// Result type used throughout the application
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Error types for the precedent catalog engine
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Payload is not a well-formed object or misses required structure.
    /// Recovered by keeping the last-good in-memory collection.
    #[error("Malformed dataset payload: {details}")]
    MalformedDataset { details: String },

    /// A lookup by id found nothing; treated as "item no longer exists".
    #[error("Item not found in catalog: {id}")]
    MissingItem { id: String },

    /// Durable-storage read/write failure for a specific collection key.
    #[error("Persistence failure for '{key}': {reason}")]
    Persistence { key: String, reason: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization failed: {message}")]
    Serialization { message: String },

    /// Validation errors
    #[error("Validation failed for field '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl CatalogError {
    /// Check if the error leaves the session in a usable state: the caller
    /// can report it and continue with prior (or partial) data.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CatalogError::MalformedDataset { .. }
                | CatalogError::MissingItem { .. }
                | CatalogError::Persistence { .. }
                | CatalogError::Database(_)
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            CatalogError::MalformedDataset { .. } => "dataset",
            CatalogError::MissingItem { .. } => "lookup",
            CatalogError::Persistence { .. }
            | CatalogError::Database(_)
            | CatalogError::Serialization { .. } => "storage",
            CatalogError::Config { .. } | CatalogError::Toml(_) => "configuration",
            CatalogError::Validation { .. } | CatalogError::Io(_) => "generic",
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Serialization {
            message: format!("JSON serialization error: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let err = CatalogError::MissingItem {
            id: "sumula_331".to_string(),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.category(), "lookup");

        let err = CatalogError::Config {
            message: "bad".to_string(),
        };
        assert!(!err.is_recoverable());
        assert_eq!(err.category(), "configuration");
    }
}
