//! Error types for the entity layer
//!
//! Finder, serializer and persistence failures all surface as [`ModelError`].
//! Nothing in this crate retries; every error reaches the caller.

use std::error::Error as StdError;

/// Result type alias for entity operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Boxed cause carried by wrapping errors
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Error types for entity operations
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// No entity matched a `*_or_fail` lookup, or a lazy reference points nowhere
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// Relationship metadata is missing or does not match the entity
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// The pairs query failed while executing
    #[error("Query execution failed for '{entity_type}': {source}")]
    QueryExecution {
        entity_type: String,
        #[source]
        source: BoxError,
    },

    /// Query arguments could not be resolved
    #[error("Query error: {0}")]
    Query(String),

    /// Primary key is missing (entity not persisted yet)
    #[error("Primary key is missing or invalid")]
    MissingPrimaryKey,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A field assignment was rejected by the entity
    #[error("Validation error: {0}")]
    Validation(String),

    /// Failure reported by the persistence manager
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

impl From<ConfigError> for ModelError {
    fn from(err: ConfigError) -> Self {
        ModelError::Configuration(err.to_string())
    }
}

/// Errors raised by a persistence manager implementation
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Persistence backend error: {0}")]
    Backend(String),

    #[error("Unknown field '{field}' on entity '{entity_type}'")]
    UnknownField { entity_type: String, field: String },
}

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: '{value}', expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Configuration parsing error: {message}")]
    ParseError { message: String },

    #[error("Configuration file error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError {
            message: err.to_string(),
        }
    }
}
