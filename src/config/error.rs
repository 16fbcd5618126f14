//! Errors produced by the layered configuration pipeline: file discovery,
//! `DAREBOX_*` environment handling, deserialization and validation.

use thiserror::Error;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested file (`--config` or `DAREBOX_CONFIG_FILE`)
    /// does not exist
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// The layered sources did not deserialize into `Settings`
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// A settings value failed a range or format check
    #[error("Validation error: {field} - {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// The validation error message
        message: String,
    },

    /// An environment selector such as `DAREBOX_APP_ENV` holds an
    /// unrecognized value
    #[error("Environment variable error: {0}")]
    EnvVarError(String),

    /// Conflicting sources were requested, e.g. `DAREBOX_CONFIG_DIR`
    /// together with `DAREBOX_CONFIG_FILE`
    #[error("Mutual exclusivity error: {0}")]
    MutualExclusivityError(String),

    /// Generic configuration error from config crate
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

impl ConfigError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        ConfigError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new file not found error
    pub fn file_not_found<S: Into<String>>(path: S) -> Self {
        ConfigError::FileNotFound(path.into())
    }

    /// Create a new mutual exclusivity error
    pub fn mutual_exclusivity<S: Into<String>>(message: S) -> Self {
        ConfigError::MutualExclusivityError(message.into())
    }
}
