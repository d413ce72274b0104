//! Error types for the CLI.
//!
//! Engine errors are wrapped as they are; configuration and schema loading
//! get their own enums with the offending path attached.

use std::path::PathBuf;
use thiserror::Error;

use vk_cereal::error::SchemaError;
use vk_cereal::GenError;

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Main error type for CLI operations.
#[derive(Debug, Error)]
pub enum CliError {
    /// Error loading configuration.
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    /// Error loading the schema.
    #[error("Failed to load schema: {0}")]
    Load(#[from] LoadError),

    /// Fatal error during generation.
    #[error("Generation failed: {0}")]
    Generate(#[from] GenError),

    /// Some artifacts could not be written.
    #[error("{failed} artifact(s) could not be written")]
    PartialWrite { failed: usize },

    /// Validation failed (artifacts out of date).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Generic IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    ///
    /// Out-of-date artifacts and partial writes exit with 2, every other
    /// failure with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Validation(_) | CliError::PartialWrite { .. } => 2,
            _ => 1,
        }
    }
}

/// Error loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid TOML syntax.
    #[error("Invalid TOML in {path}: {message}")]
    InvalidToml { path: PathBuf, message: String },

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// IO error reading config.
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create a not found error.
    pub fn not_found(path: PathBuf) -> Self {
        Self::NotFound { path }
    }

    /// Create an invalid TOML error.
    pub fn invalid_toml(path: PathBuf, message: impl Into<String>) -> Self {
        Self::InvalidToml {
            path,
            message: message.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Error loading a schema file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Schema file not found.
    #[error("Schema file not found: {path}")]
    NotFound { path: PathBuf },

    /// Malformed JSON.
    #[error("Invalid schema JSON in {path}: {message}")]
    InvalidJson { path: PathBuf, message: String },

    /// Well-formed JSON describing an invalid schema.
    #[error("Invalid schema {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },

    /// IO error reading the schema.
    #[error("Failed to read schema {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Validation("stale".into()).exit_code(), 2);
        assert_eq!(CliError::PartialWrite { failed: 1 }.exit_code(), 2);
        assert_eq!(
            CliError::from(ConfigError::invalid_value("output.dir", "empty")).exit_code(),
            1
        );
    }

    #[test]
    fn test_config_error_message() {
        let err = ConfigError::invalid_value("generation.suppress", "unknown module");
        assert_eq!(
            err.to_string(),
            "Invalid configuration value for 'generation.suppress': unknown module"
        );
    }
}
