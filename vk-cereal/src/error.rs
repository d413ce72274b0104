//! Error types for the generation engine.
//!
//! Configuration, guard and lifecycle errors abort a traversal. Write errors
//! are isolated per module and collected into the generation report instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for engine operations.
pub type GenResult<T> = Result<T, GenError>;

/// Main error type for a generation run.
#[derive(Debug, Error)]
pub enum GenError {
    /// Invalid module/wrapper/gate configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Unbalanced feature begin/end events.
    #[error("Guard imbalance: {0}")]
    Guard(#[from] GuardError),

    /// Events delivered outside begin-file/end-file.
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Malformed schema input.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Failed to persist an artifact.
    #[error("Write error: {0}")]
    Write(#[from] WriteError),
}

/// Error in the static module/wrapper/gate configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A wrapper names a module that was never registered.
    #[error("Wrapper '{wrapper}' is bound to unknown module '{module}'. Known modules: {}", .known.join(", "))]
    UnknownModule {
        wrapper: String,
        module: String,
        known: Vec<String>,
    },

    /// The suppression switch names a module that was never registered.
    #[error("Suppression switch keeps unknown module '{module}'. Known modules: {}", .known.join(", "))]
    UnknownSuppressedModule { module: String, known: Vec<String> },

    /// Two modules were registered under the same name.
    #[error("Module '{name}' is registered twice")]
    DuplicateModule { name: String },

    /// A restriction entry names a feature that is not supported.
    #[error("Wrapper restriction configured for unsupported feature '{feature}'")]
    RestrictionForUnsupportedFeature { feature: String },
}

/// Feature begin/end events did not pair up.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuardError {
    /// A feature began while another one was still active.
    #[error("Feature '{next}' begins while '{active}' is still active")]
    NestedFeature { active: String, next: String },

    /// A feature ended while no feature was active.
    #[error("End of feature without a matching begin")]
    UnmatchedEnd,

    /// The traversal ended with a feature still active.
    #[error("Traversal ended while feature '{active}' is still active")]
    UnclosedFeature { active: String },
}

/// An event arrived in a state where the orchestrator cannot accept it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    /// Schema events arrived before begin-file.
    #[error("Event '{event}' received before begin-file")]
    NotStarted { event: &'static str },

    /// begin-file arrived twice.
    #[error("begin-file received twice")]
    AlreadyStarted,

    /// Events arrived after end-file.
    #[error("Event '{event}' received after end-file; the generator is spent")]
    Spent { event: &'static str },
}

/// Malformed schema input.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A definition name appears twice within one feature.
    #[error("Definition '{name}' is declared twice in feature '{feature}'")]
    DuplicateDefinition { feature: String, name: String },

    /// A feature name appears twice in the schema.
    #[error("Feature '{name}' is declared twice")]
    DuplicateFeature { name: String },
}

/// Error writing output files.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Failed to create directory.
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write file.
    #[error("Failed to write file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create an unknown module error.
    pub fn unknown_module(
        wrapper: impl Into<String>,
        module: impl Into<String>,
        known: Vec<String>,
    ) -> Self {
        Self::UnknownModule {
            wrapper: wrapper.into(),
            module: module.into(),
            known,
        }
    }
}

impl WriteError {
    /// Path of the artifact or directory that failed.
    pub fn path(&self) -> &std::path::Path {
        match self {
            WriteError::CreateDir { path, .. } | WriteError::WriteFile { path, .. } => path,
        }
    }
}
