//! # vk-cereal-cli
//!
//! CLI library for generating the gfxstream Vulkan serialization layers.
//!
//! This crate provides the pieces behind the `vk-cereal` binary: layered
//! configuration, schema loading, generation and validation runs, and
//! console reporting.
//!
//! ## Architecture
//!
//! - [`config`] - Configuration file, environment overrides and CLI merge
//! - [`loader`] - Schema JSON loading and validation
//! - [`runner`] - Generation and validation over the gfxstream layout
//! - [`report`] - Console rendering of run reports
//! - [`error`] - Error types and exit codes

pub mod config;
pub mod error;
pub mod loader;
pub mod report;
pub mod runner;

// Re-export main types for convenience
pub use config::{CliArgs, Config, ConfigManager, EnvOverrides};
pub use error::{CliError, CliResult};
pub use loader::load_schema;
pub use runner::ValidationReport;
