//! # vk-cereal
//!
//! Feature-gated, multi-module source generation for Vulkan serialization
//! layers.
//!
//! A [`Schema`] (ordered features, each with its definitions and commands)
//! is replayed into a [`GeneratorOrchestrator`]. The orchestrator fans every
//! event out to a set of [`Wrapper`] emitters, each writing into one
//! [`OutputModule`], while a [`FeatureGate`] decides which features produce
//! code at all and which emitters see them.
//!
//! ## Architecture
//!
//! - [`schema`] - Typed schema model and the traversal order
//! - [`registry`] - Type registry shared by all emitters
//! - [`gate`] - Feature allow-list, per-feature restrictions, registry exceptions
//! - [`module`] - Output modules and their declarations
//! - [`preamble`] - Banner, include and namespace text around module bodies
//! - [`wrapper`] - The emitters
//! - [`orchestrator`] - Event dispatch, suppression mode, finalization
//! - [`fragment`] - Guest and host build fragments
//! - [`layout`] - The gfxstream module table, bindings and gate
//! - [`options`] - Run options
//! - [`writer`] - File output and dry-run support
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use vk_cereal::layout::{gfxstream_bindings, gfxstream_gate, gfxstream_modules, LayoutSettings};
//! use vk_cereal::{GeneratorOptions, GeneratorOrchestrator, Schema};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = GeneratorOptions::new("out").with_dry_run(true);
//! let mut orchestrator = GeneratorOrchestrator::new(
//!     options,
//!     gfxstream_gate(Vec::<String>::new())?,
//!     gfxstream_modules(&LayoutSettings::default()),
//!     gfxstream_bindings(),
//! )?;
//! let report = orchestrator.run(&Schema::default())?;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod fragment;
pub mod gate;
pub mod layout;
pub mod module;
pub mod options;
pub mod orchestrator;
pub mod preamble;
pub mod registry;
pub mod schema;
pub mod wrapper;
pub mod writer;

// Re-export main types for convenience
pub use error::{GenError, GenResult};
pub use fragment::{BuildFragments, FragmentSettings};
pub use gate::{FeatureDecision, FeatureGate};
pub use module::{ModuleOutcome, ModuleRole, ModuleSpec, OutputModule};
pub use options::GeneratorOptions;
pub use orchestrator::{FragmentOutcome, GenerationReport, GeneratorOrchestrator, State};
pub use preamble::PreambleTemplates;
pub use registry::TypeRegistry;
pub use schema::{Feature, FeatureKind, Schema, SchemaVisitor};
pub use wrapper::{EmitContext, Wrapper, WrapperBinding, WrapperKind};
pub use writer::{Artifact, ArtifactKind, ArtifactWriter, PartialWrite, WriteResult};
