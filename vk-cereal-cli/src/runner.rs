//! Generation and validation runs over the gfxstream layout.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use vk_cereal::layout::{gfxstream_bindings, gfxstream_gate, gfxstream_modules};
use vk_cereal::preamble::banner_command;
use vk_cereal::{GenError, GenerationReport, GeneratorOrchestrator, Schema};

use crate::config::Config;
use crate::error::CliResult;

/// Canonical command line that regenerates the artifacts of `schema`.
///
/// Artifact banners name this command, so `generate` and `validate` render
/// identical text for the same schema and configuration.
pub fn regeneration_command(schema: &Path, cwd: &Path) -> String {
    let schema = schema.to_string_lossy();
    banner_command(&["vk-cereal", "generate", "--schema", &*schema], cwd)
}

/// Build an orchestrator for the gfxstream module layout.
pub fn orchestrator(config: &Config, command_line: &str) -> CliResult<GeneratorOrchestrator> {
    let gate = gfxstream_gate(config.generation.extra_features.iter().cloned())
        .map_err(GenError::from)?;
    let orchestrator = GeneratorOrchestrator::new(
        config.generator_options(command_line),
        gate,
        gfxstream_modules(&config.layout_settings()),
        gfxstream_bindings(),
    )?;
    Ok(orchestrator)
}

/// Generate every artifact for `schema`.
pub fn generate(config: &Config, schema: &Schema, command_line: &str) -> CliResult<GenerationReport> {
    let mut orchestrator = orchestrator(config, command_line)?;
    info!(
        output = %config.output.dir.display(),
        dry_run = config.output.dry_run,
        modules = orchestrator.modules().len(),
        "Generating"
    );
    let report = orchestrator.run(schema)?;
    Ok(report)
}

/// Outcome of comparing rendered artifacts with the files on disk.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Number of artifacts compared.
    pub checked: usize,

    /// Artifacts whose file content differs.
    pub stale: Vec<PathBuf>,

    /// Artifacts with no file on disk.
    pub missing: Vec<PathBuf>,
}

impl ValidationReport {
    /// Whether every artifact matches its file.
    pub fn is_up_to_date(&self) -> bool {
        self.stale.is_empty() && self.missing.is_empty()
    }
}

/// Render every artifact without writing and compare it with the file on disk.
pub fn validate(config: &Config, schema: &Schema, command_line: &str) -> CliResult<ValidationReport> {
    let mut config = config.clone();
    config.output.dry_run = true;

    let report = generate(&config, schema, command_line)?;
    let mut validation = ValidationReport::default();

    for result in report.write_results() {
        let Some(expected) = result.dry_run_content() else {
            continue;
        };
        let path = result.path();
        validation.checked += 1;

        match std::fs::read_to_string(path) {
            Ok(actual) if actual == expected => {}
            Ok(_) => {
                debug!(path = %path.display(), "Artifact is stale");
                validation.stale.push(path.to_path_buf());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Artifact is missing");
                validation.missing.push(path.to_path_buf());
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(validation)
}
