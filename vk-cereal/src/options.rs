//! Run options passed to the orchestrator.

use std::path::PathBuf;

use crate::fragment::FragmentSettings;
use crate::module::ModuleRole;
use crate::preamble::PreambleTemplates;

/// File name of the guest build fragment, written to the guest encoder dir.
pub const GUEST_FRAGMENT_FILE: &str = "sources.mk";

/// File name of the host build fragment, written to the output dir.
pub const HOST_FRAGMENT_FILE: &str = "CMakeLists.txt";

/// Everything a run needs besides the module table and the gate.
///
/// The engine never reads the process environment; callers resolve
/// overrides (environment, config file, flags) into this value.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Directory of host and common modules.
    pub output_dir: PathBuf,

    /// Directory of guest encoder modules. Defaults to `<output>/guest`.
    pub guest_encoder_dir: Option<PathBuf>,

    /// Directory of host decoder modules. Defaults to the output dir.
    pub host_decoder_dir: Option<PathBuf>,

    /// Keep only this module; every other module is suppressed.
    pub suppress_except: Option<String>,

    /// Render artifacts without touching the filesystem.
    pub dry_run: bool,

    pub templates: PreambleTemplates,

    pub fragments: FragmentSettings,
}

impl GeneratorOptions {
    /// Options writing everything under `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            guest_encoder_dir: None,
            host_decoder_dir: None,
            suppress_except: None,
            dry_run: false,
            templates: PreambleTemplates::default(),
            fragments: FragmentSettings::default(),
        }
    }

    /// Keep only `module`. An empty name turns suppression off.
    pub fn with_suppress_except(mut self, module: impl Into<String>) -> Self {
        let module = module.into();
        self.suppress_except = if module.is_empty() { None } else { Some(module) };
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_guest_encoder_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.guest_encoder_dir = Some(dir.into());
        self
    }

    pub fn with_host_decoder_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.host_decoder_dir = Some(dir.into());
        self
    }

    /// Use `command_line` in artifact banners and build fragments.
    pub fn with_command_line(mut self, command_line: impl Into<String>) -> Self {
        let command_line = command_line.into();
        self.templates.command_line = command_line.clone();
        self.fragments.command_line = command_line;
        self
    }

    /// Whether suppression mode is on.
    pub fn is_suppressing(&self) -> bool {
        self.suppress_except.is_some()
    }

    /// Resolved guest encoder directory.
    pub fn guest_dir(&self) -> PathBuf {
        self.guest_encoder_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join("guest"))
    }

    /// Resolved host decoder directory.
    pub fn host_dir(&self) -> PathBuf {
        self.host_decoder_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.clone())
    }

    /// Default directory of a role.
    pub fn role_dir(&self, role: ModuleRole) -> PathBuf {
        match role {
            ModuleRole::GuestEncoder => self.guest_dir(),
            ModuleRole::Host => self.host_dir(),
            ModuleRole::Common => self.output_dir.join("common"),
        }
    }

    /// Path of the guest build fragment.
    pub fn guest_fragment_path(&self) -> PathBuf {
        self.guest_dir().join(GUEST_FRAGMENT_FILE)
    }

    /// Path of the host build fragment.
    pub fn host_fragment_path(&self) -> PathBuf {
        self.output_dir.join(HOST_FRAGMENT_FILE)
    }
}
