//! Output modules.
//!
//! An [`OutputModule`] is one generated unit: a header and an implementation
//! file with their own text buffers, preambles and suppression state. Modules
//! are declared with a [`ModuleSpec`] and owned by the orchestrator; wrappers
//! only ever see the module they are bound to.

use std::path::{Path, PathBuf};

use crate::error::WriteError;
use crate::fragment::BuildEntry;
use crate::preamble::{PreambleTemplates, Preambles};
use crate::writer::{Artifact, ArtifactKind, ArtifactWriter, PartialWrite, WriteResult};

/// Which side of the protocol a module belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleRole {
    /// Guest-side encoder sources.
    GuestEncoder,
    /// Host-side decoder sources.
    Host,
    /// Host-side sources shared by decoder and tooling.
    Common,
}

impl ModuleRole {
    /// Directory tag of the role.
    pub fn tag(&self) -> &'static str {
        match self {
            ModuleRole::GuestEncoder => "guest_encoder",
            ModuleRole::Host => "host",
            ModuleRole::Common => "common",
        }
    }
}

impl std::fmt::Display for ModuleRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Declaration of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSpec {
    /// Registry name; wrappers bind to this. Defaults to the basename.
    pub name: String,

    /// File basename without extension.
    pub basename: String,

    pub role: ModuleRole,

    /// Explicit output directory, overriding the role default.
    pub custom_dir: Option<PathBuf>,

    /// Wrap both artifacts in the namespace block.
    pub use_namespace: bool,

    /// Only the header artifact is produced.
    pub header_only: bool,

    /// Only the implementation artifact is produced.
    pub impl_only: bool,

    /// Never emit `#ifdef FEATURE` guards into this module.
    pub suppress_feature_guards: bool,

    /// Skip the default API includes in the header.
    pub suppress_api_headers: bool,

    /// Extra text appended to the header preamble.
    pub extra_header: String,

    /// Extra text appended to the implementation preamble.
    pub extra_impl: String,
}

impl ModuleSpec {
    /// Create a namespaced header + implementation module.
    pub fn new(basename: impl Into<String>, role: ModuleRole) -> Self {
        let basename = basename.into();
        Self {
            name: basename.clone(),
            basename,
            role,
            custom_dir: None,
            use_namespace: true,
            header_only: false,
            impl_only: false,
            suppress_feature_guards: false,
            suppress_api_headers: false,
            extra_header: String::new(),
            extra_impl: String::new(),
        }
    }

    /// Register the module under a name other than its basename.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Write the module to an explicit directory.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.custom_dir = Some(dir.into());
        self
    }

    /// Do not wrap the artifacts in a namespace.
    pub fn without_namespace(mut self) -> Self {
        self.use_namespace = false;
        self
    }

    /// Produce only the header artifact.
    pub fn header_only(mut self) -> Self {
        self.header_only = true;
        self
    }

    /// Produce only the implementation artifact.
    pub fn impl_only(mut self) -> Self {
        self.impl_only = true;
        self
    }

    /// Never emit feature guards.
    pub fn without_feature_guards(mut self) -> Self {
        self.suppress_feature_guards = true;
        self
    }

    /// Skip the default API includes.
    pub fn without_api_headers(mut self) -> Self {
        self.suppress_api_headers = true;
        self
    }

    /// Append text to the header preamble.
    pub fn with_extra_header(mut self, text: impl AsRef<str>) -> Self {
        self.extra_header.push_str(text.as_ref());
        self
    }

    /// Append text to the implementation preamble.
    pub fn with_extra_impl(mut self, text: impl AsRef<str>) -> Self {
        self.extra_impl.push_str(text.as_ref());
        self
    }
}

/// Outcome of finalizing one module.
#[derive(Debug)]
pub enum ModuleOutcome {
    /// Artifacts were written (or rendered, in dry-run mode).
    Written {
        module: String,
        results: Vec<WriteResult>,
    },
    /// Module was suppressed and produced nothing.
    Suppressed { module: String },
    /// An artifact could not be written; `landed` lists the files of the
    /// module that reached disk before the failure.
    Failed {
        module: String,
        error: WriteError,
        landed: Vec<PathBuf>,
    },
    /// `finalize` was already called.
    AlreadyFinalized { module: String },
}

impl ModuleOutcome {
    /// Name of the module.
    pub fn module(&self) -> &str {
        match self {
            ModuleOutcome::Written { module, .. }
            | ModuleOutcome::Suppressed { module }
            | ModuleOutcome::Failed { module, .. }
            | ModuleOutcome::AlreadyFinalized { module } => module,
        }
    }

    /// Whether the module failed to persist.
    pub fn is_failure(&self) -> bool {
        matches!(self, ModuleOutcome::Failed { .. })
    }
}

/// One generated header + implementation pair.
#[derive(Debug)]
pub struct OutputModule {
    name: String,
    basename: String,
    role: ModuleRole,
    directory: PathBuf,
    header: String,
    implementation: String,
    preambles: Preambles,
    header_only: bool,
    impl_only: bool,
    suppress_feature_guards: bool,
    suppressed: bool,
    finalized: bool,
}

impl OutputModule {
    /// Build a module writing into `directory`.
    pub fn new(spec: &ModuleSpec, directory: PathBuf, templates: &PreambleTemplates) -> Self {
        Self {
            name: spec.name.clone(),
            basename: spec.basename.clone(),
            role: spec.role,
            directory,
            header: String::new(),
            implementation: String::new(),
            preambles: Preambles::compute(spec, templates),
            header_only: spec.header_only,
            impl_only: spec.impl_only,
            suppress_feature_guards: spec.suppress_feature_guards,
            suppressed: false,
            finalized: false,
        }
    }

    /// Registry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File basename.
    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub fn role(&self) -> ModuleRole {
        self.role
    }

    /// Directory the artifacts are written to.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn accepts_writes(&self) -> bool {
        !self.suppressed && !self.finalized
    }

    /// Append text to the header buffer.
    pub fn append_header(&mut self, text: &str) {
        if self.accepts_writes() {
            self.header.push_str(text);
        }
    }

    /// Append text to the implementation buffer.
    pub fn append_impl(&mut self, text: &str) {
        if self.accepts_writes() {
            self.implementation.push_str(text);
        }
    }

    /// Whether the module brackets feature content with guards.
    pub fn uses_feature_guards(&self) -> bool {
        !self.suppress_feature_guards
    }

    /// Open the guard of `feature` in both buffers.
    pub fn open_feature_guard(&mut self, feature: &str) {
        if self.uses_feature_guards() {
            let guard = format!("#ifdef {feature}\n");
            self.append_header(&guard);
            self.append_impl(&guard);
        }
    }

    /// Close the current guard in both buffers.
    pub fn close_feature_guard(&mut self) {
        if self.uses_feature_guards() {
            self.append_header("#endif\n");
            self.append_impl("#endif\n");
        }
    }

    /// Raw header buffer, without preamble.
    pub fn header_buffer(&self) -> &str {
        &self.header
    }

    /// Raw implementation buffer, without preamble.
    pub fn impl_buffer(&self) -> &str {
        &self.implementation
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    pub fn set_suppressed(&mut self, suppressed: bool) {
        self.suppressed = suppressed;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn is_header_only(&self) -> bool {
        self.header_only
    }

    pub fn is_impl_only(&self) -> bool {
        self.impl_only
    }

    /// Path of the header artifact.
    pub fn header_path(&self) -> PathBuf {
        self.directory.join(format!("{}.h", self.basename))
    }

    /// Path of the implementation artifact.
    pub fn impl_path(&self) -> PathBuf {
        self.directory.join(format!("{}.cpp", self.basename))
    }

    /// Complete header text.
    pub fn header_text(&self) -> String {
        let p = &self.preambles;
        let mut text =
            String::with_capacity(p.header_preamble.len() + self.header.len() + p.header_postamble.len());
        text.push_str(&p.header_preamble);
        text.push_str(&self.header);
        text.push_str(&p.header_postamble);
        text
    }

    /// Complete implementation text.
    pub fn impl_text(&self) -> String {
        let p = &self.preambles;
        let mut text = String::with_capacity(
            p.impl_preamble.len() + self.implementation.len() + p.impl_postamble.len(),
        );
        text.push_str(&p.impl_preamble);
        text.push_str(&self.implementation);
        text.push_str(&p.impl_postamble);
        text
    }

    /// Artifacts this module produces, header first.
    pub fn artifacts(&self) -> Vec<Artifact> {
        let mut artifacts = Vec::with_capacity(2);
        if !self.impl_only {
            artifacts.push(Artifact::new(ArtifactKind::Header, self.header_path(), self.header_text()));
        }
        if !self.header_only {
            artifacts.push(Artifact::new(
                ArtifactKind::Implementation,
                self.impl_path(),
                self.impl_text(),
            ));
        }
        artifacts
    }

    /// Write the module's artifacts.
    ///
    /// Suppressed modules write nothing. A second call has no effect.
    pub fn finalize(&mut self, writer: &ArtifactWriter) -> ModuleOutcome {
        let module = self.name.clone();
        if self.finalized {
            return ModuleOutcome::AlreadyFinalized { module };
        }
        self.finalized = true;

        if self.suppressed {
            return ModuleOutcome::Suppressed { module };
        }

        match writer.write_module(self.artifacts()) {
            Ok(results) => ModuleOutcome::Written { module, results },
            Err(PartialWrite { landed, error }) => ModuleOutcome::Failed {
                module,
                error,
                landed: landed.iter().map(|r| r.path().to_path_buf()).collect(),
            },
        }
    }

    /// Source-list entry for the module's build target.
    pub fn build_fragment_entry(&self) -> Option<BuildEntry> {
        if self.suppressed || self.header_only {
            return None;
        }
        Some(BuildEntry {
            role: self.role,
            module: self.name.clone(),
            path: self.impl_path(),
        })
    }
}
