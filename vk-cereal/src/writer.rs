//! Persisting rendered artifacts.
//!
//! A module's header and implementation are written as one unit: every
//! directory the unit needs is created first, then the files are written in
//! order. If a file fails, the error comes back together with the files of
//! the unit that already landed. Build fragments are a separate operation,
//! run once every module is done.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::WriteError;

/// What an artifact is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Header,
    Implementation,
    BuildFragment,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Header => "header",
            ArtifactKind::Implementation => "impl",
            ArtifactKind::BuildFragment => "build fragment",
        }
    }
}

/// Fully rendered file content and its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub content: String,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            content: content.into(),
        }
    }
}

/// One artifact that reached disk, or was rendered in dry-run mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    Written {
        kind: ArtifactKind,
        path: PathBuf,
        bytes: usize,
    },
    /// Nothing touched the disk; `content` is what would have been written.
    DryRun {
        kind: ArtifactKind,
        path: PathBuf,
        content: String,
    },
}

impl WriteResult {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            WriteResult::Written { kind, .. } | WriteResult::DryRun { kind, .. } => *kind,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path, .. } | WriteResult::DryRun { path, .. } => path,
        }
    }

    pub fn was_written(&self) -> bool {
        matches!(self, WriteResult::Written { .. })
    }

    /// Rendered text of a dry-run result.
    pub fn dry_run_content(&self) -> Option<&str> {
        match self {
            WriteResult::Written { .. } => None,
            WriteResult::DryRun { content, .. } => Some(content),
        }
    }
}

/// A module unit that stopped part way.
#[derive(Debug)]
pub struct PartialWrite {
    /// Artifacts of the unit that landed before the failure.
    pub landed: Vec<WriteResult>,
    pub error: WriteError,
}

/// Writes module units and build fragments.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactWriter {
    dry_run: bool,
}

impl ArtifactWriter {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Write the artifacts of one module, in order.
    pub fn write_module(&self, artifacts: Vec<Artifact>) -> Result<Vec<WriteResult>, PartialWrite> {
        if self.dry_run {
            return Ok(artifacts.into_iter().map(render).collect());
        }

        create_parents(artifacts.iter().map(|a| a.path.as_path())).map_err(|error| PartialWrite {
            landed: Vec::new(),
            error,
        })?;

        let mut landed = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            match persist(artifact) {
                Ok(result) => landed.push(result),
                Err(error) => return Err(PartialWrite { landed, error }),
            }
        }
        Ok(landed)
    }

    /// Write one build fragment.
    pub fn write_fragment(&self, artifact: Artifact) -> Result<WriteResult, WriteError> {
        if self.dry_run {
            return Ok(render(artifact));
        }
        create_parents(std::iter::once(artifact.path.as_path()))?;
        persist(artifact)
    }
}

fn render(artifact: Artifact) -> WriteResult {
    WriteResult::DryRun {
        kind: artifact.kind,
        path: artifact.path,
        content: artifact.content,
    }
}

/// Create each distinct parent directory once.
fn create_parents<'a>(paths: impl Iterator<Item = &'a Path>) -> Result<(), WriteError> {
    let parents: BTreeSet<&Path> = paths
        .filter_map(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .collect();
    for parent in parents {
        std::fs::create_dir_all(parent).map_err(|source| WriteError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

fn persist(artifact: Artifact) -> Result<WriteResult, WriteError> {
    std::fs::write(&artifact.path, &artifact.content).map_err(|source| WriteError::WriteFile {
        path: artifact.path.clone(),
        source,
    })?;
    trace!(kind = artifact.kind.as_str(), path = %artifact.path.display(), "Artifact written");
    Ok(WriteResult::Written {
        kind: artifact.kind,
        bytes: artifact.content.len(),
        path: artifact.path,
    })
}
