//! Error types
//!
//! Only [`MergeError`] aborts a run. Everything recoverable (unresolved figures,
//! malformed titles, one unreadable fragment) is absorbed into the
//! [`MergeReport`](crate::report::MergeReport) instead.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A resource the pipeline cannot run without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Header,
    MainDocument,
    PartsRoot,
    FigureRoot,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Header => "header file",
            ResourceKind::MainDocument => "main document",
            ResourceKind::PartsRoot => "parts folder",
            ResourceKind::FigureRoot => "figure folder",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingResource {
    pub kind: ResourceKind,
    pub path: PathBuf,
}

impl fmt::Display for MissingResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} not found: {}", self.kind, self.path.display())
    }
}

/// Fatal errors of a merge run.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("{}", join_missing(.0))]
    MissingResources(Vec<MissingResource>),

    #[error("cannot {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn join_missing(missing: &[MissingResource]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Per-fragment failures. These are logged and the fragment is skipped.
#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("cannot read fragment {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write trimmed fragment {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FragmentError {
    pub fn path(&self) -> &PathBuf {
        match self {
            FragmentError::Read { path, .. } | FragmentError::Write { path, .. } => path,
        }
    }
}

/// Errors of the figure folder maintenance operations.
#[derive(Debug, Error)]
pub enum ArrangeError {
    #[error("cannot create folder {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot move {} to {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot delete {}: {source}", .path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors raised while running the external typesetting programs.
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("program `{program}` not found on PATH")]
    NotFound {
        program: String,
        #[source]
        source: which::Error,
    },

    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` exited with {status}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
    },

    #[error("`{program}` was terminated on request")]
    Cancelled { program: String },
}
