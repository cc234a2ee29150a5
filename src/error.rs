//! Error taxonomy for backup, diff and restore runs.
//!
//! Remote failures are classified by HTTP status so the orchestrator can tell
//! a skippable instance (404/400) from a failure that must abort the batch.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BackupError>;

#[derive(Debug, Error)]
pub enum BackupError {
    /// Remote 404: the resource was deleted upstream.
    #[error("{url} not found (404)")]
    NotFound { url: String },

    /// Remote 400: malformed or unsupported resource instance.
    #[error("{url} returned bad request (400)")]
    BadRequest { url: String },

    /// Any other non-2xx status or an unparseable body.
    #[error("{context} failed{}", .status.map(|s| format!(" with status {s}")).unwrap_or_default())]
    Upstream {
        context: String,
        status: Option<u16>,
    },

    /// The request never got a response, or its body could not be read.
    #[error("{context} failed: {source}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response did not carry the wrapper key the kind expects.
    #[error("response is missing the expected '{expected}' envelope")]
    EnvelopeMismatch { expected: String },

    #[error("failed to access {}", .path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot {} is corrupt: {reason}", .path.display())]
    SnapshotParse { path: PathBuf, reason: String },

    #[error("worker task aborted: {0}")]
    Worker(String),
}

impl BackupError {
    pub fn upstream(context: impl Into<String>, status: Option<u16>) -> Self {
        Self::Upstream {
            context: context.into(),
            status,
        }
    }

    pub fn transport(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            context: context.into(),
            source,
        }
    }

    pub fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LocalIo {
            path: path.into(),
            source,
        }
    }

    /// Downgradable errors skip one id without aborting its siblings.
    pub fn is_downgradable(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::BadRequest { .. })
    }

    /// Local errors are fatal for one id only.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::LocalIo { .. } | Self::SnapshotParse { .. })
    }
}
