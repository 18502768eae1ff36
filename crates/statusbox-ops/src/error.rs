//! Error types for save and delete operations.

use std::path::PathBuf;

use statusbox_core::{RecordId, ScopedHandle};
use thiserror::Error;

/// Errors from operations the user explicitly asked for.
#[derive(Debug, Error)]
pub enum OpsError {
    /// The save directory could not be created.
    #[error("Failed to create save directory {path}: {source}")]
    CreateDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scoped source could not be read.
    #[error("Failed to read {handle}: {source}")]
    ReadSource {
        handle: ScopedHandle,
        #[source]
        source: std::io::Error,
    },

    /// The destination file could not be written.
    #[error("Failed to write {path}: {source}")]
    WriteDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A direct source could not be copied.
    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The record's source does not match its access mode.
    #[error("Record {id} has no usable source")]
    InvalidSource { id: RecordId },

    /// A file could not be deleted.
    #[error("Failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OpsError {
    /// The path the failure is about, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::CreateDestination { path, .. }
            | Self::WriteDestination { path, .. }
            | Self::Delete { path, .. } => Some(path),
            Self::Copy { to, .. } => Some(to),
            Self::ReadSource { .. } | Self::InvalidSource { .. } => None,
        }
    }
}
