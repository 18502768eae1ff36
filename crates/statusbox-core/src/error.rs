//! Error types for discovery and configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can end a discovery attempt.
///
/// Most discovery faults degrade to fewer results and never show up here.
/// Only outcomes the caller must react to differently are errors.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Storage permission was not granted; nothing was scanned.
    #[error("Storage permission not granted")]
    PermissionDenied,
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is malformed.
    #[error("Invalid config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A value failed validation.
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}
