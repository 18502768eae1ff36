//! Core types and traits for statusbox.
//!
//! This crate provides the data model shared by the discovery engine and the
//! save operations: media records, extension classification, configuration,
//! and the capability traits that platform bindings implement.

mod capability;
mod classify;
mod config;
mod error;
mod record;

pub use capability::{
    BoxFuture, DirectFs, DirectoryChooser, EntryType, FsEntry, KeyValueStore, PermissionGate,
    ScopedAccess, ScopedEntry,
};
pub use classify::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS, classify, extension, is_media_file};
pub use config::{ScannerConfig, ScannerConfigBuilder};
pub use error::{ConfigError, ScanError};
pub use record::{
    AccessMode, IdTag, MediaKind, MediaLocation, MediaRecord, RecordId, ScopedHandle,
    sort_newest_first,
};
