//! Capability traits implemented by platform bindings.
//!
//! The discovery engine never touches the filesystem, the key/value store or
//! the OS directory chooser directly. Everything goes through these traits so
//! the same logic runs against a phone's scoped storage, a local directory
//! tree, or an in-memory fake in tests.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::SystemTime;

use compact_str::CompactString;

use crate::record::ScopedHandle;

/// Type alias for boxed futures returned by async capability methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An immediate child of a directory reached by direct path.
#[derive(Debug, Clone)]
pub struct FsEntry {
    /// File name (not full path).
    pub name: CompactString,
    /// Full path.
    pub path: PathBuf,
    /// Whether this is a regular file.
    pub is_file: bool,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, if the platform reports one.
    pub modified: Option<SystemTime>,
}

/// Type of an entry listed through a scoped handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
}

/// An immediate child listed through a scoped handle.
#[derive(Debug, Clone)]
pub struct ScopedEntry {
    /// Display name. May be empty if the provider does not report one.
    pub name: CompactString,
    /// Handle addressing this entry.
    pub handle: ScopedHandle,
    /// File or directory.
    pub entry_type: EntryType,
    /// Size in bytes, if reported.
    pub size: Option<u64>,
    /// Last modification time in epoch milliseconds, if reported.
    pub last_modified_ms: Option<i64>,
}

impl ScopedEntry {
    /// Check if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    /// Check if this entry is a file.
    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }
}

/// Direct filesystem access by path.
pub trait DirectFs: Send + Sync {
    /// Check whether a path exists.
    fn exists<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, bool>;

    /// List the immediate children of a directory.
    fn list<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<Vec<FsEntry>>>;

    /// Read a whole file.
    fn read<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<Vec<u8>>>;

    /// Write a whole file, replacing any existing content.
    fn write<'a>(&'a self, path: &'a Path, contents: &'a [u8]) -> BoxFuture<'a, io::Result<()>>;

    /// Create `path` and write `contents` to it.
    ///
    /// Fails with [`io::ErrorKind::AlreadyExists`] if `path` exists, leaving
    /// it untouched. After any other failure a partial file may remain.
    fn write_new<'a>(&'a self, path: &'a Path, contents: &'a [u8])
    -> BoxFuture<'a, io::Result<()>>;

    /// Copy `from` into a newly created `to`, returning the bytes copied.
    ///
    /// `to` is claimed before `from` is opened. Fails with
    /// [`io::ErrorKind::AlreadyExists`] if `to` exists, leaving it untouched.
    /// After any other failure a partial file may remain at `to`.
    fn copy_new<'a>(&'a self, from: &'a Path, to: &'a Path) -> BoxFuture<'a, io::Result<u64>>;

    /// Rename a file, replacing the destination.
    fn rename<'a>(&'a self, from: &'a Path, to: &'a Path) -> BoxFuture<'a, io::Result<()>>;

    /// Create a directory and all missing parents.
    fn create_dir_all<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<()>>;

    /// Remove a file.
    fn remove_file<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<()>>;
}

/// Access to a user-granted directory tree through opaque handles.
pub trait ScopedAccess: Send + Sync {
    /// List the immediate children of a directory handle.
    fn list<'a>(&'a self, handle: &'a ScopedHandle)
    -> BoxFuture<'a, io::Result<Vec<ScopedEntry>>>;

    /// Read the full content of a file handle.
    fn read<'a>(&'a self, handle: &'a ScopedHandle) -> BoxFuture<'a, io::Result<Vec<u8>>>;
}

/// Durable string key/value storage.
pub trait KeyValueStore: Send + Sync {
    /// Get the value for a key.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, io::Result<Option<String>>>;

    /// Set the value for a key.
    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, io::Result<()>>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, io::Result<()>>;
}

/// OS-level prompt that lets the user grant access to a directory tree.
pub trait DirectoryChooser: Send + Sync {
    /// Show the chooser. `Ok(None)` means the user cancelled.
    fn choose(&self) -> BoxFuture<'_, io::Result<Option<ScopedHandle>>>;
}

/// Storage permission check.
pub trait PermissionGate: Send + Sync {
    /// Check and, if needed, request storage permissions.
    fn check_and_request(&self) -> BoxFuture<'_, bool>;
}
