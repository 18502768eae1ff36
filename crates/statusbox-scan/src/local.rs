//! Capability implementations backed by the local filesystem.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use compact_str::CompactString;
use tokio::io::AsyncWriteExt;

use statusbox_core::{BoxFuture, DirectFs, EntryType, FsEntry, ScopedAccess, ScopedEntry, ScopedHandle};

/// [`DirectFs`] over `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    /// Create a new local filesystem capability.
    pub fn new() -> Self {
        Self
    }
}

impl DirectFs for LocalFs {
    fn exists<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, bool> {
        Box::pin(async move { tokio::fs::try_exists(path).await.unwrap_or(false) })
    }

    fn list<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<Vec<FsEntry>>> {
        Box::pin(async move {
            let mut dir = tokio::fs::read_dir(path).await?;
            let mut entries = Vec::new();

            while let Some(entry) = dir.next_entry().await? {
                let entry_path = entry.path();
                // Follow symlinks so a linked media file counts as a file
                let metadata = match tokio::fs::metadata(&entry_path).await {
                    Ok(m) => m,
                    Err(err) => {
                        tracing::debug!(path = %entry_path.display(), %err, "skipping unreadable entry");
                        continue;
                    }
                };

                entries.push(FsEntry {
                    name: CompactString::new(entry.file_name().to_string_lossy()),
                    path: entry_path,
                    is_file: metadata.is_file(),
                    size: metadata.len(),
                    modified: metadata.modified().ok(),
                });
            }

            Ok(entries)
        })
    }

    fn read<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<Vec<u8>>> {
        Box::pin(tokio::fs::read(path))
    }

    fn write<'a>(&'a self, path: &'a Path, contents: &'a [u8]) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(tokio::fs::write(path, contents))
    }

    fn write_new<'a>(
        &'a self,
        path: &'a Path,
        contents: &'a [u8],
    ) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(async move {
            let mut file = create_new(path).await?;
            file.write_all(contents).await?;
            file.flush().await
        })
    }

    fn copy_new<'a>(&'a self, from: &'a Path, to: &'a Path) -> BoxFuture<'a, io::Result<u64>> {
        Box::pin(async move {
            let mut dest = create_new(to).await?;
            let mut source = tokio::fs::File::open(from).await?;
            let copied = tokio::io::copy(&mut source, &mut dest).await?;
            dest.flush().await?;
            Ok(copied)
        })
    }

    fn rename<'a>(&'a self, from: &'a Path, to: &'a Path) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(tokio::fs::rename(from, to))
    }

    fn create_dir_all<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(tokio::fs::create_dir_all(path))
    }

    fn remove_file<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(tokio::fs::remove_file(path))
    }
}

/// Open `path` for writing, failing if it already exists.
async fn create_new(path: &Path) -> io::Result<tokio::fs::File> {
    tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
}

/// Scheme prefix for handles issued by [`LocalTreeAccess`].
const TREE_SCHEME: &str = "tree://";

/// [`ScopedAccess`] over a local directory tree.
///
/// Handles have the form `tree://<absolute path>`. This stands in for an OS
/// document provider on desktop builds and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTreeAccess;

impl LocalTreeAccess {
    /// Create a new local tree capability.
    pub fn new() -> Self {
        Self
    }

    /// Issue a handle for a local path.
    pub fn handle_for(path: impl AsRef<Path>) -> ScopedHandle {
        ScopedHandle::new(format!("{TREE_SCHEME}{}", path.as_ref().display()))
    }

    /// Resolve a handle back to its local path.
    pub fn path_of(handle: &ScopedHandle) -> io::Result<PathBuf> {
        handle
            .as_str()
            .strip_prefix(TREE_SCHEME)
            .filter(|rest| !rest.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("not a tree handle: {handle}"),
                )
            })
    }
}

impl ScopedAccess for LocalTreeAccess {
    fn list<'a>(
        &'a self,
        handle: &'a ScopedHandle,
    ) -> BoxFuture<'a, io::Result<Vec<ScopedEntry>>> {
        Box::pin(async move {
            let root = Self::path_of(handle)?;
            let mut dir = tokio::fs::read_dir(&root).await?;
            let mut entries = Vec::new();

            while let Some(entry) = dir.next_entry().await? {
                let entry_path = entry.path();
                let metadata = match tokio::fs::metadata(&entry_path).await {
                    Ok(m) => m,
                    Err(err) => {
                        tracing::debug!(path = %entry_path.display(), %err, "skipping unreadable entry");
                        continue;
                    }
                };

                let entry_type = if metadata.is_dir() {
                    EntryType::Directory
                } else {
                    EntryType::File
                };

                entries.push(ScopedEntry {
                    name: CompactString::new(entry.file_name().to_string_lossy()),
                    handle: Self::handle_for(&entry_path),
                    entry_type,
                    size: metadata.is_file().then(|| metadata.len()),
                    last_modified_ms: metadata.modified().ok().map(system_time_ms),
                });
            }

            Ok(entries)
        })
    }

    fn read<'a>(&'a self, handle: &'a ScopedHandle) -> BoxFuture<'a, io::Result<Vec<u8>>> {
        Box::pin(async move {
            let path = Self::path_of(handle)?;
            tokio::fs::read(path).await
        })
    }
}

/// Convert a system time to epoch milliseconds.
pub(crate) fn system_time_ms(time: SystemTime) -> i64 {
    chrono::DateTime::<chrono::Utc>::from(time).timestamp_millis()
}
