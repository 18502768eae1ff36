//! Local cache for media reached through scoped handles.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use statusbox_core::{DirectFs, MediaLocation, ScopedAccess, ScopedHandle};

/// Materializes scoped media into locally addressable files.
///
/// Cache entries are keyed by file name alone, so two different sources
/// sharing a name resolve to the same cache file. Entries are never evicted.
#[derive(Clone)]
pub struct MediaCache {
    fs: Arc<dyn DirectFs>,
    scoped: Arc<dyn ScopedAccess>,
    dir: PathBuf,
}

impl MediaCache {
    /// Create a cache rooted at `dir`.
    pub fn new(fs: Arc<dyn DirectFs>, scoped: Arc<dyn ScopedAccess>, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            scoped,
            dir: dir.into(),
        }
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a file name is cached under.
    pub fn cache_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Return a local path holding the content behind `handle`.
    ///
    /// An existing cache file is returned without touching the source. On
    /// any fault the original handle is returned instead, so the result is
    /// the best available display location rather than a guaranteed path.
    pub async fn materialize(&self, handle: &ScopedHandle, file_name: &str) -> MediaLocation {
        if let Err(reason) = validate_file_name(file_name) {
            tracing::warn!(%handle, file_name, reason, "refusing to cache file");
            return MediaLocation::Scoped(handle.clone());
        }

        let cache_path = self.cache_path(file_name);
        if self.fs.exists(&cache_path).await {
            return MediaLocation::Path(cache_path);
        }

        match self.fill(handle, &cache_path).await {
            Ok(()) => MediaLocation::Path(cache_path),
            Err(err) => {
                tracing::warn!(%handle, file_name, %err, "failed to cache scoped file");
                MediaLocation::Scoped(handle.clone())
            }
        }
    }

    async fn fill(&self, handle: &ScopedHandle, cache_path: &Path) -> std::io::Result<()> {
        self.fs.create_dir_all(&self.dir).await?;
        let bytes = self.scoped.read(handle).await?;

        // Only complete files may appear under the cache name
        let partial = partial_path(cache_path);
        let placed = match self.fs.write(&partial, &bytes).await {
            Ok(()) => self.fs.rename(&partial, cache_path).await,
            Err(err) => Err(err),
        };
        if placed.is_err() {
            let _ = self.fs.remove_file(&partial).await;
        }
        placed
    }
}

/// Sibling temp path a cache file is written to before it is renamed.
fn partial_path(cache_path: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);

    let name = cache_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    cache_path.with_file_name(format!(".{name}.{}-{n}.part", std::process::id()))
}

impl std::fmt::Debug for MediaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaCache")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

/// Reject names that would escape the cache directory.
fn validate_file_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("name is empty");
    }
    if name == "." || name == ".." {
        return Err("name is a relative directory");
    }
    if name.contains(['/', '\\', '\0']) {
        return Err("name contains a path separator");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::{LocalFs, LocalTreeAccess};
    use statusbox_core::{BoxFuture, FsEntry};
    use std::fs;
    use std::io;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Writes half of the content, then never finishes.
    #[derive(Default)]
    struct StallingFs {
        inner: LocalFs,
    }

    impl DirectFs for StallingFs {
        fn exists<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, bool> {
            self.inner.exists(path)
        }

        fn list<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<Vec<FsEntry>>> {
            self.inner.list(path)
        }

        fn read<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<Vec<u8>>> {
            self.inner.read(path)
        }

        fn write<'a>(
            &'a self,
            path: &'a Path,
            contents: &'a [u8],
        ) -> BoxFuture<'a, io::Result<()>> {
            Box::pin(async move {
                self.inner.write(path, &contents[..contents.len() / 2]).await?;
                std::future::pending().await
            })
        }

        fn write_new<'a>(
            &'a self,
            path: &'a Path,
            contents: &'a [u8],
        ) -> BoxFuture<'a, io::Result<()>> {
            self.inner.write_new(path, contents)
        }

        fn copy_new<'a>(&'a self, from: &'a Path, to: &'a Path) -> BoxFuture<'a, io::Result<u64>> {
            self.inner.copy_new(from, to)
        }

        fn rename<'a>(&'a self, from: &'a Path, to: &'a Path) -> BoxFuture<'a, io::Result<()>> {
            self.inner.rename(from, to)
        }

        fn create_dir_all<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<()>> {
            self.inner.create_dir_all(path)
        }

        fn remove_file<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<()>> {
            self.inner.remove_file(path)
        }
    }

    fn cache(temp: &TempDir) -> MediaCache {
        MediaCache::new(
            Arc::new(LocalFs::new()),
            Arc::new(LocalTreeAccess::new()),
            temp.path().join("cache").join("statuses"),
        )
    }

    #[tokio::test]
    async fn test_materialize_copies_bytes() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("clip.mp4");
        fs::write(&source, "video-bytes").unwrap();

        let cache = cache(&temp);
        let location = cache
            .materialize(&LocalTreeAccess::handle_for(&source), "clip.mp4")
            .await;

        let path = location.as_path().unwrap();
        assert_eq!(path, cache.cache_path("clip.mp4"));
        assert_eq!(fs::read(path).unwrap(), b"video-bytes");
    }

    #[tokio::test]
    async fn test_existing_entry_is_reused() {
        let temp = TempDir::new().unwrap();
        let cache = cache(&temp);
        fs::create_dir_all(cache.dir()).unwrap();
        fs::write(cache.cache_path("a.jpg"), "cached").unwrap();

        // The source does not exist; a hit must not read it
        let handle = LocalTreeAccess::handle_for(temp.path().join("gone.jpg"));
        let location = cache.materialize(&handle, "a.jpg").await;

        assert_eq!(location, MediaLocation::Path(cache.cache_path("a.jpg")));
        assert_eq!(fs::read(cache.cache_path("a.jpg")).unwrap(), b"cached");
    }

    #[tokio::test]
    async fn test_read_fault_falls_back_to_handle() {
        let temp = TempDir::new().unwrap();
        let cache = cache(&temp);
        let handle = LocalTreeAccess::handle_for(temp.path().join("missing.jpg"));

        let location = cache.materialize(&handle, "missing.jpg").await;

        assert_eq!(location, MediaLocation::Scoped(handle));
        assert!(!cache.cache_path("missing.jpg").exists());
    }

    #[tokio::test]
    async fn test_interrupted_fill_leaves_no_entry() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("clip.mp4");
        fs::write(&source, "0123456789").unwrap();
        let handle = LocalTreeAccess::handle_for(&source);
        let healthy = cache(&temp);
        let stalled = MediaCache::new(
            Arc::new(StallingFs::default()),
            Arc::new(LocalTreeAccess::new()),
            healthy.dir(),
        );

        // Dropped halfway through the write
        let attempt =
            tokio::time::timeout(Duration::from_millis(50), stalled.materialize(&handle, "clip.mp4"))
                .await;
        assert!(attempt.is_err());
        assert!(!healthy.cache_path("clip.mp4").exists());

        let location = healthy.materialize(&handle, "clip.mp4").await;
        assert_eq!(fs::read(location.as_path().unwrap()).unwrap(), b"0123456789");
    }

    #[tokio::test]
    async fn test_unsafe_names_are_not_cached() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("x.jpg");
        fs::write(&source, "x").unwrap();
        let handle = LocalTreeAccess::handle_for(&source);

        let location = cache(&temp).materialize(&handle, "../escape.jpg").await;

        assert_eq!(location, MediaLocation::Scoped(handle));
        assert!(!temp.path().join("cache").join("escape.jpg").exists());
    }
}
