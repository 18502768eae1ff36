//! Durable storage for the user-granted scoped handle.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use statusbox_core::{BoxFuture, KeyValueStore, ScopedHandle};

/// Remembers the single scoped handle the user granted.
///
/// Faults are never escalated: a failed read means "nothing remembered" and
/// a failed write only costs the user another chooser prompt.
#[derive(Clone)]
pub struct ScopedAccessStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
}

impl ScopedAccessStore {
    /// Create a store that keeps the handle under `key`.
    pub fn new(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// The key the handle is stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the remembered handle, if any.
    pub async fn get(&self) -> Option<ScopedHandle> {
        match self.backend.get(&self.key).await {
            Ok(value) => value.filter(|v| !v.is_empty()).map(ScopedHandle::new),
            Err(err) => {
                tracing::warn!(key = %self.key, %err, "failed to read remembered handle");
                None
            }
        }
    }

    /// Remember a handle, replacing any previous one.
    pub async fn set(&self, handle: &ScopedHandle) {
        if let Err(err) = self.backend.set(&self.key, handle.as_str()).await {
            tracing::warn!(key = %self.key, %err, "failed to remember handle");
        }
    }

    /// Forget the remembered handle.
    pub async fn clear(&self) {
        if let Err(err) = self.backend.remove(&self.key).await {
            tracing::warn!(key = %self.key, %err, "failed to clear remembered handle");
        }
    }
}

impl std::fmt::Debug for ScopedAccessStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedAccessStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// [`KeyValueStore`] persisted as a flat TOML table in one file.
///
/// Writes go to a sibling temp file first and are renamed into place.
#[derive(Debug)]
pub struct TomlFileStore {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl TomlFileStore {
    /// Create a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> io::Result<BTreeMap<String, String>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e),
        };

        toml::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    async fn persist(&self, entries: &BTreeMap<String, String>) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = toml::to_string_pretty(entries)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let tmp = self.path.with_extension("toml.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await
    }
}

impl KeyValueStore for TomlFileStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, io::Result<Option<String>>> {
        Box::pin(async move {
            let _guard = self.lock.lock().await;
            Ok(self.load().await?.remove(key))
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(async move {
            let _guard = self.lock.lock().await;
            let mut entries = self.load().await?;
            entries.insert(key.to_string(), value.to_string());
            self.persist(&entries).await
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(async move {
            let _guard = self.lock.lock().await;
            let mut entries = self.load().await?;
            if entries.remove(key).is_some() {
                self.persist(&entries).await?;
            }
            Ok(())
        })
    }
}

/// In-memory [`KeyValueStore`]. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> T) -> io::Result<T> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| io::Error::other("memory store lock poisoned"))?;
        Ok(f(&mut entries))
    }
}

impl KeyValueStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, io::Result<Option<String>>> {
        let result = self.with_entries(|entries| entries.get(key).cloned());
        Box::pin(async move { result })
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, io::Result<()>> {
        let result = self.with_entries(|entries| {
            entries.insert(key.to_string(), value.to_string());
        });
        Box::pin(async move { result })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, io::Result<()>> {
        let result = self.with_entries(|entries| {
            entries.remove(key);
        });
        Box::pin(async move { result })
    }
}
