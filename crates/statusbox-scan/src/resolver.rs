//! Locating the status folder inside a user-granted directory tree.

use std::sync::Arc;

use statusbox_core::{BoxFuture, ScannerConfig, ScopedAccess, ScopedHandle};

/// Finds the nested target folder below a scoped root handle.
///
/// Users often grant a parent directory (the app container, or even the
/// whole media folder) rather than the status folder itself. The resolver
/// walks down through a small set of known folder names until it meets a
/// target name, giving up below `max_depth`.
#[derive(Clone)]
pub struct ScopedDirectoryResolver {
    scoped: Arc<dyn ScopedAccess>,
    target_names: Vec<String>,
    descend_names: Vec<String>,
    max_depth: u32,
}

impl ScopedDirectoryResolver {
    /// Create a resolver with explicit name lists.
    pub fn new(
        scoped: Arc<dyn ScopedAccess>,
        target_names: Vec<String>,
        descend_names: Vec<String>,
        max_depth: u32,
    ) -> Self {
        Self {
            scoped,
            target_names,
            descend_names,
            max_depth,
        }
    }

    /// Create a resolver from scanner configuration.
    pub fn from_config(scoped: Arc<dyn ScopedAccess>, config: &ScannerConfig) -> Self {
        Self::new(
            scoped,
            config.target_names.clone(),
            config.descend_names.clone(),
            config.max_resolve_depth,
        )
    }

    /// Deepest level that is still listed.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Find the target folder below `root`.
    ///
    /// Returns `None` when no target exists within the depth bound. Listing
    /// faults only prune the branch where they happen.
    pub async fn locate_target_folder(&self, root: &ScopedHandle) -> Option<ScopedHandle> {
        self.search(root, 0).await
    }

    fn search<'a>(
        &'a self,
        handle: &'a ScopedHandle,
        depth: u32,
    ) -> BoxFuture<'a, Option<ScopedHandle>> {
        Box::pin(async move {
            if depth > self.max_depth {
                return None;
            }

            let entries = match self.scoped.list(handle).await {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(%handle, depth, %err, "listing failed while resolving status folder");
                    return None;
                }
            };

            let dirs = entries.iter().filter(|e| e.is_dir());

            if let Some(target) = dirs
                .clone()
                .find(|e| self.target_names.iter().any(|n| n == e.name.as_str()))
            {
                tracing::debug!(handle = %target.handle, depth, "found status folder");
                return Some(target.handle.clone());
            }

            for entry in dirs.filter(|e| self.descend_names.iter().any(|n| n == e.name.as_str())) {
                if let Some(found) = self.search(&entry.handle, depth + 1).await {
                    return Some(found);
                }
            }

            None
        })
    }
}

impl std::fmt::Debug for ScopedDirectoryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedDirectoryResolver")
            .field("target_names", &self.target_names)
            .field("descend_names", &self.descend_names)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}
