//! Discovery orchestrator.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};

use statusbox_core::{
    DirectFs, DirectoryChooser, KeyValueStore, MediaRecord, PermissionGate, ScanError,
    ScannerConfig, ScopedAccess, ScopedEntry, ScopedHandle, classify, is_media_file,
    sort_newest_first,
};

use crate::cache::MediaCache;
use crate::probe::PathProbe;
use crate::progress::{ScanEvent, ScanStage};
use crate::resolver::ScopedDirectoryResolver;
use crate::store::ScopedAccessStore;

/// Platform capabilities the scanner is built from.
#[derive(Clone)]
pub struct Capabilities {
    /// Direct filesystem access.
    pub fs: Arc<dyn DirectFs>,
    /// Scoped-handle access.
    pub scoped: Arc<dyn ScopedAccess>,
    /// Durable key/value storage for the remembered handle.
    pub store: Arc<dyn KeyValueStore>,
    /// OS directory chooser.
    pub chooser: Arc<dyn DirectoryChooser>,
    /// Storage permission gate.
    pub permissions: Arc<dyn PermissionGate>,
}

/// Outcome of one pipeline stage.
enum Stage<T> {
    /// Terminal: these are the results.
    Done(Vec<MediaRecord>),
    /// Hand this to the next stage.
    Continue(T),
}

/// Children of the scoped root, and whether they still need resolving.
struct ScopedListing {
    entries: Vec<ScopedEntry>,
    has_media: bool,
}

/// Runs the discovery protocol: direct paths first, then the remembered
/// scoped handle, resolving and caching as needed.
///
/// At most one discovery attempt runs at a time; overlapping calls wait for
/// the one in flight and then run their own. The directory chooser runs
/// outside that guard.
pub struct MediaScanner {
    config: ScannerConfig,
    caps: Capabilities,
    probe: PathProbe,
    store: ScopedAccessStore,
    resolver: ScopedDirectoryResolver,
    cache: MediaCache,
    events: broadcast::Sender<ScanEvent>,
    in_flight: Mutex<()>,
}

impl MediaScanner {
    /// Create a scanner.
    pub fn new(config: ScannerConfig, caps: Capabilities) -> Self {
        let (events, _) = broadcast::channel(100);
        let probe = PathProbe::new(caps.fs.clone(), config.candidate_dirs.clone());
        let store = ScopedAccessStore::new(caps.store.clone(), config.handle_key.clone());
        let resolver = ScopedDirectoryResolver::from_config(caps.scoped.clone(), &config);
        let cache = MediaCache::new(caps.fs.clone(), caps.scoped.clone(), config.cache_dir.clone());

        Self {
            config,
            caps,
            probe,
            store,
            resolver,
            cache,
            events,
            in_flight: Mutex::new(()),
        }
    }

    /// Subscribe to discovery events.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.events.subscribe()
    }

    /// The scanner configuration.
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// The capabilities the scanner was built from.
    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// The media cache used for scoped records.
    pub fn cache(&self) -> &MediaCache {
        &self.cache
    }

    /// The remembered scoped handle, if any.
    pub async fn remembered_handle(&self) -> Option<ScopedHandle> {
        self.store.get().await
    }

    /// Forget the remembered scoped handle.
    pub async fn forget_handle(&self) {
        self.store.clear().await;
    }

    /// Discover status media, newest first.
    ///
    /// An empty result with a preceding [`ScanEvent::HandleRequired`] means
    /// the caller should run [`Self::trigger_chooser_and_scan`].
    pub async fn scan(&self) -> Result<Vec<MediaRecord>, ScanError> {
        let _flight = self.in_flight.lock().await;
        self.require_permission().await?;

        if let Stage::Done(records) = self.direct_probe().await {
            return Ok(records);
        }
        let handle = match self.recall_handle().await {
            Stage::Done(records) => return Ok(records),
            Stage::Continue(handle) => handle,
        };

        Ok(self.scoped_pipeline(&handle).await)
    }

    /// Ask the user for a directory, remember it, and scan it.
    ///
    /// Cancelling the chooser yields an empty result. Other scans keep
    /// running while the chooser is open.
    pub async fn trigger_chooser_and_scan(&self) -> Result<Vec<MediaRecord>, ScanError> {
        self.require_permission().await?;

        let handle = match self.caps.chooser.choose().await {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                tracing::debug!("directory chooser cancelled");
                return Ok(Vec::new());
            }
            Err(err) => {
                tracing::warn!(%err, "directory chooser failed");
                return Ok(Vec::new());
            }
        };

        let _flight = self.in_flight.lock().await;
        self.store.set(&handle).await;
        Ok(self.scoped_pipeline(&handle).await)
    }

    async fn require_permission(&self) -> Result<(), ScanError> {
        if self.caps.permissions.check_and_request().await {
            Ok(())
        } else {
            tracing::warn!("storage permission denied, not scanning");
            Err(ScanError::PermissionDenied)
        }
    }

    async fn direct_probe(&self) -> Stage<()> {
        self.emit(ScanEvent::StageEntered(ScanStage::DirectProbe));

        let records = self.probe.scan().await;
        if records.is_empty() {
            Stage::Continue(())
        } else {
            Stage::Done(self.finish(ScanStage::DirectProbe, records))
        }
    }

    async fn recall_handle(&self) -> Stage<ScopedHandle> {
        self.emit(ScanEvent::StageEntered(ScanStage::RecallHandle));

        match self.store.get().await {
            Some(handle) => Stage::Continue(handle),
            None => {
                tracing::debug!("no direct media and no remembered handle");
                self.emit(ScanEvent::HandleRequired);
                Stage::Done(self.finish(ScanStage::RecallHandle, Vec::new()))
            }
        }
    }

    /// Stages 3 to 6 against a scoped root.
    async fn scoped_pipeline(&self, root: &ScopedHandle) -> Vec<MediaRecord> {
        let listing = match self.scoped_list(root).await {
            Stage::Done(records) => return records,
            Stage::Continue(listing) => listing,
        };
        let entries = self.scoped_resolve(listing).await;
        let records = self.materialize(entries).await;
        self.finish(ScanStage::Materialize, records)
    }

    async fn scoped_list(&self, root: &ScopedHandle) -> Stage<ScopedListing> {
        self.emit(ScanEvent::StageEntered(ScanStage::ScopedList));

        match self.caps.scoped.list(root).await {
            Ok(entries) => {
                let has_media = entries
                    .iter()
                    .any(|e| e.is_file() && is_media_file(&e.name));
                tracing::debug!(%root, items = entries.len(), has_media, "listed scoped root");
                Stage::Continue(ScopedListing { entries, has_media })
            }
            Err(err) => {
                tracing::warn!(%root, %err, "failed to list scoped root");
                Stage::Done(self.finish(ScanStage::ScopedList, Vec::new()))
            }
        }
    }

    async fn scoped_resolve(&self, listing: ScopedListing) -> Vec<ScopedEntry> {
        if listing.has_media {
            return listing.entries;
        }
        self.emit(ScanEvent::StageEntered(ScanStage::ScopedResolve));

        let containers = listing
            .entries
            .iter()
            .filter(|e| e.is_dir() && self.config.is_container_name(&e.name));

        for container in containers {
            let Some(target) = self.resolver.locate_target_folder(&container.handle).await else {
                continue;
            };
            self.emit(ScanEvent::TargetResolved(target.clone()));

            return match self.caps.scoped.list(&target).await {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(%target, %err, "failed to list status folder");
                    Vec::new()
                }
            };
        }

        tracing::debug!("no status folder below scoped root");
        listing.entries
    }

    async fn materialize(&self, entries: Vec<ScopedEntry>) -> Vec<MediaRecord> {
        self.emit(ScanEvent::StageEntered(ScanStage::Materialize));

        let mut records = Vec::new();
        for entry in entries {
            if !entry.is_file() || entry.name.is_empty() {
                continue;
            }
            let Some(kind) = classify(&entry.name) else {
                continue;
            };

            let display = self.cache.materialize(&entry.handle, &entry.name).await;
            if !display.is_local() {
                self.emit(ScanEvent::CacheFallback {
                    name: entry.name.clone(),
                });
            }

            let modified_at_ms = entry
                .last_modified_ms
                .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
            records.push(MediaRecord::scoped(
                entry.handle,
                display,
                entry.name,
                kind,
                entry.size.unwrap_or(0),
                modified_at_ms,
            ));
        }

        records
    }

    /// Drop duplicate ids, sort newest first and report.
    fn finish(&self, stage: ScanStage, mut records: Vec<MediaRecord>) -> Vec<MediaRecord> {
        let mut seen = HashSet::new();
        records.retain(|r| seen.insert(r.id.clone()));
        sort_newest_first(&mut records);

        tracing::debug!(%stage, count = records.len(), "discovery finished");
        self.emit(ScanEvent::Finished {
            stage,
            records: records.len(),
        });
        records
    }

    fn emit(&self, event: ScanEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for MediaScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaScanner")
            .field("probe", &self.probe)
            .field("store", &self.store)
            .field("resolver", &self.resolver)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
