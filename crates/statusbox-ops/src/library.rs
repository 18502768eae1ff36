//! The surface presentation code calls.

use std::path::PathBuf;

use tokio::sync::broadcast;

use statusbox_core::{MediaRecord, ScanError, ScannerConfig, ScopedHandle};
use statusbox_scan::{Capabilities, MediaScanner, ScanEvent};

use crate::{OpsError, SaveTarget, delete_media, list_saved, save_record};

/// Discovery plus save/delete, built once and shared by the UI.
#[derive(Debug)]
pub struct StatusLibrary {
    scanner: MediaScanner,
    target: SaveTarget,
}

impl StatusLibrary {
    /// Create a library from configuration and platform capabilities.
    pub fn new(config: ScannerConfig, caps: Capabilities) -> Self {
        let target = SaveTarget::from_config(&config);
        Self {
            scanner: MediaScanner::new(config, caps),
            target,
        }
    }

    /// The underlying scanner.
    pub fn scanner(&self) -> &MediaScanner {
        &self.scanner
    }

    /// Where saved copies go.
    pub fn save_target(&self) -> &SaveTarget {
        &self.target
    }

    /// Subscribe to discovery events.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.scanner.subscribe()
    }

    /// Discover status media, newest first.
    pub async fn scan(&self) -> Result<Vec<MediaRecord>, ScanError> {
        self.scanner.scan().await
    }

    /// Ask the user for a directory, remember it, and scan it.
    pub async fn trigger_chooser_and_scan(&self) -> Result<Vec<MediaRecord>, ScanError> {
        self.scanner.trigger_chooser_and_scan().await
    }

    /// List previously saved copies, newest first.
    pub async fn list_saved(&self) -> Vec<MediaRecord> {
        list_saved(self.scanner.capabilities().fs.as_ref(), &self.target.dir).await
    }

    /// Save a durable copy of `record`, returning its path.
    pub async fn save(&self, record: &MediaRecord) -> Result<PathBuf, OpsError> {
        let caps = self.scanner.capabilities();
        save_record(caps.fs.as_ref(), caps.scoped.as_ref(), &self.target, record).await
    }

    /// Delete a local file by path or `file://` URI.
    pub async fn delete(&self, local_uri: &str) -> Result<(), OpsError> {
        delete_media(self.scanner.capabilities().fs.as_ref(), local_uri).await
    }

    /// The remembered scoped handle, if any.
    pub async fn remembered_handle(&self) -> Option<ScopedHandle> {
        self.scanner.remembered_handle().await
    }

    /// Forget the remembered scoped handle.
    pub async fn forget_handle(&self) {
        self.scanner.forget_handle().await
    }
}
