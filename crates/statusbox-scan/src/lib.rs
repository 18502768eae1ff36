//! Status media discovery engine for statusbox.
//!
//! # Overview
//!
//! `statusbox-scan` finds the ephemeral media a messaging app leaves in
//! shared storage. Discovery runs as an ordered pipeline:
//!
//! 1. **Direct probe** of a fixed list of known folders ([`PathProbe`])
//! 2. **Recall** of a user-granted scoped handle ([`ScopedAccessStore`])
//! 3. **List** the scoped root
//! 4. **Resolve** the nested status folder when the user granted a parent
//!    directory ([`ScopedDirectoryResolver`])
//! 5. **Materialize** scoped files into a local cache so they can be shown
//!    by path ([`MediaCache`])
//!
//! The first stage that produces media ends the attempt. Discovery faults
//! degrade to fewer results; only a denied storage permission is an error.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use statusbox_scan::{Capabilities, LocalFs, LocalTreeAccess, MediaScanner, TomlFileStore};
//! # use statusbox_core::{BoxFuture, DirectoryChooser, PermissionGate, ScannerConfig, ScopedHandle};
//! # struct Granted;
//! # impl PermissionGate for Granted {
//! #     fn check_and_request(&self) -> BoxFuture<'_, bool> { Box::pin(async { true }) }
//! # }
//! # struct NoChooser;
//! # impl DirectoryChooser for NoChooser {
//! #     fn choose(&self) -> BoxFuture<'_, std::io::Result<Option<ScopedHandle>>> {
//! #         Box::pin(async { Ok(None) })
//! #     }
//! # }
//! # async fn run() -> Result<(), statusbox_core::ScanError> {
//! let config = ScannerConfig::default();
//! let caps = Capabilities {
//!     fs: Arc::new(LocalFs::new()),
//!     scoped: Arc::new(LocalTreeAccess::new()),
//!     store: Arc::new(TomlFileStore::new(&config.state_file)),
//!     chooser: Arc::new(NoChooser),
//!     permissions: Arc::new(Granted),
//! };
//!
//! let scanner = MediaScanner::new(config, caps);
//! for record in scanner.scan().await? {
//!     println!("{} {}", record.kind, record.name);
//! }
//! # Ok(())
//! # }
//! ```

mod cache;
mod local;
mod probe;
mod progress;
mod resolver;
mod scanner;
mod store;

pub use cache::MediaCache;
pub use local::{LocalFs, LocalTreeAccess};
pub use probe::{PathProbe, list_direct_media};
pub use progress::{ScanEvent, ScanStage};
pub use resolver::ScopedDirectoryResolver;
pub use scanner::{Capabilities, MediaScanner};
pub use store::{MemoryStore, ScopedAccessStore, TomlFileStore};

// Re-export core types for convenience
pub use statusbox_core::{
    AccessMode, MediaKind, MediaLocation, MediaRecord, RecordId, ScanError, ScannerConfig,
    ScopedHandle,
};
