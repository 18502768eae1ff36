//! Events published while a discovery attempt runs.

use compact_str::CompactString;
use statusbox_core::ScopedHandle;
use strum::Display;

/// Named stages of a discovery attempt, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ScanStage {
    /// Probe the known direct paths.
    #[strum(serialize = "direct probe")]
    DirectProbe,
    /// Read the remembered scoped handle.
    #[strum(serialize = "recall handle")]
    RecallHandle,
    /// List the scoped root.
    #[strum(serialize = "scoped list")]
    ScopedList,
    /// Search the scoped root for the nested status folder.
    #[strum(serialize = "scoped resolve")]
    ScopedResolve,
    /// Cache scoped files for display.
    Materialize,
}

/// A discovery event.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// A stage started.
    StageEntered(ScanStage),
    /// No direct media and no remembered handle; the caller should run the
    /// directory chooser.
    HandleRequired,
    /// The resolver found the status folder.
    TargetResolved(ScopedHandle),
    /// A scoped file could not be cached and will display from its handle.
    CacheFallback { name: CompactString },
    /// The attempt finished.
    Finished { stage: ScanStage, records: usize },
}
