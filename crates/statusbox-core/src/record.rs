//! Media record types.

use std::fmt;
use std::path::{Path, PathBuf};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Kind of media, decided by file extension.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// How a record's bytes are reached.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AccessMode {
    /// Plain filesystem path.
    Direct,
    /// OS-brokered handle granted by the user.
    Scoped,
}

/// Prefix used when deriving a [`RecordId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum IdTag {
    /// Found through a known direct path.
    Raw,
    /// Found through a scoped handle.
    Saf,
    /// Found in the save destination.
    Saved,
}

impl From<AccessMode> for IdTag {
    fn from(mode: AccessMode) -> Self {
        match mode {
            AccessMode::Direct => IdTag::Raw,
            AccessMode::Scoped => IdTag::Saf,
        }
    }
}

/// Identifier of a record within one scan result.
///
/// Derived from the origin tag, file name and modification time, so the
/// same file yields the same id across repeated scans.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Derive an id from its parts.
    pub fn derive(tag: IdTag, name: &str, modified_at_ms: i64) -> Self {
        Self(format!("{tag}_{name}_{modified_at_ms}"))
    }

    /// Borrow the id as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference to a directory tree (or a file within one) granted by
/// the user through a directory chooser.
///
/// Only the platform binding that issued a handle knows how to interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopedHandle(String);

impl ScopedHandle {
    /// Wrap a raw handle string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the raw handle string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the handle, returning the raw string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ScopedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a record's bytes (or its renderable copy) live.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaLocation {
    /// A local filesystem path.
    Path(PathBuf),
    /// A scoped handle.
    Scoped(ScopedHandle),
}

impl MediaLocation {
    /// Get the local path, if this is one.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            Self::Scoped(_) => None,
        }
    }

    /// Get the scoped handle, if this is one.
    pub fn as_handle(&self) -> Option<&ScopedHandle> {
        match self {
            Self::Path(_) => None,
            Self::Scoped(handle) => Some(handle),
        }
    }

    /// Check whether a direct-path renderer can open this location.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Path(_))
    }

    /// Render as a URI string (`file://` for paths, the raw handle otherwise).
    pub fn to_uri(&self) -> String {
        match self {
            Self::Path(path) => format!("file://{}", path.display()),
            Self::Scoped(handle) => handle.as_str().to_string(),
        }
    }
}

impl fmt::Display for MediaLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Scoped(handle) => f.write_str(handle.as_str()),
        }
    }
}

/// A discovered media file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    /// Identifier, unique within one scan result.
    pub id: RecordId,

    /// Location of the original bytes, used when saving.
    pub source: MediaLocation,

    /// Best available location for display.
    ///
    /// Equal to `source` for direct records; a cache path for scoped records,
    /// or the scoped handle itself if materialization failed.
    pub display: MediaLocation,

    /// Original file name.
    pub name: CompactString,

    /// Image or video.
    pub kind: MediaKind,

    /// Size in bytes (0 when the platform does not report one).
    pub size_bytes: u64,

    /// Last modification time in epoch milliseconds.
    pub modified_at_ms: i64,

    /// Which persistence strategy applies when saving.
    pub access_mode: AccessMode,
}

impl MediaRecord {
    /// Create a record for a file reached by direct path.
    pub fn direct(
        tag: IdTag,
        path: PathBuf,
        name: impl Into<CompactString>,
        kind: MediaKind,
        size_bytes: u64,
        modified_at_ms: i64,
    ) -> Self {
        let name = name.into();
        let location = MediaLocation::Path(path);
        Self {
            id: RecordId::derive(tag, &name, modified_at_ms),
            source: location.clone(),
            display: location,
            name,
            kind,
            size_bytes,
            modified_at_ms,
            access_mode: AccessMode::Direct,
        }
    }

    /// Create a record for a file reached through a scoped handle.
    pub fn scoped(
        handle: ScopedHandle,
        display: MediaLocation,
        name: impl Into<CompactString>,
        kind: MediaKind,
        size_bytes: u64,
        modified_at_ms: i64,
    ) -> Self {
        let name = name.into();
        Self {
            id: RecordId::derive(IdTag::Saf, &name, modified_at_ms),
            source: MediaLocation::Scoped(handle),
            display,
            name,
            kind,
            size_bytes,
            modified_at_ms,
            access_mode: AccessMode::Scoped,
        }
    }

    /// Check if this record is a video.
    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }
}

/// Sort records by modification time, newest first.
///
/// The sort is stable, so ties keep their listing order.
pub fn sort_newest_first(records: &mut [MediaRecord]) {
    records.sort_by(|a, b| b.modified_at_ms.cmp(&a.modified_at_ms));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, mtime: i64) -> MediaRecord {
        MediaRecord::direct(
            IdTag::Raw,
            PathBuf::from(format!("/media/{name}")),
            name,
            MediaKind::Image,
            10,
            mtime,
        )
    }

    #[test]
    fn test_record_id_derivation() {
        let id = RecordId::derive(IdTag::Saf, "clip.mp4", 1700);
        assert_eq!(id.as_str(), "saf_clip.mp4_1700");
        assert_eq!(
            RecordId::derive(IdTag::Raw, "a.jpg", 1),
            RecordId::derive(IdTag::Raw, "a.jpg", 1)
        );
        assert_ne!(
            RecordId::derive(IdTag::Raw, "a.jpg", 1),
            RecordId::derive(IdTag::Saf, "a.jpg", 1)
        );
    }

    #[test]
    fn test_direct_record_displays_source() {
        let rec = record("a.jpg", 5);
        assert_eq!(rec.source, rec.display);
        assert_eq!(rec.access_mode, AccessMode::Direct);
        assert!(rec.display.is_local());
    }

    #[test]
    fn test_scoped_record() {
        let rec = MediaRecord::scoped(
            ScopedHandle::new("tree:///granted/clip.mp4"),
            MediaLocation::Path(PathBuf::from("/cache/clip.mp4")),
            "clip.mp4",
            MediaKind::Video,
            42,
            9,
        );
        assert!(rec.is_video());
        assert_eq!(rec.access_mode, AccessMode::Scoped);
        assert_ne!(rec.source, rec.display);
        assert_eq!(rec.id.as_str(), "saf_clip.mp4_9");
    }

    #[test]
    fn test_sort_newest_first_is_stable() {
        let mut records = vec![record("a.jpg", 1), record("b.jpg", 3), record("c.jpg", 3)];
        sort_newest_first(&mut records);
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["b.jpg", "c.jpg", "a.jpg"]);
    }

    #[test]
    fn test_location_uri() {
        let path = MediaLocation::Path(PathBuf::from("/cache/a.jpg"));
        assert_eq!(path.to_uri(), "file:///cache/a.jpg");
        let handle = MediaLocation::Scoped(ScopedHandle::new("content://x"));
        assert_eq!(handle.to_uri(), "content://x");
        assert!(handle.as_path().is_none());
    }

    #[test]
    fn test_kind_strings() {
        assert_eq!(MediaKind::Image.to_string(), "image");
        assert_eq!("video".parse::<MediaKind>().ok(), Some(MediaKind::Video));
        assert_eq!(AccessMode::Scoped.to_string(), "scoped");
        assert_eq!(IdTag::from(AccessMode::Direct), IdTag::Raw);
    }
}
