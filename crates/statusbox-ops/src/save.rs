//! Persisting durable copies of discovered media.

use std::io;
use std::path::{Path, PathBuf};

use statusbox_core::{AccessMode, DirectFs, MediaRecord, ScannerConfig, ScopedAccess, extension};

use crate::OpsError;

/// Extension used when the original name has none.
const FALLBACK_EXTENSION: &str = "jpg";

/// Where saved copies go and how they are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTarget {
    /// Destination directory.
    pub dir: PathBuf,
    /// File name prefix.
    pub prefix: String,
}

impl SaveTarget {
    /// Create a save target.
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    /// Take the save directory and prefix from scanner configuration.
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self::new(config.save_dir.clone(), config.save_prefix.clone())
    }

    /// File name for a copy of `original` saved at `timestamp_ms`.
    ///
    /// The original name is never reused; only its extension survives.
    pub fn file_name(&self, original: &str, timestamp_ms: i64) -> String {
        let ext = extension(original).unwrap_or(FALLBACK_EXTENSION);
        format!("{}_{timestamp_ms}.{ext}", self.prefix)
    }
}

/// Save a durable copy of `record` into `target`, returning the new path.
///
/// Scoped records are read through `scoped`; direct records are copied by
/// path. The destination is created exclusively, so concurrent saves never
/// share a path. Any fault fails the save, and a partially written
/// destination is removed first.
pub async fn save_record(
    fs: &dyn DirectFs,
    scoped: &dyn ScopedAccess,
    target: &SaveTarget,
    record: &MediaRecord,
) -> Result<PathBuf, OpsError> {
    fs.create_dir_all(&target.dir)
        .await
        .map_err(|source| OpsError::CreateDestination {
            path: target.dir.clone(),
            source,
        })?;

    let name = target.file_name(&record.name, chrono::Utc::now().timestamp_millis());

    let dest = match record.access_mode {
        AccessMode::Scoped => {
            let handle = record.source.as_handle().ok_or_else(|| OpsError::InvalidSource {
                id: record.id.clone(),
            })?;
            let bytes = scoped
                .read(handle)
                .await
                .map_err(|source| OpsError::ReadSource {
                    handle: handle.clone(),
                    source,
                })?;
            claim_destination(fs, &target.dir, &name, Payload::Bytes(&bytes))
                .await
                .map_err(|(path, source)| OpsError::WriteDestination { path, source })?
        }
        AccessMode::Direct => {
            let from = record.source.as_path().ok_or_else(|| OpsError::InvalidSource {
                id: record.id.clone(),
            })?;
            claim_destination(fs, &target.dir, &name, Payload::File(from))
                .await
                .map_err(|(to, source)| OpsError::Copy {
                    from: from.to_path_buf(),
                    to,
                    source,
                })?
        }
    };

    tracing::info!(id = %record.id, dest = %dest.display(), "saved media");
    Ok(dest)
}

/// What gets written to a claimed destination.
#[derive(Clone, Copy)]
enum Payload<'a> {
    Bytes(&'a [u8]),
    File(&'a Path),
}

/// Write `payload` to the first free name derived from `name` inside `dir`.
///
/// Names are claimed by exclusive creation, so a name taken between two
/// attempts moves on to the next candidate instead of being overwritten.
async fn claim_destination(
    fs: &dyn DirectFs,
    dir: &Path,
    name: &str,
    payload: Payload<'_>,
) -> Result<PathBuf, (PathBuf, io::Error)> {
    let mut last = dir.join(name);
    for dest in destination_candidates(dir, name) {
        let placed = match payload {
            Payload::Bytes(bytes) => fs.write_new(&dest, bytes).await,
            Payload::File(from) => fs.copy_new(from, &dest).await.map(drop),
        };
        match placed {
            Ok(()) => return Ok(dest),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => last = dest,
            Err(err) => {
                discard_partial(fs, &dest).await;
                return Err((dest, err));
            }
        }
    }

    Err((
        last,
        io::Error::new(io::ErrorKind::AlreadyExists, "no free destination name"),
    ))
}

/// Names to try for `name` inside `dir`, in order.
///
/// For "StatusBox_1700.jpg": the name itself, then "StatusBox_1700_1.jpg"
/// through "StatusBox_1700_999.jpg", then a nanosecond suffix.
fn destination_candidates<'a>(
    dir: &'a Path,
    name: &'a str,
) -> impl Iterator<Item = PathBuf> + 'a {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (name, None),
    };
    let numbered = move |i: u64| match ext {
        Some(ext) => dir.join(format!("{stem}_{i}.{ext}")),
        None => dir.join(format!("{stem}_{i}")),
    };

    std::iter::once(dir.join(name))
        .chain((1..1000).map(numbered))
        .chain(std::iter::once_with(move || {
            let nanos = chrono::Utc::now()
                .timestamp_nanos_opt()
                .unwrap_or_default()
                .unsigned_abs();
            numbered(nanos)
        }))
}

async fn discard_partial(fs: &dyn DirectFs, dest: &Path) {
    if fs.exists(dest).await {
        if let Err(err) = fs.remove_file(dest).await {
            tracing::warn!(path = %dest.display(), %err, "failed to remove partial save");
        }
    }
}
