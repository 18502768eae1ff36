//! Direct-path probing of known status folders.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use statusbox_core::{DirectFs, IdTag, MediaRecord, classify};

use crate::local::system_time_ms;

/// Probes a fixed, ordered list of directories by direct path.
///
/// A candidate that is missing or unreadable is skipped; that is the normal
/// case on devices where platform sandboxing blocks direct access.
#[derive(Clone)]
pub struct PathProbe {
    fs: Arc<dyn DirectFs>,
    candidates: Vec<PathBuf>,
}

impl PathProbe {
    /// Create a probe over the given candidate directories.
    pub fn new(fs: Arc<dyn DirectFs>, candidates: Vec<PathBuf>) -> Self {
        Self { fs, candidates }
    }

    /// Candidate directories, in probe order.
    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// Probe every candidate in order and return the union of their media.
    ///
    /// The result is unsorted.
    pub async fn scan(&self) -> Vec<MediaRecord> {
        let mut records = Vec::new();

        for candidate in &self.candidates {
            if !self.fs.exists(candidate).await {
                continue;
            }
            match list_direct_media(self.fs.as_ref(), candidate, IdTag::Raw).await {
                Ok(found) => {
                    tracing::debug!(path = %candidate.display(), count = found.len(), "probed candidate");
                    records.extend(found);
                }
                Err(err) => {
                    tracing::debug!(path = %candidate.display(), %err, "candidate not readable");
                }
            }
        }

        records
    }
}

impl std::fmt::Debug for PathProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathProbe")
            .field("candidates", &self.candidates)
            .finish_non_exhaustive()
    }
}

/// List the classifiable files directly inside `dir` as direct records.
///
/// Non-recursive. Files outside the extension allowlists are dropped.
pub async fn list_direct_media(
    fs: &dyn DirectFs,
    dir: &Path,
    tag: IdTag,
) -> std::io::Result<Vec<MediaRecord>> {
    let entries = fs.list(dir).await?;

    let records = entries
        .into_iter()
        .filter(|entry| entry.is_file)
        .filter_map(|entry| {
            let kind = classify(&entry.name)?;
            let modified_at_ms = entry
                .modified
                .map(system_time_ms)
                .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
            Some(MediaRecord::direct(
                tag,
                entry.path,
                entry.name,
                kind,
                entry.size,
                modified_at_ms,
            ))
        })
        .collect();

    Ok(records)
}
