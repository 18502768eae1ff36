//! Listing previously saved copies.

use std::path::Path;

use statusbox_core::{DirectFs, IdTag, MediaRecord, sort_newest_first};
use statusbox_scan::list_direct_media;

/// List the media in the save directory, newest first.
///
/// Uses the same classification as the direct probe. Any fault yields an
/// empty list.
pub async fn list_saved(fs: &dyn DirectFs, dir: &Path) -> Vec<MediaRecord> {
    if let Err(err) = fs.create_dir_all(dir).await {
        tracing::warn!(path = %dir.display(), %err, "failed to prepare save directory");
        return Vec::new();
    }

    match list_direct_media(fs, dir, IdTag::Saved).await {
        Ok(mut records) => {
            sort_newest_first(&mut records);
            records
        }
        Err(err) => {
            tracing::warn!(path = %dir.display(), %err, "failed to list saved media");
            Vec::new()
        }
    }
}
