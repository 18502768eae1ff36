//! Deleting saved copies.

use std::path::PathBuf;

use statusbox_core::DirectFs;

use crate::OpsError;

/// Turn a `file://` URI or plain path into a local path.
pub fn local_path_from_uri(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}

/// Delete the file at `local_uri`.
pub async fn delete_media(fs: &dyn DirectFs, local_uri: &str) -> Result<(), OpsError> {
    let path = local_path_from_uri(local_uri);
    fs.remove_file(&path)
        .await
        .map_err(|source| OpsError::Delete {
            path: path.clone(),
            source,
        })?;

    tracing::info!(path = %path.display(), "deleted media");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use statusbox_scan::LocalFs;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_local_path_from_uri() {
        assert_eq!(
            local_path_from_uri("file:///sdcard/Pictures/a.jpg"),
            PathBuf::from("/sdcard/Pictures/a.jpg")
        );
        assert_eq!(local_path_from_uri("/plain/path.mp4"), PathBuf::from("/plain/path.mp4"));
    }

    #[tokio::test]
    async fn test_delete_by_uri() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("StatusBox_1.jpg");
        fs::write(&file, "x").unwrap();

        delete_media(&LocalFs::new(), &format!("file://{}", file.display()))
            .await
            .unwrap();
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn test_delete_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("gone.jpg");

        let err = delete_media(&LocalFs::new(), missing.to_str().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::Delete { .. }));
        assert_eq!(err.path(), Some(missing.as_path()));
    }
}
