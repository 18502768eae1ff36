//! Extension-based media classification.

use crate::record::MediaKind;

/// Extensions classified as images (lowercase, without the dot).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Extensions classified as videos (lowercase, without the dot).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "3gp", "mkv", "avi", "mov"];

/// Return the text after the last `.` in a file name.
///
/// Unlike [`std::path::Path::extension`], a leading dot counts, so `.jpg`
/// yields `jpg`. Names without a dot or ending in a dot yield `None`.
pub fn extension(name: &str) -> Option<&str> {
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Classify a file name by its extension, case-insensitively.
///
/// Returns `None` for anything outside the two allowlists.
pub fn classify(name: &str) -> Option<MediaKind> {
    let ext = extension(name)?.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// Check whether a file name would be kept by [`classify`].
pub fn is_media_file(name: &str) -> bool {
    classify(name).is_some()
}
