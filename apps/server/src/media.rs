//! # Media Store
//!
//! Item images on the local filesystem, served back over `/media/{name}`.
//!
//! ## Layout
//! ```text
//! <media dir>/
//! ├── 7b2d3a90-1f60-4f70-9c6e-2ad32f1b4c55.png
//! ├── 9c1e54a2-0b7f-4d43-8a11-6f2f9f3ab0d2.jpg
//! └── ...
//! ```
//!
//! File names are always a fresh UUID plus an extension derived from the
//! uploaded content type; nothing client-controlled ever reaches the path.
//! Serving re-validates the requested name as one plain segment, so a
//! crafted `../` name can not escape the directory.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ApiError;

/// Largest accepted image upload, in bytes.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Content types accepted for item images, with their file extension.
const ACCEPTED_TYPES: [(&str, &str); 3] = [
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/webp", "webp"),
];

/// Filesystem-backed store for item images.
#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
}

impl MediaStore {
    /// Opens the store, creating the directory if needed.
    pub async fn init(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// Directory files are stored in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Saves uploaded image bytes, returning the stored file name.
    ///
    /// Rejects unknown content types and oversized payloads before any
    /// file I/O happens.
    pub async fn save(&self, content_type: &str, bytes: &[u8]) -> Result<String, ApiError> {
        let ext = extension_for(content_type).ok_or_else(|| {
            ApiError::validation(format!(
                "unsupported image type '{content_type}': expected image/png, image/jpeg or image/webp"
            ))
        })?;

        if bytes.is_empty() {
            return Err(ApiError::validation("image body is empty"));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ApiError::validation(format!(
                "image exceeds the {MAX_IMAGE_BYTES} byte limit"
            )));
        }

        let name = format!("{}.{ext}", Uuid::new_v4());
        let path = self.dir.join(&name);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to write media file");
            ApiError::internal("Failed to store image")
        })?;

        debug!(name = %name, size = bytes.len(), "Stored media file");
        Ok(name)
    }

    /// Reads a stored file back, with the content type its extension implies.
    pub async fn open(&self, name: &str) -> Result<(Vec<u8>, &'static str), ApiError> {
        validate_media_name(name)?;

        let content_type = name
            .rsplit('.')
            .next()
            .and_then(content_type_for)
            .ok_or_else(|| ApiError::not_found("Media file", name))?;

        let path = self.dir.join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok((bytes, content_type)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ApiError::not_found("Media file", name))
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to read media file");
                Err(ApiError::internal("Failed to read image"))
            }
        }
    }

    /// Best-effort removal of a stored file, used when an item's image is
    /// replaced. A miss is not an error; the file may never have existed.
    pub async fn remove(&self, name: &str) {
        if validate_media_name(name).is_err() {
            return;
        }
        if let Err(e) = tokio::fs::remove_file(self.dir.join(name)).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(name = %name, error = %e, "Failed to remove old media file");
            }
        }
    }
}

/// Extension for an accepted content type, or None.
fn extension_for(content_type: &str) -> Option<&'static str> {
    // Ignore any parameters ("image/png; charset=...").
    let base = content_type.split(';').next().unwrap_or("").trim();
    ACCEPTED_TYPES
        .iter()
        .find(|(ty, _)| *ty == base)
        .map(|(_, ext)| *ext)
}

/// Content type for a stored extension, or None.
fn content_type_for(ext: &str) -> Option<&'static str> {
    ACCEPTED_TYPES
        .iter()
        .find(|(_, e)| *e == ext)
        .map(|(ty, _)| *ty)
}

/// A media name is one plain path segment: `{uuid}.{ext}` shaped, no
/// separators, no traversal.
fn validate_media_name(name: &str) -> Result<(), ApiError> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        && name.matches('.').count() == 1;

    if valid {
        Ok(())
    } else {
        Err(ApiError::not_found("Media file", name))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> (tempfile::TempDir, MediaStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::init(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_save_and_open_round_trip() {
        let (_dir, store) = test_store().await;

        let name = store.save("image/png", b"not-really-a-png").await.unwrap();
        assert!(name.ends_with(".png"));

        let (bytes, content_type) = store.open(&name).await.unwrap();
        assert_eq!(bytes, b"not-really-a-png");
        assert_eq!(content_type, "image/png");
    }

    #[tokio::test]
    async fn test_content_type_parameters_are_ignored() {
        let (_dir, store) = test_store().await;
        let name = store
            .save("image/jpeg; charset=binary", b"jpegish")
            .await
            .unwrap();
        assert!(name.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn test_rejects_unknown_type_and_empty_body() {
        let (_dir, store) = test_store().await;

        assert!(store.save("image/gif", b"gif").await.is_err());
        assert!(store.save("text/html", b"<html>").await.is_err());
        assert!(store.save("image/png", b"").await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_oversized_upload() {
        let (_dir, store) = test_store().await;
        let big = vec![0u8; MAX_IMAGE_BYTES + 1];
        assert!(store.save("image/png", &big).await.is_err());
    }

    #[tokio::test]
    async fn test_traversal_names_are_not_found() {
        let (_dir, store) = test_store().await;

        for name in ["../etc/passwd", "a/b.png", "..", ".hidden", "two.dots.png", ""] {
            let err = store.open(name).await.unwrap_err();
            assert!(matches!(err.code, crate::error::ErrorCode::NotFound));
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let (_dir, store) = test_store().await;
        let err = store
            .open("00000000-0000-0000-0000-000000000000.png")
            .await
            .unwrap_err();
        assert!(matches!(err.code, crate::error::ErrorCode::NotFound));
    }

    #[tokio::test]
    async fn test_remove_is_best_effort() {
        let (_dir, store) = test_store().await;
        let name = store.save("image/webp", b"webp").await.unwrap();

        store.remove(&name).await;
        assert!(store.open(&name).await.is_err());

        // Removing again (or removing junk) is silent.
        store.remove(&name).await;
        store.remove("../nope").await;
    }
}
