/// Image blob storage
///
/// Uploaded post images are written under a configured root directory and
/// referenced by a stable relative path stored on the post; `/media/{path}`
/// serves them back.
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

use crate::error::{AppError, Result};

pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Persist an uploaded image and return its stored relative path.
    /// Rejects payloads that are not a recognized image format.
    pub async fn save_image(&self, bytes: &[u8]) -> Result<String> {
        let format = image::guess_format(bytes).map_err(|_| {
            AppError::Validation("Uploaded file is not a recognized image.".to_string())
        })?;
        let ext = format.extensions_str().first().copied().unwrap_or("img");

        let rel = format!("posts/{}.{}", Uuid::new_v4(), ext);
        let path = self.root.join(&rel);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(path = %rel, size = bytes.len(), "stored uploaded image");
        Ok(rel)
    }

    /// Resolve a stored relative path to its on-disk location. Paths that
    /// escape the media root resolve to None.
    pub fn resolve(&self, rel: &str) -> Option<PathBuf> {
        if rel.is_empty() {
            return None;
        }
        let rel_path = Path::new(rel);
        let safe = rel_path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return None;
        }
        Some(self.root.join(rel_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Smallest valid PNG header; enough for format sniffing.
    const PNG_MAGIC: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48,
        0x44, 0x52,
    ];

    #[tokio::test]
    async fn saves_png_under_posts() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());

        let rel = store.save_image(PNG_MAGIC).await.unwrap();
        assert!(rel.starts_with("posts/"));
        assert!(rel.ends_with(".png"));

        let full = store.resolve(&rel).unwrap();
        let stored = tokio::fs::read(full).await.unwrap();
        assert_eq!(stored, PNG_MAGIC);
    }

    #[tokio::test]
    async fn rejects_non_image_payload() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());

        let err = store.save_image(b"plain text, no image here").await;
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[test]
    fn resolve_refuses_traversal() {
        let store = MediaStore::new("/srv/media");
        assert!(store.resolve("../etc/passwd").is_none());
        assert!(store.resolve("/etc/passwd").is_none());
        assert!(store.resolve("").is_none());
        assert!(store.resolve("posts/ok.png").is_some());
    }
}
