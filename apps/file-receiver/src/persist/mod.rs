//! Classification and persistence of received uploads
//!
//! Videos are written byte-for-byte; images are decoded and re-encoded before
//! saving. Anything else is dropped.

mod classify;

pub use classify::{classify, ContentClass};

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use image::{DynamicImage, ImageFormat};

use crate::config::StorageConfig;
use crate::error::{AppError, Result};

/// A file received in a request, with its declared metadata
#[derive(Debug, Clone)]
pub struct ReceivedPart {
    pub field_name: String,
    pub file_name: String,
    pub content_type: String,
    pub body: Bytes,
}

/// Writes classified payloads under the configured directories
#[derive(Debug, Clone)]
pub struct Persister {
    image_dir: PathBuf,
    video_dir: PathBuf,
}

impl Persister {
    pub fn new(storage: &StorageConfig) -> Self {
        Self {
            image_dir: storage.image_dir.clone(),
            video_dir: storage.video_dir.clone(),
        }
    }

    /// Classify `part` and save it.
    ///
    /// Returns the written path, or `None` when the content type is not one
    /// we keep.
    pub async fn persist(&self, part: &ReceivedPart) -> Result<Option<PathBuf>> {
        let class = classify(&part.content_type);
        let path = match class {
            ContentClass::Video => self.save_video(&part.body, &destination_name(part)?).await?,
            ContentClass::Image => {
                self.save_image(part.body.clone(), &destination_name(part)?)
                    .await?
            }
            ContentClass::Unknown => {
                tracing::debug!(
                    file_name = %part.file_name,
                    content_type = %part.content_type,
                    "Ignoring unclassified upload"
                );
                return Ok(None);
            }
        };

        tracing::info!(path = %path.display(), class = ?class, "Upload persisted");
        Ok(Some(path))
    }

    async fn save_video(&self, body: &[u8], name: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.video_dir).await?;
        let path = self.video_dir.join(name);
        tokio::fs::write(&path, body).await?;
        Ok(path)
    }

    async fn save_image(&self, body: Bytes, name: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.image_dir).await?;
        let path = self.image_dir.join(name);

        let target = path.clone();
        tokio::task::spawn_blocking(move || reencode_image(&body, &target))
            .await
            .map_err(|e| AppError::Internal(format!("Image task failed: {}", e)))??;

        Ok(path)
    }
}

/// Decode `body` and write it to `path`.
///
/// The output format follows the destination extension and falls back to the
/// format the bytes were decoded from.
fn reencode_image(body: &[u8], path: &Path) -> Result<()> {
    let source_format = image::guess_format(body)?;
    let decoded = image::load_from_memory_with_format(body, source_format)?;
    let target_format = ImageFormat::from_path(path).unwrap_or(source_format);

    // JPEG has no alpha channel
    let decoded = match target_format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(decoded.to_rgb8()),
        _ => decoded,
    };

    decoded.save_with_format(path, target_format)?;
    Ok(())
}

fn destination_name(part: &ReceivedPart) -> Result<String> {
    safe_file_name(&part.file_name)
        .ok_or_else(|| AppError::BadRequest(format!("Unusable file name: {:?}", part.file_name)))
}

/// Last path segment of a client-supplied name.
///
/// Both `/` and `\` count as separators; empty, `.` and `..` are rejected.
pub fn safe_file_name(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    match last {
        "" | "." | ".." => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn persister(root: &TempDir) -> Persister {
        Persister::new(&StorageConfig {
            image_dir: root.path().join("images"),
            video_dir: root.path().join("videos"),
        })
    }

    fn part(file_name: &str, content_type: &str, body: impl Into<Bytes>) -> ReceivedPart {
        ReceivedPart {
            field_name: file_name.to_string(),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            body: body.into(),
        }
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_fn(4, 3, |x, y| image::Rgb([x as u8 * 40, y as u8 * 60, 9]));
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(safe_file_name("clips\\a.mp4").as_deref(), Some("a.mp4"));
        assert_eq!(safe_file_name("a.mp4").as_deref(), Some("a.mp4"));
        assert_eq!(safe_file_name("dir/"), None);
        assert_eq!(safe_file_name(".."), None);
        assert_eq!(safe_file_name(""), None);
    }

    #[tokio::test]
    async fn test_video_saved_verbatim() {
        let root = TempDir::new().unwrap();
        let store = persister(&root);
        let body = b"\x00\x00\x00\x18ftypmp42 not really a movie".to_vec();

        let path = store
            .persist(&part("clips/a.mp4", "video/mp4", body.clone()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(path, root.path().join("videos").join("a.mp4"));
        assert_eq!(std::fs::read(path).unwrap(), body);
    }

    #[tokio::test]
    async fn test_traversal_name_stays_in_directory() {
        let root = TempDir::new().unwrap();
        let store = persister(&root);

        let path = store
            .persist(&part("../../etc/passwd", "video/mp4", &b"x"[..]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(path, root.path().join("videos").join("passwd"));
    }

    #[tokio::test]
    async fn test_image_reencoded_with_same_pixels() {
        let root = TempDir::new().unwrap();
        let store = persister(&root);
        let source = png_bytes();

        let path = store
            .persist(&part("b.png", "image/png", source.clone()))
            .await
            .unwrap()
            .unwrap();

        let saved = image::open(&path).unwrap().to_rgb8();
        let original = image::load_from_memory(&source).unwrap().to_rgb8();
        assert_eq!(saved.dimensions(), original.dimensions());
        assert_eq!(saved.as_raw(), original.as_raw());
    }

    #[tokio::test]
    async fn test_image_without_extension_keeps_source_format() {
        let root = TempDir::new().unwrap();
        let store = persister(&root);

        let path = store
            .persist(&part("snapshot", "image/png", png_bytes()))
            .await
            .unwrap()
            .unwrap();

        let written = std::fs::read(path).unwrap();
        assert_eq!(image::guess_format(&written).unwrap(), ImageFormat::Png);
    }

    #[tokio::test]
    async fn test_malformed_image_fails() {
        let root = TempDir::new().unwrap();
        let store = persister(&root);

        let result = store
            .persist(&part("broken.png", "image/png", &b"definitely not a png"[..]))
            .await;

        assert!(matches!(result, Err(AppError::Image(_))));
    }

    #[tokio::test]
    async fn test_unknown_content_dropped() {
        let root = TempDir::new().unwrap();
        let store = persister(&root);

        let result = store
            .persist(&part("notes.txt", "text/plain", &b"hello"[..]))
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(!root.path().join("images").exists());
        assert!(!root.path().join("videos").exists());
    }
}
