//! Local file storage for task attachments.
//!
//! Files are streamed straight to the upload directory under a generated
//! name. Size limits are enforced while streaming; a file that breaks a
//! limit is deleted before the error is returned.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use actix_web::web::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::UploadSettings;
use crate::error::{AppError, AppResult};

/// A file written to disk, not yet recorded in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub original_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: PathBuf,
    max_file_size: u64,
    max_task_total_size: u64,
}

impl LocalStorage {
    /// Open the upload directory, creating it if needed.
    pub async fn new(settings: &UploadSettings) -> AppResult<Self> {
        tokio::fs::create_dir_all(&settings.dir).await.map_err(|e| {
            AppError::Storage(format!(
                "Failed to create upload directory {}: {}",
                settings.dir.display(),
                e
            ))
        })?;
        info!("Upload storage ready at {}", settings.dir.display());
        Ok(Self {
            dir: settings.dir.clone(),
            max_file_size: settings.max_file_size,
            max_task_total_size: settings.max_task_total_size,
        })
    }

    pub fn max_task_total_size(&self) -> u64 {
        self.max_task_total_size
    }

    /// Content type served for a file extension.
    pub fn content_type_for_extension(ext: &str) -> &'static str {
        match ext.to_lowercase().as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "svg" => "image/svg+xml",
            "gif" => "image/gif",
            _ => "application/octet-stream",
        }
    }

    pub fn content_type_for(name: &str) -> &'static str {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::content_type_for_extension)
            .unwrap_or("application/octet-stream")
    }

    /// Generated on-disk name keeping a sanitized extension of the original.
    pub fn stored_name_for(original_name: &str) -> String {
        let ext: Option<String> = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                e.chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .take(10)
                    .collect::<String>()
                    .to_lowercase()
            })
            .filter(|e| !e.is_empty());
        match ext {
            Some(ext) => format!("{}.{}", Uuid::now_v7(), ext),
            None => Uuid::now_v7().to_string(),
        }
    }

    /// Path of a stored file. Names that could leave the directory are rejected.
    pub fn resolve(&self, stored_name: &str) -> AppResult<PathBuf> {
        let invalid = stored_name.is_empty()
            || stored_name.contains("..")
            || stored_name.contains('/')
            || stored_name.contains('\\')
            || stored_name.contains('\0');
        if invalid {
            return Err(AppError::InvalidInput("Nombre de archivo inválido".to_string()));
        }
        Ok(self.dir.join(stored_name))
    }

    /// Stream one upload to disk.
    ///
    /// `used_by_task` is the size already taken by the task's attachments.
    pub async fn save_stream<S, E>(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        mut stream: S,
        used_by_task: u64,
    ) -> AppResult<StoredFile>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: Display,
    {
        let original_name = sanitize_original_name(original_name);
        let stored_name = Self::stored_name_for(&original_name);
        let path = self.resolve(&stored_name)?;

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create file: {}", e)))?;

        let mut size: u64 = 0;
        let mut failure: Option<AppError> = None;
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    failure = Some(AppError::InvalidInput(format!("Read error: {}", e)));
                    break;
                }
            };
            size += chunk.len() as u64;
            if let Err(e) = self.check_limits(size, used_by_task) {
                failure = Some(e);
                break;
            }
            if let Err(e) = file.write_all(&chunk).await {
                failure = Some(AppError::Storage(format!("Failed to write file: {}", e)));
                break;
            }
        }
        if failure.is_none() {
            if let Err(e) = file.flush().await {
                failure = Some(AppError::Storage(format!("Failed to write file: {}", e)));
            }
        }
        drop(file);

        if let Some(e) = failure {
            self.remove(&stored_name).await;
            return Err(e);
        }

        let mime_type = match Self::content_type_for(&original_name) {
            "application/octet-stream" => content_type
                .unwrap_or("application/octet-stream")
                .to_string(),
            known => known.to_string(),
        };

        Ok(StoredFile {
            original_name,
            stored_name,
            mime_type,
            size,
        })
    }

    fn check_limits(&self, size: u64, used_by_task: u64) -> AppResult<()> {
        if size > self.max_file_size {
            return Err(AppError::PayloadTooLarge(format!(
                "El archivo excede el tamaño máximo de {} MB",
                self.max_file_size / 1024 / 1024
            )));
        }
        if used_by_task + size > self.max_task_total_size {
            return Err(AppError::PayloadTooLarge(format!(
                "La tarea excede el tamaño total de adjuntos de {} MB",
                self.max_task_total_size / 1024 / 1024
            )));
        }
        Ok(())
    }

    /// Delete a stored file; a missing file is not an error.
    pub async fn remove(&self, stored_name: &str) {
        let Ok(path) = self.resolve(stored_name) else {
            return;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to delete stored file {}: {}", stored_name, e),
        }
    }
}

/// Strip directories a client may have put in the file name.
fn sanitize_original_name(name: &str) -> String {
    let base = name
        .replace('\\', "/")
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    if base.is_empty() || base == "." || base == ".." {
        "archivo".to_string()
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    async fn storage(dir: &Path, max_file: u64, max_total: u64) -> LocalStorage {
        LocalStorage::new(&UploadSettings {
            dir: dir.to_path_buf(),
            max_file_size: max_file,
            max_task_total_size: max_total,
        })
        .await
        .unwrap()
    }

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Unpin {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(*p)))
                .collect::<Vec<_>>(),
        )
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_content_types() {
        assert_eq!(LocalStorage::content_type_for("a.PNG"), "image/png");
        assert_eq!(LocalStorage::content_type_for("a.jpeg"), "image/jpeg");
        assert_eq!(LocalStorage::content_type_for("logo.svg"), "image/svg+xml");
        assert_eq!(LocalStorage::content_type_for("a.gif"), "image/gif");
        assert_eq!(LocalStorage::content_type_for("a.pdf"), "application/octet-stream");
        assert_eq!(LocalStorage::content_type_for("README"), "application/octet-stream");
    }

    #[test]
    fn test_stored_name_keeps_extension() {
        let name = LocalStorage::stored_name_for("captura final.PNG");
        assert!(name.ends_with(".png"), "{}", name);
        assert!(!LocalStorage::stored_name_for("noext").contains('.'));
    }

    #[tokio::test]
    async fn test_resolve_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage(dir.path(), 100, 100).await;
        for bad in ["../etc/passwd", "a/b.png", "..", "", "a\\b"] {
            assert!(matches!(store.resolve(bad), Err(AppError::InvalidInput(_))), "{}", bad);
        }
        assert_eq!(store.resolve("x.png").unwrap(), dir.path().join("x.png"));
    }

    #[tokio::test]
    async fn test_save_stream_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage(dir.path(), 100, 100).await;

        let saved = store
            .save_stream("dir/plan.png", None, chunks(&[b"abc", b"def"]), 0)
            .await
            .unwrap();

        assert_eq!(saved.original_name, "plan.png");
        assert_eq!(saved.size, 6);
        assert_eq!(saved.mime_type, "image/png");
        let written = std::fs::read(dir.path().join(&saved.stored_name)).unwrap();
        assert_eq!(written, b"abcdef");
    }

    #[tokio::test]
    async fn test_file_over_limit_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage(dir.path(), 4, 100).await;

        let result = store
            .save_stream("big.bin", None, chunks(&[b"abc", b"def"]), 0)
            .await;

        assert!(matches!(result, Err(AppError::PayloadTooLarge(_))));
        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_task_quota_counts_existing_attachments() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage(dir.path(), 100, 10).await;

        let result = store
            .save_stream("doc.pdf", Some("application/pdf"), chunks(&[b"abcdef"]), 5)
            .await;
        assert!(matches!(result, Err(AppError::PayloadTooLarge(_))));
        assert_eq!(file_count(dir.path()), 0);

        let ok = store
            .save_stream("doc.pdf", Some("application/pdf"), chunks(&[b"abcde"]), 5)
            .await
            .unwrap();
        assert_eq!(ok.mime_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_remove_missing_file_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage(dir.path(), 100, 100).await;
        store.remove("does-not-exist.png").await;
        store.remove("../escape").await;
    }
}
