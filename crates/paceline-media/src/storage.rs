use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("file too large: {0} bytes (limit {1})")]
    TooLarge(u64, u64),
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub base_path: PathBuf,
    pub max_file_size: u64,
}

/// Local-filesystem store for attachment blobs. Files are keyed by the
/// attachment's id; metadata lives in the database, the blob lives here.
pub struct StorageManager {
    config: StorageConfig,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StoredFile {
    pub id: i64,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
    pub path: PathBuf,
    pub url: String,
}

impl StorageManager {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    pub async fn store_file(
        &self,
        id: i64,
        owner_id: i64,
        filename: &str,
        data: &[u8],
    ) -> Result<StoredFile, StorageError> {
        let size = data.len() as u64;
        if size > self.config.max_file_size {
            return Err(StorageError::TooLarge(size, self.config.max_file_size));
        }

        let content_type = mime_guess::from_path(filename)
            .first_or_octet_stream()
            .to_string();

        // base_path/owner_id/<attachment id>[.ext]
        let dir = self.config.base_path.join(owner_id.to_string());
        fs::create_dir_all(&dir).await?;

        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let stored_name = if ext.is_empty() {
            id.to_string()
        } else {
            format!("{id}.{ext}")
        };
        let file_path = dir.join(&stored_name);

        let mut file = fs::File::create(&file_path).await?;
        file.write_all(data).await?;
        file.flush().await?;

        tracing::debug!(attachment_id = id, owner_id, size, "attachment stored");

        Ok(StoredFile {
            id,
            filename: filename.to_string(),
            size,
            content_type,
            path: file_path,
            url: format!("/api/v1/attachments/{id}"),
        })
    }

    /// Resolve the on-disk path of a stored attachment for serving.
    pub async fn file_path(&self, id: i64, owner_id: i64) -> Result<PathBuf, StorageError> {
        let dir = self.config.base_path.join(owner_id.to_string());
        let prefix = id.to_string();

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(_) => return Err(StorageError::NotFound(prefix)),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name == prefix || name.starts_with(&format!("{prefix}.")) {
                return Ok(entry.path());
            }
        }
        Err(StorageError::NotFound(prefix))
    }

    /// Delete a stored attachment's blob. A blob that is already gone is not
    /// an error; the database row is the source of truth.
    pub async fn delete_file(&self, id: i64, owner_id: i64) -> Result<(), StorageError> {
        match self.file_path(id, owner_id).await {
            Ok(path) => {
                fs::remove_file(path).await?;
                Ok(())
            }
            Err(StorageError::NotFound(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }
}
