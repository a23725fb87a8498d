use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::api::error;
use crate::modules::file_upload::{
    model::UploadConfig,
    schema::{FileMeta, UploadedFile},
};

/// Where message attachments are kept.
#[async_trait::async_trait]
pub trait FileStorage: Send + Sync {
    /// Stores the file and returns its public metadata. Nothing is written when
    /// the file is rejected.
    async fn upload(&self, file: UploadedFile) -> Result<FileMeta, error::SystemError>;

    /// Deletes a previously stored file. Unknown files are not an error.
    async fn remove(&self, meta: &FileMeta) -> Result<(), error::SystemError>;
}

#[derive(Clone)]
pub struct LocalFileStorage {
    config: UploadConfig,
}

impl LocalFileStorage {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    fn validate_file(&self, file: &UploadedFile) -> Result<(), error::SystemError> {
        if file.bytes.is_empty() {
            return Err(error::SystemError::bad_request("Uploaded file is empty"));
        }

        if file.bytes.len() > self.config.max_file_size {
            return Err(error::SystemError::payload_too_large(format!(
                "File size exceeds maximum allowed size of {} bytes",
                self.config.max_file_size
            )));
        }

        Ok(())
    }

    /// Unique stored name keeping the original extension
    fn generate_filename(original_filename: &str) -> String {
        let extension =
            Path::new(original_filename).extension().and_then(|ext| ext.to_str()).unwrap_or("");
        let uuid = Uuid::now_v7();
        if extension.is_empty() {
            uuid.to_string()
        } else {
            format!("{}.{}", uuid, extension.to_ascii_lowercase())
        }
    }

    /// Resolves a stored name inside the upload directory, rejecting anything that
    /// could escape it.
    pub fn resolve(&self, stored_name: &str) -> Option<PathBuf> {
        let path = Path::new(stored_name);
        let is_plain = path.components().count() == 1
            && path.file_name().is_some_and(|name| name == path.as_os_str());
        is_plain.then(|| Path::new(&self.config.upload_dir).join(path))
    }
}

#[async_trait::async_trait]
impl FileStorage for LocalFileStorage {
    async fn upload(&self, file: UploadedFile) -> Result<FileMeta, error::SystemError> {
        self.validate_file(&file)?;

        let stored_name = Self::generate_filename(&file.file_name);

        tokio::fs::create_dir_all(&self.config.upload_dir).await?;
        let file_path = Path::new(&self.config.upload_dir).join(&stored_name);
        tokio::fs::write(&file_path, &file.bytes).await?;

        tracing::debug!("Stored attachment {} ({} bytes)", stored_name, file.bytes.len());

        Ok(FileMeta {
            url: format!("{}/{}", self.config.base_url, stored_name),
            file_type: file.content_type,
            file_name: file.file_name,
            file_size: file.bytes.len() as i64,
        })
    }

    async fn remove(&self, meta: &FileMeta) -> Result<(), error::SystemError> {
        let stored_name = meta.url.rsplit('/').next().unwrap_or_default();
        let Some(path) = self.resolve(stored_name) else {
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("Removed attachment {}", stored_name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
