use crate::{constants::DEFAULT_MAX_UPLOAD_SIZE, ENV};

/// Local storage configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_file_size: usize,
    pub upload_dir: String,
    pub base_url: String,
}

impl UploadConfig {
    pub fn from_env() -> Self {
        Self {
            max_file_size: ENV.max_upload_size,
            upload_dir: ENV.upload_dir.clone(),
            base_url: ENV.upload_base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_UPLOAD_SIZE,
            upload_dir: "./uploads".to_string(),
            base_url: "/uploads".to_string(),
        }
    }
}
