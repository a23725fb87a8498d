use serde::{Deserialize, Serialize};

/// Stored attachment as embedded in a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    pub url: String,
    pub file_type: String,
    pub file_name: String,
    pub file_size: i64,
}

/// Attachment bytes received from a client, not yet stored.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}
