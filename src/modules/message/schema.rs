use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

use crate::{
    api::error,
    modules::{conversation::schema::MessageRef, file_upload::FileMeta},
};

/// Snapshot stored in the conversation log for messages without text.
pub const ATTACHMENT_SNAPSHOT: &str = "Sent an attachment";

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "message_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    Video,
    File,
    Voice,
}

impl FromStr for MessageType {
    type Err = error::SystemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(MessageType::Text),
            "image" => Ok(MessageType::Image),
            "video" => Ok(MessageType::Video),
            "file" => Ok(MessageType::File),
            "voice" => Ok(MessageType::Voice),
            other => Err(error::SystemError::bad_request(format!("Invalid message type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MessageEntity {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Option<Uuid>,
    pub message_type: MessageType,
    pub content: Option<String>,
    pub file_meta: Option<sqlx::types::Json<FileMeta>>,
    pub is_revoked: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl MessageEntity {
    /// Entry appended to the conversation log for this message.
    pub fn to_ref(&self) -> MessageRef {
        MessageRef {
            message_id: self.id,
            sender_id: self.sender_id,
            content: Some(self.content.clone().unwrap_or_else(|| ATTACHMENT_SNAPSHOT.to_string())),
            created_at: self.created_at,
        }
    }
}
