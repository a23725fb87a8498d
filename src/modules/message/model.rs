use uuid::Uuid;

use crate::{
    api::error,
    modules::{file_upload::FileMeta, message::schema::MessageType},
};

#[derive(Debug, Clone)]
pub struct InsertMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Option<Uuid>,
    pub message_type: MessageType,
    pub content: Option<String>,
    pub file_meta: Option<FileMeta>,
}

/// Client-supplied part of a message, shared by the HTTP and socket entry points.
#[derive(Debug, Clone, Default)]
pub struct SendMessageData {
    pub content: Option<String>,
    pub message_type: Option<String>,
}

impl SendMessageData {
    pub fn new(content: impl Into<String>, message_type: Option<String>) -> Self {
        Self { content: Some(content.into()), message_type }
    }

    /// Resolves the type and trimmed content. Without an explicit type, an
    /// attachment makes the message a `file`.
    pub fn normalize(
        &self,
        has_attachment: bool,
    ) -> Result<(MessageType, Option<String>), error::SystemError> {
        let message_type = match self.message_type.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(raw) => raw.parse()?,
            None if has_attachment => MessageType::File,
            None => MessageType::Text,
        };

        let content = self
            .content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        if content.is_none() && !has_attachment {
            return Err(error::SystemError::bad_request(
                "Message must have content or an attachment",
            ));
        }

        Ok((message_type, content))
    }
}
