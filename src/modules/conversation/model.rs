use serde::Serialize;
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::modules::conversation::schema::{ConversationEntity, ConversationType, MessageRef};

#[derive(FromRow)]
pub struct ConversationRaw {
    pub id: Uuid,
    #[sqlx(rename = "type")]
    pub _type: ConversationType,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub group_id: Option<Uuid>,
    pub participant_ids: Vec<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,

    pub last_message_id: Option<Uuid>,
    pub last_sender_id: Option<Uuid>,
    pub last_content: Option<String>,
    pub last_created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<ConversationRaw> for ConversationEntity {
    fn from(raw: ConversationRaw) -> Self {
        let last_message = match (raw.last_message_id, raw.last_sender_id, raw.last_created_at) {
            (Some(message_id), Some(sender_id), Some(created_at)) => {
                Some(MessageRef { message_id, sender_id, content: raw.last_content, created_at })
            }
            _ => None,
        };

        ConversationEntity {
            id: raw.id,
            _type: raw._type,
            name: raw.name,
            avatar_url: raw.avatar_url,
            group_id: raw.group_id,
            participant_ids: raw.participant_ids,
            last_message,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        }
    }
}

/// Conversation hydrated with its message-reference log.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: ConversationEntity,
    pub messages: Vec<MessageRef>,
}
