use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "conversation_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationType {
    Personal,
    Group,
    Channel,
}

/// Lightweight entry of a conversation's message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MessageRef {
    pub message_id: Uuid,
    pub sender_id: Uuid,
    pub content: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntity {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub _type: ConversationType,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub group_id: Option<Uuid>,
    pub participant_ids: Vec<Uuid>,
    pub last_message: Option<MessageRef>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ConversationEntity {
    pub fn has_participant(&self, user_id: &Uuid) -> bool {
        self.participant_ids.contains(user_id)
    }
}
