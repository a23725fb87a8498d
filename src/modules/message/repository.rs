use uuid::Uuid;

use crate::{
    api::error,
    modules::message::{model::InsertMessage, schema::MessageEntity},
};

#[async_trait::async_trait]
pub trait MessageRepository {
    /// Persists the message and appends its reference to the conversation log
    /// atomically.
    async fn create(&self, message: &InsertMessage) -> Result<MessageEntity, error::SystemError>;

    async fn find_by_id(&self, message_id: &Uuid)
    -> Result<Option<MessageEntity>, error::SystemError>;

    /// Oldest first.
    async fn find_by_conversation(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<MessageEntity>, error::SystemError>;

    /// Sets `is_revoked` only when `sender_id` sent the message. `None` otherwise.
    async fn mark_revoked(
        &self,
        message_id: &Uuid,
        sender_id: &Uuid,
    ) -> Result<Option<MessageEntity>, error::SystemError>;
}
