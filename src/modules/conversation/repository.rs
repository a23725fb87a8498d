use uuid::Uuid;

use crate::{
    api::error,
    modules::conversation::schema::{ConversationEntity, MessageRef},
};

/// Read and personal-create side of the conversation store.
///
/// Group conversations are written only through the group repository's
/// transactional commit, which keeps name, avatar and participants mirrored.
#[async_trait::async_trait]
pub trait ConversationRepository {
    async fn find_by_id(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError>;

    /// Personal conversation whose participant set is exactly `{user_a, user_b}`.
    async fn find_personal_between(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError>;

    /// Fails with `SystemError::Conflict` when the pair already has a conversation.
    async fn create_personal(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<ConversationEntity, error::SystemError>;

    async fn find_all_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ConversationEntity>, error::SystemError>;

    async fn find_message_refs(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<MessageRef>, error::SystemError>;
}
