use std::sync::Arc;

use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        conversation::{
            model::ConversationDetail, repository::ConversationRepository,
            schema::ConversationEntity,
        },
        user::repository::UserRepository,
    },
};

#[derive(Clone)]
pub struct ConversationService<C, U>
where
    C: ConversationRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    conversation_repo: Arc<C>,
    user_repo: Arc<U>,
}

impl<C, U> ConversationService<C, U>
where
    C: ConversationRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    pub fn with_dependencies(conversation_repo: Arc<C>, user_repo: Arc<U>) -> Self {
        Self { conversation_repo, user_repo }
    }

    /// Most recently active first.
    pub async fn get_all_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ConversationEntity>, error::SystemError> {
        self.conversation_repo.find_all_by_user(&user_id).await
    }

    /// The personal conversation with `other_id` and its message log. Nothing is
    /// created here; conversations start with the first message.
    pub async fn get_personal_between(
        &self,
        user_id: Uuid,
        other_id: Uuid,
    ) -> Result<ConversationDetail, error::SystemError> {
        if user_id == other_id {
            return Err(error::SystemError::bad_request(
                "A personal conversation needs two distinct users",
            ));
        }

        self.user_repo
            .find_by_id(&other_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        let conversation = self
            .conversation_repo
            .find_personal_between(&user_id, &other_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Conversation not found"))?;

        let messages = self.conversation_repo.find_message_refs(&conversation.id).await?;

        Ok(ConversationDetail { conversation, messages })
    }
}
