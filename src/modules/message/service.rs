/// Message Service
///
/// Direct and group sends, history and revoke. A send validates, stores the
/// attachment, resolves the conversation, persists message and log entry in one
/// transaction and only then fans out. The attachment is removed again when
/// persisting fails.
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        conversation::{
            repository::ConversationRepository,
            schema::{ConversationEntity, ConversationType},
        },
        file_upload::{FileMeta, FileStorage, UploadedFile},
        group::{
            permission::{self, GroupAction},
            repository::GroupRepository,
        },
        message::{
            model::{InsertMessage, SendMessageData},
            repository::MessageRepository,
            schema::MessageEntity,
        },
        user::repository::UserRepository,
        websocket::{
            broadcaster::Broadcaster,
            message::{payload, ServerMessage},
        },
    },
};

#[derive(Clone)]
pub struct MessageService<M, C, G, U>
where
    M: MessageRepository + Send + Sync,
    C: ConversationRepository + Send + Sync,
    G: GroupRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    message_repo: Arc<M>,
    conversation_repo: Arc<C>,
    group_repo: Arc<G>,
    user_repo: Arc<U>,
    storage: Arc<dyn FileStorage>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl<M, C, G, U> MessageService<M, C, G, U>
where
    M: MessageRepository + Send + Sync,
    C: ConversationRepository + Send + Sync,
    G: GroupRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    pub fn with_dependencies(
        message_repo: Arc<M>,
        conversation_repo: Arc<C>,
        group_repo: Arc<G>,
        user_repo: Arc<U>,
        storage: Arc<dyn FileStorage>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        MessageService { message_repo, conversation_repo, group_repo, user_repo, storage, broadcaster }
    }

    async fn store_attachment(
        &self,
        file: Option<UploadedFile>,
    ) -> Result<Option<FileMeta>, error::SystemError> {
        match file {
            Some(file) => Ok(Some(self.storage.upload(file).await?)),
            None => Ok(None),
        }
    }

    /// Undoes `store_attachment` after the message could not be persisted.
    async fn discard_attachment(&self, file_meta: Option<&FileMeta>) {
        let Some(meta) = file_meta else {
            return;
        };

        if let Err(e) = self.storage.remove(meta).await {
            tracing::warn!("Failed to remove orphaned attachment {}: {}", meta.url, e);
        }
    }

    /// Existing personal conversation of the pair, or a new one. The flag is
    /// `true` only when this call created it. Losing a creation race is not an
    /// error: the winner's conversation is read back and reused.
    async fn resolve_personal_conversation(
        &self,
        sender_id: &Uuid,
        receiver_id: &Uuid,
    ) -> Result<(ConversationEntity, bool), error::SystemError> {
        if let Some(existing) =
            self.conversation_repo.find_personal_between(sender_id, receiver_id).await?
        {
            return Ok((existing, false));
        }

        match self.conversation_repo.create_personal(sender_id, receiver_id).await {
            Ok(created) => {
                tracing::info!(
                    "Personal conversation {} created for {} and {}",
                    created.id,
                    sender_id,
                    receiver_id
                );
                Ok((created, true))
            }
            Err(error::SystemError::Conflict(_)) => {
                tracing::debug!("Lost personal conversation race for {} and {}", sender_id, receiver_id);
                self.conversation_repo
                    .find_personal_between(sender_id, receiver_id)
                    .await?
                    .map(|winner| (winner, false))
                    .ok_or_else(|| {
                        error::SystemError::InternalError(
                            "personal conversation vanished after unique violation".into(),
                        )
                    })
            }
            Err(e) => Err(e),
        }
    }

    pub async fn send_direct_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        data: SendMessageData,
        file: Option<UploadedFile>,
    ) -> Result<MessageEntity, error::SystemError> {
        let (message_type, content) = data.normalize(file.is_some())?;

        if sender_id == receiver_id {
            return Err(error::SystemError::bad_request("You cannot send a message to yourself"));
        }

        self.user_repo
            .find_by_id(&receiver_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Recipient not found"))?;

        let file_meta = self.store_attachment(file).await?;

        let persisted = async {
            let (conversation, created) =
                self.resolve_personal_conversation(&sender_id, &receiver_id).await?;
            let message = self
                .message_repo
                .create(&InsertMessage {
                    id: Uuid::now_v7(),
                    conversation_id: conversation.id,
                    sender_id,
                    receiver_id: Some(receiver_id),
                    message_type,
                    content,
                    file_meta: file_meta.clone(),
                })
                .await?;
            Ok::<_, error::SystemError>((conversation, created, message))
        }
        .await;

        let (mut conversation, created, message) = match persisted {
            Ok(stored) => stored,
            Err(e) => {
                self.discard_attachment(file_meta.as_ref()).await;
                return Err(e);
            }
        };

        let last_message = message.to_ref();
        let both = [sender_id, receiver_id];

        if created {
            conversation.last_message = Some(last_message.clone());
            conversation.updated_at = message.created_at;
            self.broadcaster.notify(
                &both,
                ServerMessage::NewConversation { conversation: payload(&conversation), group: None },
            );
        }

        self.broadcaster.notify(
            &both,
            ServerMessage::UpdateLastMessage {
                conversation_id: conversation.id,
                last_message: payload(&last_message),
            },
        );
        self.broadcaster
            .notify(&[receiver_id], ServerMessage::ReceiveMessage { message: payload(&message) });

        Ok(message)
    }

    pub async fn send_group_message(
        &self,
        sender_id: Uuid,
        conversation_id: Uuid,
        data: SendMessageData,
        file: Option<UploadedFile>,
    ) -> Result<MessageEntity, error::SystemError> {
        let (message_type, content) = data.normalize(file.is_some())?;

        let conversation = self
            .conversation_repo
            .find_by_id(&conversation_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Conversation not found"))?;

        if conversation._type != ConversationType::Group {
            return Err(error::SystemError::bad_request("Conversation is not a group conversation"));
        }

        if !conversation.has_participant(&sender_id) {
            return Err(error::SystemError::forbidden("You are not a member of this conversation"));
        }

        let group = self
            .group_repo
            .find_by_conversation_id(&conversation_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Group not found"))?;
        permission::authorize(&group, &sender_id, GroupAction::SendMessage)?;

        let file_meta = self.store_attachment(file).await?;

        let persisted = self
            .message_repo
            .create(&InsertMessage {
                id: Uuid::now_v7(),
                conversation_id,
                sender_id,
                receiver_id: None,
                message_type,
                content,
                file_meta: file_meta.clone(),
            })
            .await;

        let message = match persisted {
            Ok(message) => message,
            Err(e) => {
                self.discard_attachment(file_meta.as_ref()).await;
                return Err(e);
            }
        };

        tracing::debug!(
            "Group message {} stored in conversation {} ({} participants)",
            message.id,
            conversation_id,
            conversation.participant_ids.len()
        );

        let participants = &conversation.participant_ids;
        self.broadcaster.notify(
            participants,
            ServerMessage::UpdateLastMessage {
                conversation_id,
                last_message: payload(&message.to_ref()),
            },
        );
        self.broadcaster.notify(
            participants,
            ServerMessage::ReceiveGroupMessage { conversation_id, message: payload(&message) },
        );

        Ok(message)
    }

    pub async fn get_by_conversation(
        &self,
        conversation_id: Uuid,
        requester_id: Uuid,
    ) -> Result<Vec<MessageEntity>, error::SystemError> {
        let conversation = self
            .conversation_repo
            .find_by_id(&conversation_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Conversation not found"))?;

        if !conversation.has_participant(&requester_id) {
            return Err(error::SystemError::forbidden("You are not a member of this conversation"));
        }

        self.message_repo.find_by_conversation(&conversation_id).await
    }

    /// Soft revoke: the content is kept and only the flag changes. Revoking an
    /// already revoked message succeeds again.
    pub async fn revoke(
        &self,
        message_id: Uuid,
        acting_user_id: Uuid,
    ) -> Result<MessageEntity, error::SystemError> {
        let message = self
            .message_repo
            .find_by_id(&message_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Message not found"))?;

        if message.sender_id != acting_user_id {
            return Err(error::SystemError::forbidden("Only the sender can revoke this message"));
        }

        let revoked = self
            .message_repo
            .mark_revoked(&message_id, &acting_user_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Message not found"))?;

        let participants = self
            .conversation_repo
            .find_by_id(&revoked.conversation_id)
            .await?
            .map(|c| c.participant_ids)
            .unwrap_or_default();

        self.broadcaster.notify(
            &participants,
            ServerMessage::MessageRevoked {
                message_id,
                conversation_id: revoked.conversation_id,
                is_revoked: true,
            },
        );

        Ok(revoked)
    }
}
