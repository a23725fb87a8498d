use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        conversation::repository_pg as conversation_pg,
        message::{model::InsertMessage, repository::MessageRepository, schema::MessageEntity},
    },
};

#[derive(Clone)]
pub struct MessageRepositoryPg {
    pool: sqlx::PgPool,
}

impl MessageRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MessageRepository for MessageRepositoryPg {
    async fn create(&self, message: &InsertMessage) -> Result<MessageEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let entity = sqlx::query_as::<_, MessageEntity>(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, receiver_id, message_type, content, file_meta)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(message.message_type)
        .bind(&message.content)
        .bind(message.file_meta.clone().map(sqlx::types::Json))
        .fetch_one(&mut *tx)
        .await?;

        conversation_pg::append_message_ref(&mut tx, &entity.conversation_id, &entity.to_ref())
            .await?;

        tx.commit().await?;

        Ok(entity)
    }

    async fn find_by_id(
        &self,
        message_id: &Uuid,
    ) -> Result<Option<MessageEntity>, error::SystemError> {
        let message = sqlx::query_as::<_, MessageEntity>("SELECT * FROM messages WHERE id = $1")
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(message)
    }

    async fn find_by_conversation(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<MessageEntity>, error::SystemError> {
        // index on (conversation_id, created_at)
        let messages = sqlx::query_as::<_, MessageEntity>(
            "SELECT * FROM messages WHERE conversation_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn mark_revoked(
        &self,
        message_id: &Uuid,
        sender_id: &Uuid,
    ) -> Result<Option<MessageEntity>, error::SystemError> {
        let message = sqlx::query_as::<_, MessageEntity>(
            r#"
            UPDATE messages
            SET is_revoked = TRUE, updated_at = NOW()
            WHERE id = $1 AND sender_id = $2
            RETURNING *
            "#,
        )
        .bind(message_id)
        .bind(sender_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(message)
    }
}
