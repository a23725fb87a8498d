use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    api::error,
    modules::conversation::{
        model::ConversationRaw,
        repository::ConversationRepository,
        schema::{ConversationEntity, ConversationType, MessageRef},
    },
    utils::ordered_pair,
};

const CONVERSATION_SELECT: &str = r#"
    SELECT
        c.id,
        c.type,
        c.name,
        c.avatar_url,
        c.group_id,
        c.created_at,
        c.updated_at,
        ARRAY(
            SELECT p.user_id
            FROM participants p
            WHERE p.conversation_id = c.id
            ORDER BY p.joined_at, p.user_id
        ) AS participant_ids,
        lm.message_id AS last_message_id,
        lm.sender_id AS last_sender_id,
        lm.content AS last_content,
        lm.created_at AS last_created_at
    FROM conversations c
    LEFT JOIN conversation_messages lm
        ON lm.conversation_id = c.id AND lm.message_id = c.last_message_id
"#;

#[derive(Clone)]
pub struct ConversationPgRepository {
    pool: sqlx::PgPool,
}

impl ConversationPgRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) async fn select_by_id(
    conn: &mut PgConnection,
    conversation_id: &Uuid,
) -> Result<Option<ConversationEntity>, error::SystemError> {
    let sql = format!("{CONVERSATION_SELECT} WHERE c.id = $1");
    let raw = sqlx::query_as::<_, ConversationRaw>(&sql)
        .bind(conversation_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(raw.map(ConversationEntity::from))
}

pub(crate) async fn insert_group_conversation(
    conn: &mut PgConnection,
    conversation_id: &Uuid,
    group_id: &Uuid,
    name: &str,
    avatar_url: &Option<String>,
    member_ids: &[Uuid],
) -> Result<(), error::SystemError> {
    sqlx::query(
        r#"
        INSERT INTO conversations (id, type, name, avatar_url, group_id)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(conversation_id)
    .bind(ConversationType::Group)
    .bind(name)
    .bind(avatar_url)
    .bind(group_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        "INSERT INTO participants (conversation_id, user_id) SELECT $1, UNNEST($2::uuid[])",
    )
    .bind(conversation_id)
    .bind(member_ids)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Makes the conversation's name, avatar and participant set equal to the group's.
pub(crate) async fn sync_group_mirror(
    conn: &mut PgConnection,
    conversation_id: &Uuid,
    name: &str,
    avatar_url: &Option<String>,
    member_ids: &[Uuid],
) -> Result<(), error::SystemError> {
    sqlx::query(
        r#"
        UPDATE conversations
        SET name = $2, avatar_url = $3, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(conversation_id)
    .bind(name)
    .bind(avatar_url)
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM participants WHERE conversation_id = $1 AND user_id <> ALL($2)")
        .bind(conversation_id)
        .bind(member_ids)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO participants (conversation_id, user_id)
        SELECT $1, UNNEST($2::uuid[])
        ON CONFLICT (conversation_id, user_id) DO NOTHING
        "#,
    )
    .bind(conversation_id)
    .bind(member_ids)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn delete_conversation(
    conn: &mut PgConnection,
    conversation_id: &Uuid,
) -> Result<(), error::SystemError> {
    sqlx::query("DELETE FROM conversations WHERE id = $1")
        .bind(conversation_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Appends to the message log and moves `last_message`. Each append is its own
/// row, so concurrent senders never overwrite one another's entries.
pub(crate) async fn append_message_ref(
    conn: &mut PgConnection,
    conversation_id: &Uuid,
    message_ref: &MessageRef,
) -> Result<(), error::SystemError> {
    sqlx::query(
        r#"
        INSERT INTO conversation_messages (conversation_id, message_id, sender_id, content, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(conversation_id)
    .bind(message_ref.message_id)
    .bind(message_ref.sender_id)
    .bind(&message_ref.content)
    .bind(message_ref.created_at)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        UPDATE conversations
        SET last_message_id = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(conversation_id)
    .bind(message_ref.message_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait::async_trait]
impl ConversationRepository for ConversationPgRepository {
    async fn find_by_id(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError> {
        let mut conn = self.pool.acquire().await?;
        select_by_id(&mut conn, conversation_id).await
    }

    async fn find_personal_between(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError> {
        let (low, high) = ordered_pair(*user_a, *user_b);
        let sql = format!(
            "{CONVERSATION_SELECT} WHERE c.type = 'personal' AND c.personal_low = $1 AND c.personal_high = $2"
        );

        let raw = sqlx::query_as::<_, ConversationRaw>(&sql)
            .bind(low)
            .bind(high)
            .fetch_optional(&self.pool)
            .await?;

        Ok(raw.map(ConversationEntity::from))
    }

    async fn create_personal(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<ConversationEntity, error::SystemError> {
        let (low, high) = ordered_pair(*user_a, *user_b);
        if low == high {
            return Err(error::SystemError::bad_request(
                "A personal conversation needs two distinct users",
            ));
        }

        let mut tx = self.pool.begin().await?;
        let id = Uuid::now_v7();

        // The unique index on (personal_low, personal_high) rejects a racing duplicate.
        sqlx::query(
            r#"
            INSERT INTO conversations (id, type, personal_low, personal_high)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(ConversationType::Personal)
        .bind(low)
        .bind(high)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO participants (conversation_id, user_id) VALUES ($1, $2), ($1, $3)",
        )
        .bind(id)
        .bind(low)
        .bind(high)
        .execute(&mut *tx)
        .await?;

        let conversation = select_by_id(&mut tx, &id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Conversation not found"))?;

        tx.commit().await?;

        Ok(conversation)
    }

    async fn find_all_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ConversationEntity>, error::SystemError> {
        let sql = format!(
            r#"{CONVERSATION_SELECT}
            WHERE c.id IN (SELECT conversation_id FROM participants WHERE user_id = $1)
            ORDER BY c.updated_at DESC"#
        );

        let rows = sqlx::query_as::<_, ConversationRaw>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ConversationEntity::from).collect())
    }

    async fn find_message_refs(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<MessageRef>, error::SystemError> {
        let refs = sqlx::query_as::<_, MessageRef>(
            r#"
            SELECT message_id, sender_id, content, created_at
            FROM conversation_messages
            WHERE conversation_id = $1
            ORDER BY created_at, message_id
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(refs)
    }
}
