use std::collections::HashMap;

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        conversation::{repository_pg as conversation_pg, schema::ConversationEntity},
        group::{
            model::{GroupMemberRow, GroupRow},
            repository::GroupRepository,
            schema::{GroupEntity, GroupMember},
        },
    },
};

#[derive(Clone)]
pub struct GroupPgRepository {
    pool: sqlx::PgPool,
}

impl GroupPgRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    async fn hydrate(&self, rows: Vec<GroupRow>) -> Result<Vec<GroupEntity>, error::SystemError> {
        if rows.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let member_rows = sqlx::query_as::<_, GroupMemberRow>(
            r#"
            SELECT group_id, user_id, role, joined_at
            FROM group_members
            WHERE group_id = ANY($1)
            ORDER BY joined_at, user_id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut members: HashMap<Uuid, Vec<GroupMember>> = HashMap::new();
        for row in member_rows {
            members.entry(row.group_id).or_default().push(row.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let group_members = members.remove(&row.id).unwrap_or_default();
                row.into_entity(group_members)
            })
            .collect())
    }

    async fn find_one(&self, lookup: Lookup<'_>) -> Result<Option<GroupEntity>, error::SystemError> {
        let query = match lookup {
            Lookup::Id(id) => {
                sqlx::query_as::<_, GroupRow>("SELECT * FROM groups WHERE id = $1").bind(*id)
            }
            Lookup::InviteCode(code) => {
                sqlx::query_as::<_, GroupRow>("SELECT * FROM groups WHERE invite_code = $1")
                    .bind(code)
            }
            Lookup::ConversationId(id) => {
                sqlx::query_as::<_, GroupRow>("SELECT * FROM groups WHERE conversation_id = $1")
                    .bind(*id)
            }
        };

        let row = query.fetch_optional(&self.pool).await?;

        Ok(self.hydrate(row.into_iter().collect()).await?.pop())
    }
}

enum Lookup<'a> {
    Id(&'a Uuid),
    InviteCode(&'a str),
    ConversationId(&'a Uuid),
}

async fn replace_members(
    conn: &mut PgConnection,
    group_id: &Uuid,
    members: &[GroupMember],
) -> Result<(), error::SystemError> {
    sqlx::query("DELETE FROM group_members WHERE group_id = $1")
        .bind(group_id)
        .execute(&mut *conn)
        .await?;

    for member in members {
        sqlx::query(
            r#"
            INSERT INTO group_members (group_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(group_id)
        .bind(member.user_id)
        .bind(member.role)
        .bind(member.joined_at)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

#[async_trait::async_trait]
impl GroupRepository for GroupPgRepository {
    async fn find_by_id(&self, group_id: &Uuid) -> Result<Option<GroupEntity>, error::SystemError> {
        self.find_one(Lookup::Id(group_id)).await
    }

    async fn find_by_invite_code(
        &self,
        code: &str,
    ) -> Result<Option<GroupEntity>, error::SystemError> {
        self.find_one(Lookup::InviteCode(code)).await
    }

    async fn find_by_conversation_id(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<GroupEntity>, error::SystemError> {
        self.find_one(Lookup::ConversationId(conversation_id)).await
    }

    async fn find_all_by_member(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<GroupEntity>, error::SystemError> {
        let rows = sqlx::query_as::<_, GroupRow>(
            r#"
            SELECT g.*
            FROM groups g
            JOIN group_members gm ON gm.group_id = g.id
            WHERE gm.user_id = $1
            ORDER BY g.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn create_with_conversation(
        &self,
        group: &GroupEntity,
    ) -> Result<(GroupEntity, ConversationEntity), error::SystemError> {
        let mut tx = self.pool.begin().await?;

        conversation_pg::insert_group_conversation(
            &mut tx,
            &group.conversation_id,
            &group.id,
            &group.name,
            &group.avatar_url,
            &group.member_ids(),
        )
        .await?;

        let row = sqlx::query_as::<_, GroupRow>(
            r#"
            INSERT INTO groups (
                id, name, description, avatar_url, creator_id, conversation_id,
                who_can_send_messages, who_can_add_members, who_can_share_invite_link,
                invite_code, invite_active, invite_created_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 0)
            RETURNING *
            "#,
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(&group.avatar_url)
        .bind(group.creator_id)
        .bind(group.conversation_id)
        .bind(group.settings.who_can_send_messages)
        .bind(group.settings.who_can_add_members)
        .bind(group.settings.who_can_share_invite_link)
        .bind(&group.invite_link.code)
        .bind(group.invite_link.is_active)
        .bind(group.invite_link.created_at)
        .fetch_one(&mut *tx)
        .await?;

        replace_members(&mut tx, &group.id, &group.members).await?;

        let conversation = conversation_pg::select_by_id(&mut tx, &group.conversation_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Conversation not found"))?;

        tx.commit().await?;

        Ok((row.into_entity(group.members.clone()), conversation))
    }

    async fn save(&self, group: &GroupEntity) -> Result<GroupEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, GroupRow>(
            r#"
            UPDATE groups
            SET
                name = $3,
                description = $4,
                avatar_url = $5,
                who_can_send_messages = $6,
                who_can_add_members = $7,
                who_can_share_invite_link = $8,
                invite_code = $9,
                invite_active = $10,
                invite_created_at = $11,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(group.id)
        .bind(group.version)
        .bind(&group.name)
        .bind(&group.description)
        .bind(&group.avatar_url)
        .bind(group.settings.who_can_send_messages)
        .bind(group.settings.who_can_add_members)
        .bind(group.settings.who_can_share_invite_link)
        .bind(&group.invite_link.code)
        .bind(group.invite_link.is_active)
        .bind(group.invite_link.created_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Err(error::SystemError::VersionConflict);
        };

        replace_members(&mut tx, &group.id, &group.members).await?;

        conversation_pg::sync_group_mirror(
            &mut tx,
            &row.conversation_id,
            &row.name,
            &row.avatar_url,
            &group.member_ids(),
        )
        .await?;

        tx.commit().await?;

        Ok(row.into_entity(group.members.clone()))
    }

    async fn delete_with_conversation(
        &self,
        group: &GroupEntity,
    ) -> Result<(), error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM groups WHERE id = $1 AND version = $2")
            .bind(group.id)
            .bind(group.version)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(error::SystemError::VersionConflict);
        }

        conversation_pg::delete_conversation(&mut tx, &group.conversation_id).await?;

        tx.commit().await?;

        Ok(())
    }
}
