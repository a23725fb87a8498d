use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::{
    modules::group::schema::{
        GroupEntity, GroupMember, GroupRole, GroupSettings, InviteLink, PermissionSetting,
    },
    utils::double_option,
};

#[derive(Debug, Clone, FromRow)]
pub struct GroupRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub creator_id: Uuid,
    pub conversation_id: Uuid,
    pub who_can_send_messages: PermissionSetting,
    pub who_can_add_members: PermissionSetting,
    pub who_can_share_invite_link: PermissionSetting,
    pub invite_code: String,
    pub invite_active: bool,
    pub invite_created_at: chrono::DateTime<chrono::Utc>,
    pub version: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl GroupRow {
    pub fn into_entity(self, members: Vec<GroupMember>) -> GroupEntity {
        GroupEntity {
            id: self.id,
            name: self.name,
            description: self.description,
            avatar_url: self.avatar_url,
            creator_id: self.creator_id,
            members,
            settings: GroupSettings {
                who_can_send_messages: self.who_can_send_messages,
                who_can_add_members: self.who_can_add_members,
                who_can_share_invite_link: self.who_can_share_invite_link,
            },
            invite_link: InviteLink {
                code: self.invite_code,
                is_active: self.invite_active,
                created_at: self.invite_created_at,
            },
            conversation_id: self.conversation_id,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct GroupMemberRow {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: GroupRole,
    pub joined_at: chrono::DateTime<chrono::Utc>,
}

impl From<GroupMemberRow> for GroupMember {
    fn from(row: GroupMemberRow) -> Self {
        GroupMember { user_id: row.user_id, role: row.role, joined_at: row.joined_at }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupBody {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub member_ids: Vec<Uuid>,
}

/// Partial update. `description` and `avatarUrl` accept `null` to clear.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupBody {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub avatar_url: Option<Option<String>>,
    pub who_can_send_messages: Option<PermissionSetting>,
    pub who_can_add_members: Option<PermissionSetting>,
    pub who_can_share_invite_link: Option<PermissionSetting>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberBody {
    pub member_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRoleBody {
    pub role: GroupRole,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InviteLinkStatusBody {
    pub is_active: bool,
}
