use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

use crate::{api::error, modules::group::permission::GroupAction};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "group_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Admin,
    Moderator,
    Member,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "permission_setting", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PermissionSetting {
    All,
    AdminsModerators,
    Admins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSettings {
    pub who_can_send_messages: PermissionSetting,
    pub who_can_add_members: PermissionSetting,
    pub who_can_share_invite_link: PermissionSetting,
}

impl Default for GroupSettings {
    fn default() -> Self {
        Self {
            who_can_send_messages: PermissionSetting::All,
            who_can_add_members: PermissionSetting::Admins,
            who_can_share_invite_link: PermissionSetting::All,
        }
    }
}

impl GroupSettings {
    pub fn policy_for(&self, action: GroupAction) -> PermissionSetting {
        match action {
            GroupAction::SendMessage => self.who_can_send_messages,
            GroupAction::AddMembers => self.who_can_add_members,
            GroupAction::ShareInviteLink => self.who_can_share_invite_link,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct GroupMember {
    pub user_id: Uuid,
    pub role: GroupRole,
    pub joined_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InviteLink {
    pub code: String,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupEntity {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub creator_id: Uuid,
    pub members: Vec<GroupMember>,
    pub settings: GroupSettings,
    pub invite_link: InviteLink,
    pub conversation_id: Uuid,
    /// Incremented by every commit; writers must present the value they read.
    pub version: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl GroupEntity {
    pub fn member(&self, user_id: &Uuid) -> Option<&GroupMember> {
        self.members.iter().find(|m| m.user_id == *user_id)
    }

    pub fn is_member(&self, user_id: &Uuid) -> bool {
        self.member(user_id).is_some()
    }

    pub fn member_ids(&self) -> Vec<Uuid> {
        self.members.iter().map(|m| m.user_id).collect()
    }

    /// Admins and moderators, the audience for invite-link changes.
    pub fn staff_ids(&self) -> Vec<Uuid> {
        self.members
            .iter()
            .filter(|m| matches!(m.role, GroupRole::Admin | GroupRole::Moderator))
            .map(|m| m.user_id)
            .collect()
    }

    pub fn admin_count(&self) -> usize {
        self.members.iter().filter(|m| m.role == GroupRole::Admin).count()
    }

    pub fn ensure_has_admin(&self) -> Result<(), error::SystemError> {
        if !self.members.is_empty() && self.admin_count() == 0 {
            return Err(error::SystemError::invariant("Group must retain at least one admin"));
        }
        Ok(())
    }

    pub fn push_member(&mut self, user_id: Uuid, role: GroupRole) {
        self.members.push(GroupMember { user_id, role, joined_at: chrono::Utc::now() });
    }
}
