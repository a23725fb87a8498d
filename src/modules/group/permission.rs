//! Pure authorization rules for group actions. Nothing here reads storage; callers
//! pass the role and settings snapshot they just loaded.

use uuid::Uuid;

use crate::{
    api::error,
    modules::group::schema::{GroupEntity, GroupMember, GroupRole, PermissionSetting},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupAction {
    SendMessage,
    AddMembers,
    ShareInviteLink,
}

impl GroupAction {
    fn denied_message(self) -> &'static str {
        match self {
            GroupAction::SendMessage => "You are not allowed to send messages in this group",
            GroupAction::AddMembers => "You are not allowed to add members to this group",
            GroupAction::ShareInviteLink => "You are not allowed to share this group's invite link",
        }
    }
}

/// The action only selects which setting applies; the table is the same for all of them.
pub fn can_perform(_action: GroupAction, role: GroupRole, setting: PermissionSetting) -> bool {
    match setting {
        PermissionSetting::All => true,
        PermissionSetting::AdminsModerators => {
            matches!(role, GroupRole::Admin | GroupRole::Moderator)
        }
        PermissionSetting::Admins => role == GroupRole::Admin,
    }
}

/// Self-leave, an admin removing anyone, or a moderator removing a plain member.
/// The creator rule is checked separately since it is a validation failure.
pub fn can_remove(actor_role: GroupRole, target_role: GroupRole, is_self: bool) -> bool {
    is_self
        || actor_role == GroupRole::Admin
        || (actor_role == GroupRole::Moderator && target_role == GroupRole::Member)
}

pub fn require_member<'a>(
    group: &'a GroupEntity,
    user_id: &Uuid,
) -> Result<&'a GroupMember, error::SystemError> {
    group
        .member(user_id)
        .ok_or_else(|| error::SystemError::forbidden("You are not a member of this group"))
}

pub fn require_admin<'a>(
    group: &'a GroupEntity,
    user_id: &Uuid,
) -> Result<&'a GroupMember, error::SystemError> {
    let member = require_member(group, user_id)?;
    if member.role != GroupRole::Admin {
        return Err(error::SystemError::forbidden("Only group admins can perform this action"));
    }
    Ok(member)
}

/// Membership plus the setting that governs `action`.
pub fn authorize<'a>(
    group: &'a GroupEntity,
    user_id: &Uuid,
    action: GroupAction,
) -> Result<&'a GroupMember, error::SystemError> {
    let member = require_member(group, user_id)?;
    if !can_perform(action, member.role, group.settings.policy_for(action)) {
        return Err(error::SystemError::forbidden(action.denied_message()));
    }
    Ok(member)
}
