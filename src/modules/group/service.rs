/// Group Service
///
/// Membership, roles, settings and invite links of a group. Every mutation
/// re-reads the aggregate, validates it against the fresh state and commits
/// conditionally on `version`; a stale commit is retried from scratch.
use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    api::error,
    constants::GROUP_COMMIT_ATTEMPTS,
    modules::{
        conversation::repository::ConversationRepository,
        group::{
            model::{CreateGroupBody, UpdateGroupBody},
            permission::{self, GroupAction},
            repository::GroupRepository,
            schema::{GroupEntity, GroupMember, GroupRole, GroupSettings, InviteLink},
        },
        user::repository::UserRepository,
        websocket::{
            broadcaster::Broadcaster,
            message::{payload, ServerMessage},
        },
    },
    utils::{generate_invite_code, validate_fields},
};

#[derive(Clone)]
pub struct GroupService<G, C, U>
where
    G: GroupRepository + Send + Sync,
    C: ConversationRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    group_repo: Arc<G>,
    conversation_repo: Arc<C>,
    user_repo: Arc<U>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl<G, C, U> GroupService<G, C, U>
where
    G: GroupRepository + Send + Sync,
    C: ConversationRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    pub fn with_dependencies(
        group_repo: Arc<G>,
        conversation_repo: Arc<C>,
        user_repo: Arc<U>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        GroupService { group_repo, conversation_repo, user_repo, broadcaster }
    }

    async fn load(&self, group_id: &Uuid) -> Result<GroupEntity, error::SystemError> {
        self.group_repo
            .find_by_id(group_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Group not found"))
    }

    async fn ensure_user_exists(&self, user_id: &Uuid) -> Result<(), error::SystemError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| error::SystemError::not_found("User not found"))
    }

    /// Load → apply → check admin invariant → conditional save, retried on a
    /// stale version. `apply` must be deterministic over the group it is given
    /// because it can run once per attempt.
    async fn commit<T, F>(
        &self,
        group_id: &Uuid,
        mut apply: F,
    ) -> Result<(GroupEntity, T), error::SystemError>
    where
        F: FnMut(&mut GroupEntity) -> Result<T, error::SystemError>,
    {
        for attempt in 1..=GROUP_COMMIT_ATTEMPTS {
            let mut group = self.load(group_id).await?;
            let outcome = apply(&mut group)?;
            group.ensure_has_admin()?;

            match self.group_repo.save(&group).await {
                Ok(saved) => return Ok((saved, outcome)),
                Err(error::SystemError::VersionConflict) => {
                    tracing::warn!(
                        "Stale commit on group {} (attempt {}/{})",
                        group_id,
                        attempt,
                        GROUP_COMMIT_ATTEMPTS
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(error::SystemError::VersionConflict)
    }

    pub async fn create(
        &self,
        creator_id: Uuid,
        body: CreateGroupBody,
    ) -> Result<GroupEntity, error::SystemError> {
        validate_fields(&body)?;

        let name = body.name.trim();
        if name.is_empty() {
            return Err(error::SystemError::bad_request("Group name is required"));
        }

        let mut seen = HashSet::from([creator_id]);
        let candidates: Vec<Uuid> =
            body.member_ids.into_iter().filter(|id| seen.insert(*id)).collect();
        let existing: HashSet<Uuid> =
            self.user_repo.find_existing_ids(&candidates).await?.into_iter().collect();

        let now = chrono::Utc::now();
        let mut members = vec![GroupMember { user_id: creator_id, role: GroupRole::Admin, joined_at: now }];
        members.extend(
            candidates
                .into_iter()
                .filter(|id| existing.contains(id))
                .map(|user_id| GroupMember { user_id, role: GroupRole::Member, joined_at: now }),
        );

        let draft = GroupEntity {
            id: Uuid::now_v7(),
            name: name.to_string(),
            description: body.description,
            avatar_url: body.avatar_url,
            creator_id,
            members,
            settings: GroupSettings::default(),
            invite_link: InviteLink { code: generate_invite_code(), is_active: true, created_at: now },
            conversation_id: Uuid::now_v7(),
            version: 0,
            created_at: now,
            updated_at: now,
        };

        let (group, conversation) = self.group_repo.create_with_conversation(&draft).await?;

        tracing::info!(
            "Group {} created by {} with {} member(s)",
            group.id,
            creator_id,
            group.members.len()
        );

        self.broadcaster.notify(
            &group.member_ids(),
            ServerMessage::NewConversation {
                conversation: payload(&conversation),
                group: Some(payload(&group)),
            },
        );

        Ok(group)
    }

    pub async fn add_member(
        &self,
        group_id: Uuid,
        member_id: Uuid,
        acting_user_id: Uuid,
    ) -> Result<GroupEntity, error::SystemError> {
        let current = self.load(&group_id).await?;
        permission::authorize(&current, &acting_user_id, GroupAction::AddMembers)?;
        self.ensure_user_exists(&member_id).await?;

        let (group, _) = self
            .commit(&group_id, |group| {
                permission::authorize(group, &acting_user_id, GroupAction::AddMembers)?;
                if group.is_member(&member_id) {
                    return Err(error::SystemError::conflict("User is already a member of this group"));
                }
                group.push_member(member_id, GroupRole::Member);
                Ok(())
            })
            .await?;

        tracing::info!("User {} added to group {} by {}", member_id, group_id, acting_user_id);

        self.announce_new_member(&group, member_id, acting_user_id);

        Ok(group)
    }

    pub async fn remove_member(
        &self,
        group_id: Uuid,
        member_id: Uuid,
        acting_user_id: Uuid,
    ) -> Result<GroupEntity, error::SystemError> {
        let (group, _) = self
            .commit(&group_id, |group| {
                let target_role = group
                    .member(&member_id)
                    .map(|m| m.role)
                    .ok_or_else(|| error::SystemError::not_found("Member not found in this group"))?;

                if member_id == group.creator_id {
                    return Err(error::SystemError::bad_request(
                        "The group creator cannot be removed",
                    ));
                }

                let actor_role = permission::require_member(group, &acting_user_id)?.role;
                if !permission::can_remove(actor_role, target_role, member_id == acting_user_id) {
                    return Err(error::SystemError::forbidden(
                        "You are not allowed to remove this member",
                    ));
                }

                group.members.retain(|m| m.user_id != member_id);
                Ok(())
            })
            .await?;

        tracing::info!("User {} removed from group {} by {}", member_id, group_id, acting_user_id);

        self.broadcaster.notify(
            &group.member_ids(),
            ServerMessage::MemberRemovedFromGroup {
                group_id,
                removed_member: member_id,
                removed_by: acting_user_id,
                group: payload(&group),
            },
        );
        self.broadcaster.notify(
            &[member_id],
            ServerMessage::RemovedFromGroup { group_id, conversation_id: group.conversation_id },
        );

        Ok(group)
    }

    pub async fn change_role(
        &self,
        group_id: Uuid,
        member_id: Uuid,
        new_role: GroupRole,
        acting_user_id: Uuid,
    ) -> Result<GroupEntity, error::SystemError> {
        let (group, _) = self
            .commit(&group_id, |group| {
                permission::require_admin(group, &acting_user_id)?;

                let is_creator = member_id == group.creator_id;
                let target = group
                    .members
                    .iter_mut()
                    .find(|m| m.user_id == member_id)
                    .ok_or_else(|| error::SystemError::not_found("Member not found in this group"))?;

                if is_creator && new_role != GroupRole::Admin {
                    return Err(error::SystemError::bad_request(
                        "The group creator must remain an admin",
                    ));
                }

                target.role = new_role;
                Ok(())
            })
            .await?;

        tracing::info!(
            "Role of {} in group {} changed to {:?} by {}",
            member_id,
            group_id,
            new_role,
            acting_user_id
        );

        self.broadcaster.notify(
            &group.member_ids(),
            ServerMessage::MemberRoleChanged {
                group_id,
                member_id,
                new_role,
                changed_by: acting_user_id,
                group: payload(&group),
            },
        );

        Ok(group)
    }

    pub async fn update_info(
        &self,
        group_id: Uuid,
        patch: UpdateGroupBody,
        acting_user_id: Uuid,
    ) -> Result<GroupEntity, error::SystemError> {
        validate_fields(&patch)?;

        let (group, _) = self
            .commit(&group_id, |group| {
                permission::require_admin(group, &acting_user_id)?;

                if let Some(name) = &patch.name {
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(error::SystemError::bad_request("Group name cannot be empty"));
                    }
                    group.name = name.to_string();
                }
                if let Some(description) = &patch.description {
                    group.description = description.clone();
                }
                if let Some(avatar_url) = &patch.avatar_url {
                    group.avatar_url = avatar_url.clone();
                }
                if let Some(setting) = patch.who_can_send_messages {
                    group.settings.who_can_send_messages = setting;
                }
                if let Some(setting) = patch.who_can_add_members {
                    group.settings.who_can_add_members = setting;
                }
                if let Some(setting) = patch.who_can_share_invite_link {
                    group.settings.who_can_share_invite_link = setting;
                }
                Ok(())
            })
            .await?;

        self.broadcaster.notify(
            &group.member_ids(),
            ServerMessage::GroupInfoUpdated {
                group_id,
                updated_by: acting_user_id,
                group: payload(&group),
            },
        );

        Ok(group)
    }

    pub async fn regenerate_invite_code(
        &self,
        group_id: Uuid,
        acting_user_id: Uuid,
    ) -> Result<InviteLink, error::SystemError> {
        let code = generate_invite_code();
        let (group, _) = self
            .commit(&group_id, |group| {
                permission::require_admin(group, &acting_user_id)?;
                group.invite_link =
                    InviteLink { code: code.clone(), is_active: true, created_at: chrono::Utc::now() };
                Ok(())
            })
            .await?;

        self.broadcaster.notify(
            &group.staff_ids(),
            ServerMessage::InviteLinkRegenerated {
                group_id,
                invite_link: payload(&group.invite_link),
                regenerated_by: acting_user_id,
            },
        );

        Ok(group.invite_link)
    }

    pub async fn set_invite_active(
        &self,
        group_id: Uuid,
        is_active: bool,
        acting_user_id: Uuid,
    ) -> Result<InviteLink, error::SystemError> {
        let (group, _) = self
            .commit(&group_id, |group| {
                permission::require_admin(group, &acting_user_id)?;
                group.invite_link.is_active = is_active;
                Ok(())
            })
            .await?;

        self.broadcaster.notify(
            &group.staff_ids(),
            ServerMessage::InviteLinkStatusUpdated {
                group_id,
                is_active,
                updated_by: acting_user_id,
            },
        );

        Ok(group.invite_link)
    }

    /// Joining through a link bypasses `who_can_add_members`.
    pub async fn join_by_invite_code(
        &self,
        code: &str,
        user_id: Uuid,
    ) -> Result<GroupEntity, error::SystemError> {
        let current = self
            .group_repo
            .find_by_invite_code(code)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Invite link not found"))?;

        check_joinable(&current, code, &user_id)?;
        self.ensure_user_exists(&user_id).await?;

        let (group, _) = self
            .commit(&current.id, |group| {
                check_joinable(group, code, &user_id)?;
                group.push_member(user_id, GroupRole::Member);
                Ok(())
            })
            .await?;

        tracing::info!("User {} joined group {} via invite link", user_id, group.id);

        self.announce_new_member(&group, user_id, user_id);

        if let Some(conversation) = self.conversation_repo.find_by_id(&group.conversation_id).await? {
            self.broadcaster.notify(
                &[user_id],
                ServerMessage::NewConversation {
                    conversation: payload(&conversation),
                    group: Some(payload(&group)),
                },
            );
        }

        Ok(group)
    }

    pub async fn delete(&self, group_id: Uuid, acting_user_id: Uuid) -> Result<(), error::SystemError> {
        for attempt in 1..=GROUP_COMMIT_ATTEMPTS {
            let group = self.load(&group_id).await?;
            permission::require_admin(&group, &acting_user_id)?;

            match self.group_repo.delete_with_conversation(&group).await {
                Ok(()) => {
                    tracing::info!("Group {} deleted by {}", group_id, acting_user_id);

                    self.broadcaster.notify(
                        &group.member_ids(),
                        ServerMessage::GroupDeleted {
                            group_id,
                            conversation_id: group.conversation_id,
                            deleted_by: acting_user_id,
                        },
                    );
                    return Ok(());
                }
                Err(error::SystemError::VersionConflict) => {
                    tracing::warn!(
                        "Stale delete on group {} (attempt {}/{})",
                        group_id,
                        attempt,
                        GROUP_COMMIT_ATTEMPTS
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(error::SystemError::VersionConflict)
    }

    pub async fn get_by_id(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<GroupEntity, error::SystemError> {
        let group = self.load(&group_id).await?;
        permission::require_member(&group, &user_id)?;
        Ok(group)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<GroupEntity>, error::SystemError> {
        self.group_repo.find_all_by_member(&user_id).await
    }

    pub async fn get_invite_link(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<InviteLink, error::SystemError> {
        let group = self.load(&group_id).await?;
        permission::authorize(&group, &user_id, GroupAction::ShareInviteLink)?;
        Ok(group.invite_link)
    }

    fn announce_new_member(&self, group: &GroupEntity, member_id: Uuid, added_by: Uuid) {
        let snapshot = payload(group);

        self.broadcaster.notify(
            &group.member_ids(),
            ServerMessage::MemberAddedToGroup {
                group_id: group.id,
                new_member: member_id,
                added_by,
                group: snapshot.clone(),
            },
        );
        self.broadcaster.notify(&[member_id], ServerMessage::AddedToGroup { group: snapshot });
    }
}

fn check_joinable(group: &GroupEntity, code: &str, user_id: &Uuid) -> Result<(), error::SystemError> {
    if group.invite_link.code != code {
        return Err(error::SystemError::not_found("Invite link not found"));
    }
    if !group.invite_link.is_active {
        return Err(error::SystemError::forbidden("This invite link is no longer active"));
    }
    if group.is_member(user_id) {
        return Err(error::SystemError::conflict("You are already a member of this group"));
    }
    Ok(())
}
