use actix_web::{delete, get, patch, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_extensions,
    modules::{
        conversation::repository_pg::ConversationPgRepository,
        group::{
            model::{AddMemberBody, ChangeRoleBody, CreateGroupBody, InviteLinkStatusBody, UpdateGroupBody},
            repository_pg::GroupPgRepository,
            schema::{GroupEntity, InviteLink},
            service::GroupService,
        },
        user::repository_pg::UserRepositoryPg,
    },
    utils::{Claims, ValidatedJson},
};

pub type GroupSvc = GroupService<GroupPgRepository, ConversationPgRepository, UserRepositoryPg>;

#[post("")]
pub async fn create_group(
    group_service: web::Data<GroupSvc>,
    body: ValidatedJson<CreateGroupBody>,
    req: HttpRequest,
) -> Result<success::Success<GroupEntity>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    let group = group_service.create(user_id, body.0).await?;

    Ok(success::Success::created(Some(group)).message("Group created successfully"))
}

#[get("")]
pub async fn list_groups(
    group_service: web::Data<GroupSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<GroupEntity>>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    let groups = group_service.list_for_user(user_id).await?;

    Ok(success::Success::ok(Some(groups)).message("Groups retrieved successfully"))
}

#[post("/join/{invite_code}")]
pub async fn join_group(
    group_service: web::Data<GroupSvc>,
    invite_code: web::Path<String>,
    req: HttpRequest,
) -> Result<success::Success<GroupEntity>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    let group = group_service.join_by_invite_code(&invite_code, user_id).await?;

    Ok(success::Success::ok(Some(group)).message("Joined group successfully"))
}

#[get("/{group_id}")]
pub async fn get_group(
    group_service: web::Data<GroupSvc>,
    group_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<GroupEntity>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    let group = group_service.get_by_id(*group_id, user_id).await?;

    Ok(success::Success::ok(Some(group)).message("Group retrieved successfully"))
}

#[patch("/{group_id}")]
pub async fn update_group(
    group_service: web::Data<GroupSvc>,
    group_id: web::Path<Uuid>,
    body: ValidatedJson<UpdateGroupBody>,
    req: HttpRequest,
) -> Result<success::Success<GroupEntity>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    let group = group_service.update_info(*group_id, body.0, user_id).await?;

    Ok(success::Success::ok(Some(group)).message("Group updated successfully"))
}

#[delete("/{group_id}")]
pub async fn delete_group(
    group_service: web::Data<GroupSvc>,
    group_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    group_service.delete(*group_id, user_id).await?;
    Ok(success::Success::no_content())
}

#[post("/{group_id}/members")]
pub async fn add_member(
    group_service: web::Data<GroupSvc>,
    group_id: web::Path<Uuid>,
    body: ValidatedJson<AddMemberBody>,
    req: HttpRequest,
) -> Result<success::Success<GroupEntity>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    let group = group_service.add_member(*group_id, body.0.member_id, user_id).await?;

    Ok(success::Success::ok(Some(group)).message("Member added successfully"))
}

#[delete("/{group_id}/members/{member_id}")]
pub async fn remove_member(
    group_service: web::Data<GroupSvc>,
    path: web::Path<(Uuid, Uuid)>,
    req: HttpRequest,
) -> Result<success::Success<GroupEntity>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    let (group_id, member_id) = path.into_inner();
    let group = group_service.remove_member(group_id, member_id, user_id).await?;

    Ok(success::Success::ok(Some(group)).message("Member removed successfully"))
}

#[patch("/{group_id}/members/{member_id}/role")]
pub async fn change_member_role(
    group_service: web::Data<GroupSvc>,
    path: web::Path<(Uuid, Uuid)>,
    body: ValidatedJson<ChangeRoleBody>,
    req: HttpRequest,
) -> Result<success::Success<GroupEntity>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    let (group_id, member_id) = path.into_inner();
    let group = group_service.change_role(group_id, member_id, body.0.role, user_id).await?;

    Ok(success::Success::ok(Some(group)).message("Member role updated successfully"))
}

#[get("/{group_id}/invite-link")]
pub async fn get_invite_link(
    group_service: web::Data<GroupSvc>,
    group_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<InviteLink>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    let link = group_service.get_invite_link(*group_id, user_id).await?;

    Ok(success::Success::ok(Some(link)).message("Invite link retrieved successfully"))
}

#[patch("/{group_id}/invite-link")]
pub async fn set_invite_link_status(
    group_service: web::Data<GroupSvc>,
    group_id: web::Path<Uuid>,
    body: ValidatedJson<InviteLinkStatusBody>,
    req: HttpRequest,
) -> Result<success::Success<InviteLink>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    let link = group_service.set_invite_active(*group_id, body.0.is_active, user_id).await?;

    Ok(success::Success::ok(Some(link)).message("Invite link updated successfully"))
}

#[post("/{group_id}/invite-link/regenerate")]
pub async fn regenerate_invite_link(
    group_service: web::Data<GroupSvc>,
    group_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<InviteLink>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    let link = group_service.regenerate_invite_code(*group_id, user_id).await?;

    Ok(success::Success::ok(Some(link)).message("Invite link regenerated successfully"))
}
