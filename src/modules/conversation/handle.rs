use actix_web::{get, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_extensions,
    modules::{
        conversation::{
            model::ConversationDetail, repository_pg::ConversationPgRepository,
            schema::ConversationEntity, service::ConversationService,
        },
        user::repository_pg::UserRepositoryPg,
    },
    utils::Claims,
};

pub type ConversationSvc = ConversationService<ConversationPgRepository, UserRepositoryPg>;

#[get("")]
pub async fn get_conversations(
    conversation_svc: web::Data<ConversationSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<ConversationEntity>>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;

    let conversations = conversation_svc.get_all_for_user(user_id).await?;

    Ok(success::Success::ok(Some(conversations)).message("Successfully retrieved conversations"))
}

#[get("/personal/{user_id}")]
pub async fn get_personal_conversation(
    conversation_svc: web::Data<ConversationSvc>,
    other_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<ConversationDetail>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;

    let conversation = conversation_svc.get_personal_between(user_id, *other_id).await?;

    Ok(success::Success::ok(Some(conversation)).message("Successfully retrieved conversation"))
}
