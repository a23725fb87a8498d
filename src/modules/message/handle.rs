use actix_multipart::Multipart;
use actix_web::{get, patch, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_extensions,
    modules::{
        conversation::repository_pg::ConversationPgRepository,
        file_upload::handle::{read_multipart, MultipartForm},
        group::repository_pg::GroupPgRepository,
        message::{
            model::SendMessageData, repository_pg::MessageRepositoryPg, schema::MessageEntity,
            service::MessageService,
        },
        user::repository_pg::UserRepositoryPg,
    },
    utils::Claims,
    ENV,
};

pub type MessageSvc =
    MessageService<MessageRepositoryPg, ConversationPgRepository, GroupPgRepository, UserRepositoryPg>;

fn required_uuid(form: &MultipartForm, field: &str) -> Result<Uuid, error::Error> {
    let raw = form
        .text(field)
        .ok_or_else(|| error::Error::bad_request(format!("{field} is required")))?;
    Uuid::parse_str(raw.trim()).map_err(|_| error::Error::bad_request(format!("{field} is invalid")))
}

fn message_data(form: &MultipartForm) -> SendMessageData {
    SendMessageData {
        content: form.text("content").map(str::to_string),
        message_type: form.text("messageType").map(str::to_string),
    }
}

#[post("/send")]
pub async fn send_direct_message(
    message_service: web::Data<MessageSvc>,
    payload: Multipart,
    req: HttpRequest,
) -> Result<success::Success<MessageEntity>, error::Error> {
    let sender_id = get_extensions::<Claims>(&req)?.sub;
    let mut form = read_multipart(payload, ENV.max_upload_size).await?;

    let receiver_id = required_uuid(&form, "receiverId")?;
    let data = message_data(&form);
    let message = message_service
        .send_direct_message(sender_id, receiver_id, data, form.file.take())
        .await?;

    Ok(success::Success::created(Some(message)).message("Message sent successfully"))
}

#[post("/group")]
pub async fn send_group_message(
    message_service: web::Data<MessageSvc>,
    payload: Multipart,
    req: HttpRequest,
) -> Result<success::Success<MessageEntity>, error::Error> {
    let sender_id = get_extensions::<Claims>(&req)?.sub;
    let mut form = read_multipart(payload, ENV.max_upload_size).await?;

    let conversation_id = required_uuid(&form, "conversationId")?;
    let data = message_data(&form);
    let message = message_service
        .send_group_message(sender_id, conversation_id, data, form.file.take())
        .await?;

    Ok(success::Success::created(Some(message)).message("Group message sent successfully"))
}

#[get("/conversation/{conversation_id}")]
pub async fn get_messages(
    message_service: web::Data<MessageSvc>,
    conversation_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<Vec<MessageEntity>>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    let messages = message_service.get_by_conversation(*conversation_id, user_id).await?;

    Ok(success::Success::ok(Some(messages)).message("Messages retrieved successfully"))
}

#[patch("/{message_id}/revoke")]
pub async fn revoke_message(
    message_service: web::Data<MessageSvc>,
    message_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<MessageEntity>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    let message = message_service.revoke(*message_id, user_id).await?;

    Ok(success::Success::ok(Some(message)).message("Message revoked successfully"))
}
