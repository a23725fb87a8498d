/// WebSocket HTTP Handler
///
/// Upgrades the HTTP request and bridges frames in both directions:
/// - Inbound:  Client → WebSocket → parse ClientMessage → Session Actor
/// - Outbound: Server Actor → Session Actor → mpsc channel → WebSocket → Client
use std::sync::Arc;

use actix::{Actor, Addr};
use actix_web::{post, web, Error, HttpRequest, HttpResponse};
use actix_ws::Message;
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;
use validator::Validate;

use super::events::GetOnlineUsers;
use super::message::{ClientMessage, ServerMessage};
use super::presence::{merge_presence, LastSeenStore, PresenceInfo};
use super::server::WebSocketServer;
use super::session::{Close, SessionServices, WebSocketSession};
use crate::api::{error, success};
use crate::modules::friend::handle::FriendSvc;
use crate::modules::group::handle::GroupSvc;
use crate::modules::message::handle::MessageSvc;
use crate::utils::ValidatedJson;

/// Endpoint: GET /ws
///
/// The socket is unauthenticated until the client sends an `auth` message.
pub async fn websocket_handler(
    req: HttpRequest,
    stream: web::Payload,
    server: web::Data<Addr<WebSocketServer>>,
    message_service: web::Data<MessageSvc>,
    group_service: web::Data<GroupSvc>,
    friend_service: web::Data<FriendSvc>,
) -> Result<HttpResponse, Error> {
    tracing::debug!("WebSocket upgrade request from {:?}", req.peer_addr());

    let (response, mut ws_session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let services = SessionServices {
        messages: message_service,
        groups: group_service,
        friends: friend_service,
    };
    let addr = WebSocketSession::new(server.get_ref().clone(), tx.clone(), services).start();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                msg = msg_stream.recv() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<ClientMessage>(&text) {
                                Ok(client_msg) => addr.do_send(client_msg),
                                Err(e) => {
                                    tracing::warn!(
                                        "Unparseable client message: {} - raw: {}",
                                        e,
                                        text.chars().take(100).collect::<String>()
                                    );
                                    let reply = ServerMessage::Error {
                                        message: format!("Invalid message: {e}"),
                                    };
                                    if let Ok(json) = serde_json::to_string(&reply) {
                                        let _ = tx.send(json);
                                    }
                                }
                            }
                        }

                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = ws_session.pong(&data).await {
                                tracing::error!("Failed to send pong: {}", e);
                                break;
                            }
                        }

                        Some(Ok(Message::Pong(_))) => {}

                        Some(Ok(Message::Close(reason))) => {
                            tracing::info!("WebSocket close frame: {:?}", reason);
                            break;
                        }

                        Some(Ok(Message::Binary(_))) => {
                            tracing::warn!("Binary frames are not supported");
                        }

                        Some(Ok(Message::Continuation(_) | Message::Nop)) => {}

                        Some(Err(e)) => {
                            tracing::error!("WebSocket protocol error: {}", e);
                            break;
                        }

                        None => break,
                    }
                }

                Some(json) = rx.recv() => {
                    if ws_session.text(json).await.is_err() {
                        tracing::error!("Failed to write to WebSocket client");
                        break;
                    }
                }
            }
        }

        // The server holds a recipient for this session, so stop it explicitly.
        addr.do_send(Close);
        let _ = ws_session.close(None).await;
        tracing::debug!("WebSocket message loop finished");
    });

    Ok(response)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PresenceQuery {
    #[validate(length(max = 500))]
    pub user_ids: Vec<Uuid>,
}

/// Online flag plus last-seen time for each requested user, in request order.
#[post("/presence")]
pub async fn get_presence(
    server: web::Data<Addr<WebSocketServer>>,
    last_seen: web::Data<Arc<dyn LastSeenStore>>,
    body: ValidatedJson<PresenceQuery>,
) -> Result<success::Success<Vec<PresenceInfo>>, error::Error> {
    let user_ids = body.0.user_ids;

    let online = server
        .send(GetOnlineUsers)
        .await
        .map_err(|e| {
            tracing::error!("WebSocket server unreachable: {}", e);
            error::Error::InternalServer
        })?;

    let seen = last_seen.get_many(&user_ids).await?;

    Ok(success::Success::ok(Some(merge_presence(&user_ids, &online, seen))))
}
