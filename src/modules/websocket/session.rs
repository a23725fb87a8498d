/// WebSocket Session Actor
///
/// One actor per connection. It authenticates the socket, registers it with the
/// server actor and turns client actions into service calls. Service calls run
/// with `ctx.spawn()` + `into_actor()` so the session keeps processing frames,
/// and their events reach clients through the broadcaster, not through this
/// session. A failed action only produces an `error` event on this socket.
use std::future::Future;

use actix::prelude::*;
use actix_web::web;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::friend::{handle::FriendSvc, model::FriendRequestBody};
use crate::modules::group::handle::GroupSvc;
use crate::modules::message::{handle::MessageSvc, model::SendMessageData};
use crate::utils::{validate_fields, Claims};
use crate::ENV;

use super::events::*;
use super::message::{payload, ClientMessage, FriendRequestDecision, ServerMessage};
use super::presence::ConnectionHandle;
use super::server::WebSocketServer;

/// Services a socket can drive.
#[derive(Clone)]
pub struct SessionServices {
    pub messages: web::Data<MessageSvc>,
    pub groups: web::Data<GroupSvc>,
    pub friends: web::Data<FriendSvc>,
}

pub struct WebSocketSession {
    pub id: Uuid,
    /// Set once the `auth` message succeeds.
    pub user_id: Option<Uuid>,
    pub server: Addr<WebSocketServer>,
    /// Outbound JSON frames (bridged to the socket in handler.rs)
    pub tx: mpsc::UnboundedSender<String>,
    services: SessionServices,
}

fn send_json(tx: &mpsc::UnboundedSender<String>, session_id: Uuid, msg: &ServerMessage) {
    match serde_json::to_string(msg) {
        Ok(json) => {
            if let Err(e) = tx.send(json) {
                tracing::warn!("Outbound channel closed (session {}): {}", session_id, e);
            }
        }
        Err(e) => {
            tracing::error!("Failed to serialize ServerMessage (session {}): {}", session_id, e);
        }
    }
}

impl WebSocketSession {
    pub fn new(
        server: Addr<WebSocketServer>,
        tx: mpsc::UnboundedSender<String>,
        services: SessionServices,
    ) -> Self {
        Self { id: Uuid::now_v7(), user_id: None, server, tx, services }
    }

    fn send_to_client(&self, msg: &ServerMessage) {
        send_json(&self.tx, self.id, msg);
    }

    fn send_error(&self, message: &str) {
        self.send_to_client(&ServerMessage::Error { message: message.to_string() });
    }

    fn require_auth(&self) -> Option<Uuid> {
        if self.user_id.is_none() {
            self.send_error("Authentication required");
            tracing::warn!("Session {} sent an action before authenticating", self.id);
        }
        self.user_id
    }

    /// Runs a service call in the background and reports its failure, if any,
    /// to this socket only.
    fn run<F, T>(&self, ctx: &mut Context<Self>, action: &'static str, fut: F)
    where
        F: Future<Output = Result<T, error::SystemError>> + 'static,
    {
        self.run_and_reply(ctx, action, fut, |_| None);
    }

    /// Like `run`, but a successful result may also be answered on this socket.
    fn run_and_reply<F, T, R>(&self, ctx: &mut Context<Self>, action: &'static str, fut: F, reply: R)
    where
        F: Future<Output = Result<T, error::SystemError>> + 'static,
        R: FnOnce(T) -> Option<ServerMessage> + 'static,
    {
        let tx = self.tx.clone();
        let session_id = self.id;

        ctx.spawn(
            async move {
                match fut.await {
                    Ok(value) => {
                        if let Some(msg) = reply(value) {
                            send_json(&tx, session_id, &msg);
                        }
                    }
                    Err(e) => {
                        let err = error::Error::from(e);
                        tracing::debug!("{} failed (session {}): {}", action, session_id, err.message());
                        send_json(&tx, session_id, &ServerMessage::Error { message: err.message().into_owned() });
                    }
                }
            }
            .into_actor(self),
        );
    }

    fn handle_auth(&mut self, token: &str, ctx: &mut Context<Self>) {
        if self.user_id.is_some() {
            self.send_error("Session is already authenticated");
            return;
        }

        let claims = match Claims::decode(token, ENV.jwt_secret.as_ref()) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!("JWT verification failed (session {}): {}", self.id, e);
                self.send_to_client(&ServerMessage::AuthFailed {
                    reason: "Token invalid or expired".to_string(),
                });
                return;
            }
        };

        if !claims.is_access_token() {
            self.send_to_client(&ServerMessage::AuthFailed {
                reason: "Access token required".to_string(),
            });
            return;
        }

        let user_id = claims.sub;
        self.user_id = Some(user_id);

        self.server.do_send(Register {
            user_id,
            handle: ConnectionHandle { session_id: self.id, recipient: ctx.address().recipient() },
        });

        self.send_to_client(&ServerMessage::AuthSuccess { user_id });

        tracing::info!("User {} authenticated on session {}", user_id, self.id);
    }

    fn handle_client_message(&mut self, msg: ClientMessage, ctx: &mut Context<Self>) {
        let user_id = match &msg {
            ClientMessage::Auth { token } => {
                let token = token.clone();
                self.handle_auth(&token, ctx);
                return;
            }
            ClientMessage::Ping => {
                self.send_to_client(&ServerMessage::Pong);
                return;
            }
            _ => match self.require_auth() {
                Some(user_id) => user_id,
                None => return,
            },
        };

        let messages = self.services.messages.clone();
        let groups = self.services.groups.clone();
        let friends = self.services.friends.clone();

        match msg {
            ClientMessage::Auth { .. } | ClientMessage::Ping => {}

            ClientMessage::SendMessage { receiver_id, content, message_type } => {
                self.run(ctx, "sendMessage", async move {
                    messages
                        .send_direct_message(
                            user_id,
                            receiver_id,
                            SendMessageData::new(content, message_type),
                            None,
                        )
                        .await
                });
            }

            ClientMessage::SendGroupMessage { conversation_id, content, message_type } => {
                self.run(ctx, "sendGroupMessage", async move {
                    messages
                        .send_group_message(
                            user_id,
                            conversation_id,
                            SendMessageData::new(content, message_type),
                            None,
                        )
                        .await
                });
            }

            ClientMessage::RevokeMessage { message_id } => {
                self.run(ctx, "revokeMessage", async move { messages.revoke(message_id, user_id).await });
            }

            ClientMessage::CreateGroup { group_data } => {
                self.run(ctx, "createGroup", async move { groups.create(user_id, group_data).await });
            }

            ClientMessage::AddMember { group_id, member_id } => {
                self.run(ctx, "addMember", async move {
                    groups.add_member(group_id, member_id, user_id).await
                });
            }

            ClientMessage::RemoveMember { group_id, member_id } => {
                self.run(ctx, "removeMember", async move {
                    groups.remove_member(group_id, member_id, user_id).await
                });
            }

            ClientMessage::ChangeRole { group_id, member_id, role } => {
                self.run(ctx, "changeRole", async move {
                    groups.change_role(group_id, member_id, role, user_id).await
                });
            }

            ClientMessage::UpdateGroup { group_id, update } => {
                self.run(ctx, "updateGroup", async move {
                    groups.update_info(group_id, update, user_id).await
                });
            }

            ClientMessage::SetInviteActive { group_id, is_active } => {
                self.run(ctx, "setInviteActive", async move {
                    groups.set_invite_active(group_id, is_active, user_id).await
                });
            }

            ClientMessage::RegenerateInviteLink { group_id } => {
                self.run(ctx, "regenerateInviteLink", async move {
                    groups.regenerate_invite_code(group_id, user_id).await
                });
            }

            ClientMessage::JoinGroup { invite_code } => {
                self.run(ctx, "joinGroup", async move {
                    groups.join_by_invite_code(&invite_code, user_id).await
                });
            }

            ClientMessage::DeleteGroup { group_id } => {
                self.run(ctx, "deleteGroup", async move { groups.delete(group_id, user_id).await });
            }

            ClientMessage::SendFriendRequest { receiver_id, message } => {
                self.run(ctx, "sendFriendRequest", async move {
                    validate_fields(&FriendRequestBody { recipient_id: receiver_id, message: message.clone() })?;
                    friends.send_friend_request(user_id, receiver_id, message).await
                });
            }

            ClientMessage::RespondToFriendRequest { request_id, status } => {
                self.run(ctx, "respondToFriendRequest", async move {
                    match status {
                        FriendRequestDecision::Accepted => {
                            friends.accept_friend_request(user_id, request_id).await.map(|_| ())
                        }
                        FriendRequestDecision::Rejected => {
                            friends.decline_friend_request(user_id, request_id).await
                        }
                    }
                });
            }

            ClientMessage::CancelFriendRequest { request_id } => {
                self.run(ctx, "cancelFriendRequest", async move {
                    friends.cancel_friend_request(user_id, request_id).await
                });
            }

            ClientMessage::GetReceivedFriendRequests => {
                self.run_and_reply(
                    ctx,
                    "getReceivedFriendRequests",
                    async move { friends.get_received_requests(user_id).await },
                    |requests| Some(ServerMessage::ReceivedFriendRequests { requests: payload(&requests) }),
                );
            }

            ClientMessage::GetSentFriendRequests => {
                self.run_and_reply(
                    ctx,
                    "getSentFriendRequests",
                    async move { friends.get_sent_requests(user_id).await },
                    |requests| Some(ServerMessage::SentFriendRequests { requests: payload(&requests) }),
                );
            }
        }
    }
}

impl Actor for WebSocketSession {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::debug!("WebSocket session started: {}", self.id);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::debug!("WebSocket session stopped: {}", self.id);

        if self.user_id.is_some() {
            self.server.do_send(Disconnect { session_id: self.id });
        }
    }
}

impl Message for ClientMessage {
    type Result = ();
}

impl Handler<ClientMessage> for WebSocketSession {
    type Result = ();

    fn handle(&mut self, msg: ClientMessage, ctx: &mut Context<Self>) {
        self.handle_client_message(msg, ctx);
    }
}

/// Sent by the socket loop once the connection is gone.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Close;

impl Handler<Close> for WebSocketSession {
    type Result = ();

    fn handle(&mut self, _msg: Close, ctx: &mut Context<Self>) {
        ctx.stop();
    }
}

/// Events from the server actor are serialized straight onto the socket.
impl Handler<ServerMessage> for WebSocketSession {
    type Result = ();

    fn handle(&mut self, msg: ServerMessage, _ctx: &mut Context<Self>) {
        self.send_to_client(&msg);
    }
}
