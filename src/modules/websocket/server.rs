/// WebSocket Server Actor
///
/// Owns the presence registry and performs all fan-out. Every registry read and
/// write happens inside this actor, so connect, disconnect and delivery are
/// processed as one ordered stream.
use std::collections::HashSet;
use std::sync::Arc;

use actix::prelude::*;
use uuid::Uuid;

use super::events::*;
use super::message::{PresenceStatus, ServerMessage};
use super::presence::{ConnectionHandle, LastSeenStore, PresenceRegistry};

pub struct WebSocketServer {
    registry: Box<dyn PresenceRegistry>,
    last_seen: Arc<dyn LastSeenStore>,
}

impl WebSocketServer {
    pub fn new(registry: Box<dyn PresenceRegistry>, last_seen: Arc<dyn LastSeenStore>) -> Self {
        Self { registry, last_seen }
    }

    fn deliver(handle: &ConnectionHandle, message: ServerMessage) {
        if let Err(e) = handle.recipient.try_send(message) {
            tracing::warn!("Delivery to session {} failed: {}", handle.session_id, e);
        }
    }

    fn send_to_user(&self, user_id: &Uuid, message: &ServerMessage) -> usize {
        let handles = self.registry.resolve(user_id);
        for handle in &handles {
            Self::deliver(handle, message.clone());
        }
        handles.len()
    }

    /// Every live connection except those of `user_id`.
    fn broadcast_except(&self, user_id: &Uuid, message: &ServerMessage) {
        for other in self.registry.online_users() {
            if other != *user_id {
                self.send_to_user(&other, message);
            }
        }
    }
}

impl Actor for WebSocketServer {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("WebSocket server started");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("WebSocket server stopped");
    }
}

impl Handler<Register> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: Register, _: &mut Context<Self>) {
        let session_id = msg.handle.session_id;
        let first = self.registry.register(msg.user_id, msg.handle);

        tracing::info!("User {} registered session {}", msg.user_id, session_id);

        if first {
            self.broadcast_except(
                &msg.user_id,
                &ServerMessage::UserStatusChanged {
                    user_id: msg.user_id,
                    status: PresenceStatus::Online,
                    last_seen: None,
                },
            );
        }
    }
}

impl Handler<Disconnect> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, ctx: &mut Context<Self>) {
        let Some(departure) = self.registry.unregister(&msg.session_id) else {
            return;
        };

        tracing::debug!("Session {} of user {} closed", msg.session_id, departure.user_id);

        if !departure.went_offline {
            return;
        }

        let now = chrono::Utc::now();
        let user_id = departure.user_id;

        let store = self.last_seen.clone();
        ctx.spawn(
            async move {
                if let Err(e) = store.record(user_id, now).await {
                    tracing::warn!("Failed to record last seen for user {}: {}", user_id, e);
                }
            }
            .into_actor(self),
        );

        tracing::info!("User {} went offline", user_id);

        self.broadcast_except(
            &user_id,
            &ServerMessage::UserStatusChanged {
                user_id,
                status: PresenceStatus::Offline,
                last_seen: Some(now.to_rfc3339()),
            },
        );
    }
}

impl Handler<SendToUsers> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: SendToUsers, _: &mut Context<Self>) {
        let mut seen = HashSet::with_capacity(msg.user_ids.len());
        let mut sessions = 0;

        for user_id in &msg.user_ids {
            if seen.insert(*user_id) {
                sessions += self.send_to_user(user_id, &msg.message);
            }
        }

        tracing::debug!(
            "Sent {} to {} user(s) ({} session(s))",
            msg.message.event_name(),
            seen.len(),
            sessions
        );
    }
}

impl Handler<GetOnlineUsers> for WebSocketServer {
    type Result = Vec<Uuid>;

    fn handle(&mut self, _: GetOnlineUsers, _: &mut Context<Self>) -> Self::Result {
        self.registry.online_users()
    }
}

impl Message for ServerMessage {
    type Result = ();
}
