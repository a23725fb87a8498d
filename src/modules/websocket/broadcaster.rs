use actix::Addr;
use uuid::Uuid;

use super::{events::SendToUsers, message::ServerMessage, server::WebSocketServer};

/// Best-effort fan-out of realtime events. Offline users are skipped silently and
/// a failed delivery never affects the caller.
pub trait Broadcaster: Send + Sync {
    fn notify(&self, user_ids: &[Uuid], event: ServerMessage);
}

impl Broadcaster for Addr<WebSocketServer> {
    fn notify(&self, user_ids: &[Uuid], event: ServerMessage) {
        if user_ids.is_empty() {
            return;
        }

        tracing::debug!("Fan-out {} to {} user(s)", event.event_name(), user_ids.len());

        self.do_send(SendToUsers { user_ids: user_ids.to_vec(), message: event });
    }
}
