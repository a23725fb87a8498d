/// Messages exchanged between session actors, services and the server actor.
use actix::prelude::*;
use uuid::Uuid;

use super::message::ServerMessage;
use super::presence::ConnectionHandle;

/// An authenticated session joins the presence registry.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Register {
    pub user_id: Uuid,
    pub handle: ConnectionHandle,
}

/// A session closed. Unknown or unauthenticated sessions are ignored.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub session_id: Uuid,
}

/// Deliver `message` to every live session of each user.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct SendToUsers {
    pub user_ids: Vec<Uuid>,
    pub message: ServerMessage,
}

#[derive(Message)]
#[rtype(result = "Vec<Uuid>")]
pub struct GetOnlineUsers;
