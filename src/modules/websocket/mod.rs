/// WebSocket Module
///
/// Realtime delivery for the chat backend:
///
/// - Message protocol (`ClientMessage` / `ServerMessage`)
/// - Presence registry and last-seen store
/// - WebSocket Server actor (owns connections and performs fan-out)
/// - WebSocket Session actor (one per socket)
/// - `Broadcaster`, the seam services use to emit events
pub mod broadcaster;
pub mod events;
pub mod handler;
pub mod message;
pub mod presence;
pub mod route;
pub mod server;
pub mod session;
