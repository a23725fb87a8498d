use actix_web::web::{self, ServiceConfig};

use super::handler::{get_presence, websocket_handler};

/// The socket authenticates in-band, so it is mounted outside the `/api` guard.
pub fn configure_socket(cfg: &mut ServiceConfig) {
    cfg.route("/ws", web::get().to(websocket_handler));
}

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(get_presence);
}
