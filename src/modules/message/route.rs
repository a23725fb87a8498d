use actix_web::web::{scope, ServiceConfig};

use crate::modules::message::handle::*;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/messages")
            .service(send_direct_message)
            .service(send_group_message)
            .service(get_messages)
            .service(revoke_message),
    );
}
