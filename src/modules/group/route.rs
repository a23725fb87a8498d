use actix_web::web::{scope, ServiceConfig};

use crate::modules::group::handle::*;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/groups")
            .service(create_group)
            .service(list_groups)
            .service(join_group)
            .service(get_group)
            .service(update_group)
            .service(delete_group)
            .service(add_member)
            .service(remove_member)
            .service(change_member_role)
            .service(get_invite_link)
            .service(set_invite_link_status)
            .service(regenerate_invite_link),
    );
}
