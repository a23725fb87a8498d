use actix_web::web::ServiceConfig;

use crate::modules::file_upload::handle::serve_upload;

/// Mounted outside the authenticated scope.
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(serve_upload);
}
