use actix_web::web;

use crate::handlers::health_handlers::health_check;
use crate::handlers::send_handlers::send_location;

/// Configure the routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/send", web::get().to(send_location));
    cfg.route("/health", web::get().to(health_check));
}
