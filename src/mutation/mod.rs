use actix_web::web::ServiceConfig;

pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod store;

pub fn scope() -> String {
    "/notifications".to_string()
}

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(handlers::peek_notifications);
    cfg.service(handlers::drain_notifications);
    cfg.service(handlers::busy_states);
}
