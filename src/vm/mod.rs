use actix_web::web::ServiceConfig;

pub mod handlers;
pub mod models;

pub fn scope() -> String {
    "/vm".to_string()
}

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(handlers::post_vm);
}
