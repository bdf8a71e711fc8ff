use actix_web::web::ServiceConfig;

pub mod handlers;
pub mod models;

pub fn scope() -> String {
    "/build".to_string()
}

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(handlers::get_folders);
    cfg.service(handlers::refresh_folders);
    cfg.service(handlers::post_dockerfile);
    cfg.service(handlers::post_build);
}
