use actix_web::web::ServiceConfig;

pub mod handlers;
pub mod models;

pub fn scope() -> String {
    "/images".to_string()
}

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(handlers::get_images);
    cfg.service(handlers::reload_images);
    cfg.service(handlers::remove_image);
}
