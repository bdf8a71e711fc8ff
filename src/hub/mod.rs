use actix_web::web::ServiceConfig;

pub mod handlers;
pub mod models;

pub fn scope() -> String {
    "/hub".to_string()
}

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(handlers::search_images);
    cfg.service(handlers::get_results);
    cfg.service(handlers::pull_selected);
    cfg.service(handlers::get_pulling);
}
