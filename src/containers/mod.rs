use actix_web::web::ServiceConfig;

pub mod handlers;
pub mod models;

pub fn scope() -> String {
    "/containers".to_string()
}

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(handlers::get_containers);
    cfg.service(handlers::reload_containers);
    cfg.service(handlers::start_selected);
    cfg.service(handlers::stop_selected);
    cfg.service(handlers::remove_container);
    cfg.service(handlers::open_draft);
    cfg.service(handlers::get_draft);
    cfg.service(handlers::close_draft);
    cfg.service(handlers::rename_draft);
    cfg.service(handlers::run_draft);
    cfg.service(handlers::append_row);
    cfg.service(handlers::update_row);
}
