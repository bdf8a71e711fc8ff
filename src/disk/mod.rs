use actix_web::web::ServiceConfig;

pub mod actions;
pub mod handlers;
pub mod models;

pub fn scope() -> String {
    "/disk".to_string()
}

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(handlers::get_disks);
    cfg.service(handlers::reload_disks);
    cfg.service(handlers::post_disk);
    cfg.service(handlers::get_actions);
    cfg.service(handlers::select_disk);
    cfg.service(handlers::select_action);
    cfg.service(handlers::reload_info);
    cfg.service(handlers::set_convert);
    cfg.service(handlers::convert_selected);
    cfg.service(handlers::set_resize);
    cfg.service(handlers::resize_selected);
}
