use std::io::{Error, ErrorKind};

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use backend::client::Backend;
use mutation::{models::Trigger, pipeline::Pipeline};
use utils::env::{buildlogtail, hostname, notificationlimit, port, requesttimeout};

mod backend;
mod build;
mod containers;
mod disk;
mod fields;
mod hub;
mod images;
mod mutation;
mod utils;
mod validation;
mod vm;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    // Log env for debugging
    log::info!("Using env:");
    log::info!("HOSTNAME {}", hostname());
    log::info!("PORT {}", port());
    log::info!("BACKEND {}", utils::env::backend());
    log::info!("REQUESTTIMEOUT {}s", requesttimeout().as_secs());
    log::info!("NOTIFICATIONLIMIT {}", notificationlimit());
    log::info!("BUILDLOGTAIL {}", buildlogtail());

    let engine = Backend::new(&utils::env::backend(), requesttimeout()).map_err(|e| {
        log::error!("Could not set up backend client: {}", e);
        Error::new(ErrorKind::InvalidInput, e.to_string())
    })?;

    let engine = web::Data::new(engine);
    let pipeline = web::Data::new(Pipeline::new(notificationlimit(), buildlogtail()));
    let disk_data = web::Data::new(disk::models::AppData::default());
    let image_data = web::Data::new(images::models::AppData::default());
    let container_data = web::Data::new(containers::models::AppData::default());
    let folder_data = web::Data::new(build::models::AppData::default());
    let hub_data = web::Data::new(hub::models::AppData::default());

    // Initial load, the console still starts if the engine is down
    if let Err(e) = disk::handlers::refresh_disks(&engine, &pipeline, &disk_data).await {
        log::warn!("Could not load disks: {}", e);
    }
    if let Err(e) =
        images::handlers::refresh_images(&engine, &pipeline, &image_data, Trigger::Startup).await
    {
        log::warn!("Could not load images: {}", e);
    }
    if let Err(e) = containers::handlers::refresh_containers(
        &engine,
        &pipeline,
        &container_data,
        Trigger::Startup,
    )
    .await
    {
        log::warn!("Could not load containers: {}", e);
    }
    if let Err(e) = build::handlers::refresh_folder_list(&engine, &pipeline, &folder_data).await {
        log::warn!("Could not load Dockerfile folders: {}", e);
    }

    // Start server
    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(engine.clone())
            .app_data(pipeline.clone())
            .app_data(disk_data.clone())
            .app_data(image_data.clone())
            .app_data(container_data.clone())
            .app_data(folder_data.clone())
            .app_data(hub_data.clone())
            .service(web::scope(&disk::scope()).configure(disk::configure))
            .service(web::scope(&vm::scope()).configure(vm::configure))
            .service(web::scope(&images::scope()).configure(images::configure))
            .service(web::scope(&containers::scope()).configure(containers::configure))
            .service(web::scope(&build::scope()).configure(build::configure))
            .service(web::scope(&hub::scope()).configure(hub::configure))
            .service(web::scope(&mutation::scope()).configure(mutation::configure))
    })
    .bind(format!("{}:{}", hostname(), port()))?
    .run()
    .await
}
