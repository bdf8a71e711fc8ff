use actix_web::{delete, get, post, web, HttpResponse, Responder};

use crate::{
    backend::client::Backend,
    mutation::{
        models::{ResourceKey, Trigger},
        pipeline::Pipeline,
        store::LONG_POLL,
    },
    utils::error::ConsoleResult,
};

use super::models::{AppData, ImageFilter, ImageList};

pub const LIST_FAILED: &str = "Failed to fetch Docker images";

fn image_list(data: &AppData, term: &str) -> ImageList {
    ImageList {
        version: data.images.snapshot().version,
        images: data.images.filter(|image| image.matches(term)),
    }
}

/// Replaces the image list with the engine's. Success is announced for operator refreshes only.
pub async fn refresh_images(
    backend: &Backend,
    pipeline: &Pipeline,
    data: &AppData,
    trigger: Trigger,
) -> ConsoleResult<ImageList> {
    pipeline
        .submit_with(
            ResourceKey::new("refresh", "images"),
            LIST_FAILED,
            |list: &ImageList| {
                (trigger == Trigger::Operator)
                    .then(|| format!("Loaded {} images", list.images.len()))
            },
            async {
                data.images.load(backend.list_images()).await?;
                Ok(image_list(data, ""))
            },
        )
        .await
}

/// Deletes image `id`, then re-reads the image list.
pub async fn delete_image(
    backend: &Backend,
    pipeline: &Pipeline,
    data: &AppData,
    id: &str,
) -> ConsoleResult<ImageList> {
    pipeline
        .submit(
            ResourceKey::new("image", id),
            "Failed to delete image",
            |_| "Image deleted successfully".to_string(),
            async {
                backend.delete_image(id).await?;
                pipeline
                    .resync(&data.images, LIST_FAILED, backend.list_images())
                    .await;
                Ok(image_list(data, ""))
            },
        )
        .await
}

#[get("/list")]
async fn get_images(data: web::Data<AppData>, query: web::Query<ImageFilter>) -> impl Responder {
    if let Some(since) = query.since {
        data.images.newer_than(since, LONG_POLL).await;
    }
    let term = query.term.as_deref().unwrap_or_default();
    HttpResponse::Ok().json(image_list(&data, term))
}

#[post("/refresh")]
async fn reload_images(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    data: web::Data<AppData>,
) -> impl Responder {
    match refresh_images(&backend, &pipeline, &data, Trigger::Operator).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => e.to_response(LIST_FAILED),
    }
}

#[delete("/{id}")]
async fn remove_image(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    data: web::Data<AppData>,
    path: web::Path<String>,
) -> impl Responder {
    let id = path.into_inner();
    match delete_image(&backend, &pipeline, &data, &id).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => e.to_response("Failed to delete image"),
    }
}
