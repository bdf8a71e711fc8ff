use actix_web::{get, post, web, HttpResponse, Responder};
use serde_json::Value;

use crate::{
    backend::client::Backend,
    images,
    mutation::{models::ResourceKey, pipeline::Pipeline},
    utils::error::{ConsoleError, ConsoleResult},
    validation::models::Violations,
};

use super::models::{AppData, HubQuery, HubResult, HubResults, PullRequest};

const SEARCH_FAILED: &str = "Failed to search Docker Hub";

/// Names of images with a pull in flight.
pub fn pulling_names(pipeline: &Pipeline) -> Vec<String> {
    pipeline
        .busy()
        .busy_keys()
        .iter()
        .filter_map(|key| key.id_of("pull").map(str::to_string))
        .collect()
}

fn hub_results(data: &AppData, pipeline: &Pipeline) -> HubResults {
    let snapshot = data.results.snapshot();
    let pulling = pulling_names(pipeline);
    HubResults {
        version: snapshot.version,
        results: snapshot
            .items
            .iter()
            .map(|image| HubResult {
                pulling: pulling.contains(&image.name),
                image: image.clone(),
            })
            .collect(),
    }
}

/// Runs a hub search and replaces the results. Prior results stay on failure.
pub async fn search_hub(
    backend: &Backend,
    pipeline: &Pipeline,
    data: &AppData,
    candidate: &Value,
) -> ConsoleResult<HubResults> {
    let query: HubQuery = HubQuery::schema()
        .parse(candidate)
        .map_err(|v| pipeline.report(v.into(), SEARCH_FAILED))?;

    pipeline
        .submit(
            ResourceKey::new("search", "hub"),
            SEARCH_FAILED,
            |results: &HubResults| format!("Found {} images", results.results.len()),
            async {
                data.results.load(backend.search_hub(&query)).await?;
                Ok(hub_results(data, pipeline))
            },
        )
        .await
}

/// Pulls `image_name`, then re-reads the local image list.
pub async fn pull_image(
    backend: &Backend,
    pipeline: &Pipeline,
    images: &images::models::AppData,
    image_name: &str,
) -> ConsoleResult<()> {
    let name = image_name.trim();
    if name.is_empty() {
        return Err(pipeline.report(
            ConsoleError::Validation(Violations::single("imageName", "Please select an image")),
            "Failed to pull image",
        ));
    }

    pipeline
        .submit(
            ResourceKey::new("pull", name),
            &format!("Failed to pull {}", name),
            |_| format!("Successfully pulled {}", name),
            async {
                backend.pull_image(name).await?;
                pipeline
                    .resync(
                        &images.images,
                        images::handlers::LIST_FAILED,
                        backend.list_images(),
                    )
                    .await;
                Ok(())
            },
        )
        .await
}

#[post("/search")]
async fn search_images(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    data: web::Data<AppData>,
    body: web::Json<Value>,
) -> impl Responder {
    match search_hub(&backend, &pipeline, &data, &body).await {
        Ok(results) => HttpResponse::Ok().json(results),
        Err(e) => e.to_response(SEARCH_FAILED),
    }
}

#[get("/results")]
async fn get_results(pipeline: web::Data<Pipeline>, data: web::Data<AppData>) -> impl Responder {
    HttpResponse::Ok().json(hub_results(&data, &pipeline))
}

#[post("/pull")]
async fn pull_selected(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    images: web::Data<images::models::AppData>,
    body: web::Json<PullRequest>,
) -> impl Responder {
    let image_name = body.into_inner().image_name;
    match pull_image(&backend, &pipeline, &images, &image_name).await {
        Ok(()) => HttpResponse::Ok().json(pulling_names(&pipeline)),
        Err(e) => e.to_response(&format!("Failed to pull {}", image_name.trim())),
    }
}

#[get("/pulling")]
async fn get_pulling(pipeline: web::Data<Pipeline>) -> impl Responder {
    HttpResponse::Ok().json(pulling_names(&pipeline))
}
