use actix_web::{get, post, web, HttpResponse, Responder};
use serde_json::Value;

use crate::{
    backend::client::Backend,
    images,
    mutation::{models::ResourceKey, pipeline::Pipeline},
    utils::error::ConsoleResult,
};

use super::models::{AppData, BuildOutcome, BuildRequest, DockerfileSave, FolderList};

const BUILD_FAILED: &str = "Failed to build Docker image";
const SAVE_FAILED: &str = "Failed to save Dockerfile";
const FOLDERS_FAILED: &str = "Failed to fetch Dockerfile folders";

fn folder_list(data: &AppData) -> FolderList {
    let snapshot = data.folders.snapshot();
    FolderList {
        version: snapshot.version,
        folders: snapshot.items.to_vec(),
    }
}

/// Replaces the Dockerfile folder list with the engine's. Only failures are announced.
pub async fn refresh_folder_list(
    backend: &Backend,
    pipeline: &Pipeline,
    data: &AppData,
) -> ConsoleResult<FolderList> {
    pipeline
        .submit_with(
            ResourceKey::new("refresh", "folders"),
            FOLDERS_FAILED,
            |_| None,
            async {
                data.folders.load(backend.list_folders()).await?;
                Ok(folder_list(data))
            },
        )
        .await
}

pub async fn save_dockerfile(
    backend: &Backend,
    pipeline: &Pipeline,
    candidate: &Value,
) -> ConsoleResult<()> {
    let dockerfile: DockerfileSave = DockerfileSave::schema()
        .parse(candidate)
        .map_err(|v| pipeline.report(v.into(), SAVE_FAILED))?;

    pipeline
        .submit(
            ResourceKey::new("dockerfile", &dockerfile.path),
            SAVE_FAILED,
            |_| "Dockerfile saved successfully".to_string(),
            backend.save_dockerfile(&dockerfile),
        )
        .await
}

/// Builds an image, then re-reads the image list. Failures carry the tail of the build log.
pub async fn build_image(
    backend: &Backend,
    pipeline: &Pipeline,
    images: &images::models::AppData,
    candidate: &Value,
) -> ConsoleResult<BuildOutcome> {
    let build: BuildRequest = BuildRequest::schema()
        .parse(candidate)
        .map_err(|v| pipeline.report(v.into(), BUILD_FAILED))?;

    pipeline
        .submit(
            ResourceKey::new("build", &build.image_name),
            BUILD_FAILED,
            |outcome: &BuildOutcome| outcome.message.clone(),
            async {
                let message = backend
                    .build_image(&build)
                    .await?
                    .unwrap_or_else(|| format!("Image {} built successfully", build.image_name));
                pipeline
                    .resync(
                        &images.images,
                        images::handlers::LIST_FAILED,
                        backend.list_images(),
                    )
                    .await;
                Ok(BuildOutcome { message })
            },
        )
        .await
}

#[get("/folders")]
async fn get_folders(data: web::Data<AppData>) -> impl Responder {
    HttpResponse::Ok().json(folder_list(&data))
}

#[post("/folders/refresh")]
async fn refresh_folders(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    data: web::Data<AppData>,
) -> impl Responder {
    match refresh_folder_list(&backend, &pipeline, &data).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => e.to_response(FOLDERS_FAILED),
    }
}

#[post("/dockerfile")]
async fn post_dockerfile(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    body: web::Json<Value>,
) -> impl Responder {
    match save_dockerfile(&backend, &pipeline, &body).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => e.to_response(SAVE_FAILED),
    }
}

#[post("/image")]
async fn post_build(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    images: web::Data<images::models::AppData>,
    body: web::Json<Value>,
) -> impl Responder {
    match build_image(&backend, &pipeline, &images, &body).await {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => e.to_response(BUILD_FAILED),
    }
}
