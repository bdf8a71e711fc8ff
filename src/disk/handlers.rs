use std::sync::MutexGuard;

use actix_web::{get, post, put, web, HttpResponse, Responder};
use log::debug;
use serde_json::Value;

use crate::{
    backend::client::Backend,
    mutation::{models::ResourceKey, pipeline::Pipeline, store::LONG_POLL},
    utils::error::{ConsoleError, ConsoleResult, ResponseError},
    validation::models::Violations,
};

use super::{
    actions::{DiskActions, InfoTicket},
    models::{
        resize_schema, AppData, ConvertInput, DiskAction, DiskList, DiskListQuery, DiskSpec,
        ResizeInput, SelectAction, SelectDisk,
    },
};

const LIST_FAILED: &str = "Failed to load available disks";

fn lock_actions(data: &AppData) -> Result<MutexGuard<'_, DiskActions>, HttpResponse> {
    data.actions.lock().map_err(|e| {
        HttpResponse::InternalServerError().json(ResponseError::new(format!(
            "Error getting disk actions: {}",
            e
        )))
    })
}

fn disk_list(data: &AppData) -> DiskList {
    let snapshot = data.disks.snapshot();
    DiskList {
        version: snapshot.version,
        disks: snapshot.items.to_vec(),
    }
}

fn view_response(data: &AppData) -> HttpResponse {
    match lock_actions(data) {
        Ok(actions) => HttpResponse::Ok().json(actions.view()),
        Err(response) => response,
    }
}

/// Replaces the disk list with the engine's. Only failures are announced.
pub async fn refresh_disks(
    backend: &Backend,
    pipeline: &Pipeline,
    data: &AppData,
) -> ConsoleResult<DiskList> {
    pipeline
        .submit_with(
            ResourceKey::new("refresh", "disks"),
            LIST_FAILED,
            |_| None,
            async {
                data.disks.load(backend.list_disks()).await?;
                Ok(disk_list(data))
            },
        )
        .await
}

/// Loads info for `ticket` and applies it unless the selection moved on meanwhile.
pub async fn load_info(
    backend: &Backend,
    pipeline: &Pipeline,
    data: &AppData,
    ticket: InfoTicket,
) {
    let info = match backend.disk_info(&ticket.disk).await {
        Ok(info) => Some(info),
        Err(e) => {
            pipeline.report(e, "Failed to fetch disk info");
            None
        }
    };

    let disk = ticket.disk.clone();
    if let Ok(mut actions) = data.actions.lock() {
        if !actions.apply_info(ticket, info) {
            debug!("Dropped stale info for disk {}", disk);
        }
    }
}

/// Validates and creates a disk, then re-reads the disk list.
pub async fn create_disk(
    backend: &Backend,
    pipeline: &Pipeline,
    data: &AppData,
    candidate: &Value,
) -> ConsoleResult<DiskList> {
    let spec: DiskSpec = DiskSpec::schema()
        .parse(candidate)
        .map_err(|v| pipeline.report(v.into(), "Invalid disk"))?;
    spec.check_unique(&data.disks.snapshot().items)
        .map_err(|v| pipeline.report(v.into(), "Invalid disk"))?;

    pipeline
        .submit(
            ResourceKey::new("disk", &spec.name),
            "Error creating virtual disk",
            |_| "Virtual disk created successfully!".to_string(),
            async {
                backend.create_disk(&spec).await?;
                pipeline
                    .resync(&data.disks, LIST_FAILED, backend.list_disks())
                    .await;
                Ok(disk_list(data))
            },
        )
        .await
}

/// Submits the selected disk's pending convert or resize input.
pub async fn submit_action(
    backend: &Backend,
    pipeline: &Pipeline,
    data: &AppData,
    action: DiskAction,
) -> ConsoleResult<()> {
    let target = data.actions.lock().ok().and_then(|actions| actions.target());
    let Some((disk, pending)) = target else {
        return Err(pipeline.report(
            ConsoleError::Validation(Violations::single("disk", "No disk selected")),
            "No disk selected",
        ));
    };

    let (failure, success) = match action {
        DiskAction::Convert => (
            "Error converting disk format",
            "Disk format converted successfully!",
        ),
        DiskAction::Resize => ("Error resizing disk", "Disk resized successfully!"),
        DiskAction::Info => return Ok(()),
    };

    pipeline
        .submit(
            ResourceKey::new("disk", &disk),
            failure,
            |_| success.to_string(),
            async {
                match action {
                    DiskAction::Convert => backend.convert_disk(&disk, pending.new_format).await?,
                    _ => backend.resize_disk(&disk, pending.new_size).await?,
                }
                pipeline
                    .resync(&data.disks, LIST_FAILED, backend.list_disks())
                    .await;
                Ok(())
            },
        )
        .await?;

    let ticket = data.actions.lock().ok().and_then(|actions| actions.info_ticket());
    if let Some(ticket) = ticket {
        load_info(backend, pipeline, data, ticket).await;
    }
    Ok(())
}

#[get("/list")]
async fn get_disks(data: web::Data<AppData>, query: web::Query<DiskListQuery>) -> impl Responder {
    if let Some(since) = query.since {
        data.disks.newer_than(since, LONG_POLL).await;
    }
    HttpResponse::Ok().json(disk_list(&data))
}

#[post("/refresh")]
async fn reload_disks(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    data: web::Data<AppData>,
) -> impl Responder {
    match refresh_disks(&backend, &pipeline, &data).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => e.to_response(LIST_FAILED),
    }
}

#[post("/create")]
async fn post_disk(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    data: web::Data<AppData>,
    body: web::Json<Value>,
) -> impl Responder {
    match create_disk(&backend, &pipeline, &data, &body).await {
        Ok(list) => HttpResponse::Created().json(list),
        Err(e) => e.to_response("Error creating virtual disk"),
    }
}

#[get("/view")]
async fn get_actions(data: web::Data<AppData>) -> impl Responder {
    view_response(&data)
}

#[post("/select")]
async fn select_disk(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    data: web::Data<AppData>,
    body: web::Json<SelectDisk>,
) -> impl Responder {
    let SelectDisk { disk } = body.into_inner();
    if let Some(name) = &disk {
        if !data.disks.snapshot().items.contains(name) {
            return HttpResponse::NotFound()
                .json(ResponseError::new(format!("Unknown disk {}", name)));
        }
    }

    let ticket = match lock_actions(&data) {
        Ok(mut actions) => actions.select(disk),
        Err(response) => return response,
    };
    if let Some(ticket) = ticket {
        load_info(&backend, &pipeline, &data, ticket).await;
    }
    view_response(&data)
}

#[post("/action")]
async fn select_action(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    data: web::Data<AppData>,
    body: web::Json<SelectAction>,
) -> impl Responder {
    let ticket = match lock_actions(&data) {
        Ok(mut actions) => actions.set_action(body.action),
        Err(response) => return response,
    };
    if let Some(ticket) = ticket {
        load_info(&backend, &pipeline, &data, ticket).await;
    }
    view_response(&data)
}

#[post("/info")]
async fn reload_info(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    data: web::Data<AppData>,
) -> impl Responder {
    let ticket = match lock_actions(&data) {
        Ok(actions) => actions.info_ticket(),
        Err(response) => return response,
    };
    if let Some(ticket) = ticket {
        load_info(&backend, &pipeline, &data, ticket).await;
    }
    view_response(&data)
}

#[put("/convert")]
async fn set_convert(data: web::Data<AppData>, body: web::Json<ConvertInput>) -> impl Responder {
    match lock_actions(&data) {
        Ok(mut actions) => {
            if !actions.set_new_format(body.new_format) {
                return HttpResponse::Conflict().json(ResponseError::new("No disk selected"));
            }
            HttpResponse::Ok().json(actions.view())
        }
        Err(response) => response,
    }
}

#[post("/convert")]
async fn convert_selected(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    data: web::Data<AppData>,
) -> impl Responder {
    match submit_action(&backend, &pipeline, &data, DiskAction::Convert).await {
        Ok(()) => view_response(&data),
        Err(e) => e.to_response("Error converting disk format"),
    }
}

#[put("/resize")]
async fn set_resize(
    pipeline: web::Data<Pipeline>,
    data: web::Data<AppData>,
    body: web::Json<Value>,
) -> impl Responder {
    let input: ResizeInput = match resize_schema().parse(&body) {
        Ok(input) => input,
        Err(violations) => {
            return pipeline
                .report(violations.into(), "Invalid size")
                .to_response("Invalid size")
        }
    };

    match lock_actions(&data) {
        Ok(mut actions) => {
            if !actions.set_new_size(input.new_size) {
                return HttpResponse::Conflict().json(ResponseError::new("No disk selected"));
            }
            HttpResponse::Ok().json(actions.view())
        }
        Err(response) => response,
    }
}

#[post("/resize")]
async fn resize_selected(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    data: web::Data<AppData>,
) -> impl Responder {
    match submit_action(&backend, &pipeline, &data, DiskAction::Resize).await {
        Ok(()) => view_response(&data),
        Err(e) => e.to_response("Error resizing disk"),
    }
}
