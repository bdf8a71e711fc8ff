use std::{
    collections::HashMap,
    sync::{MutexGuard, PoisonError},
};

use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use log::{debug, warn};
use serde_json::Value;

use crate::{
    backend::client::Backend,
    mutation::{
        models::{Notification, ResourceKey, Trigger},
        pipeline::Pipeline,
        store::LONG_POLL,
    },
    utils::error::{ConsoleResult, ResponseError},
};

use super::models::{
    AppData, AppendedRow, ContainerFilter, ContainerList, Group, OpenDraft, RenameDraft, RunDraft,
};

pub const LIST_FAILED: &str = "Failed to fetch Docker containers";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Start,
    Stop,
    Delete,
}

impl Lifecycle {
    fn success(self) -> &'static str {
        match self {
            Lifecycle::Start => "Container started",
            Lifecycle::Stop => "Container stopped",
            Lifecycle::Delete => "Container removed",
        }
    }

    fn failure(self) -> &'static str {
        match self {
            Lifecycle::Start => "Failed to start container",
            Lifecycle::Stop => "Failed to stop container",
            Lifecycle::Delete => "Failed to remove container",
        }
    }
}

fn lock_drafts(data: &AppData) -> Result<MutexGuard<'_, HashMap<String, RunDraft>>, HttpResponse> {
    data.drafts.lock().map_err(|e| {
        HttpResponse::InternalServerError().json(ResponseError::new(format!(
            "Error getting run drafts: {}",
            e
        )))
    })
}

fn no_draft(image_id: &str) -> HttpResponse {
    HttpResponse::NotFound().json(ResponseError::new(format!(
        "No run dialog open for image {}",
        image_id
    )))
}

fn container_list(data: &AppData, filter: &ContainerFilter) -> ContainerList {
    let term = filter.term.as_deref().unwrap_or_default();
    ContainerList {
        version: data.containers.snapshot().version,
        containers: data.containers.filter(|container| {
            container.matches(term)
                && filter
                    .running
                    .map_or(true, |running| container.is_running() == running)
        }),
    }
}

/// Replaces the container list with the engine's. Success is announced for operator refreshes
/// only.
pub async fn refresh_containers(
    backend: &Backend,
    pipeline: &Pipeline,
    data: &AppData,
    trigger: Trigger,
) -> ConsoleResult<ContainerList> {
    pipeline
        .submit_with(
            ResourceKey::new("refresh", "containers"),
            LIST_FAILED,
            |_| (trigger == Trigger::Operator).then(|| "Container list refreshed".to_string()),
            async {
                data.containers.load(backend.list_containers()).await?;
                Ok(container_list(data, &ContainerFilter::default()))
            },
        )
        .await
}

/// Starts, stops or removes container `id`, then re-reads the container list.
pub async fn change_container(
    backend: &Backend,
    pipeline: &Pipeline,
    data: &AppData,
    id: &str,
    lifecycle: Lifecycle,
) -> ConsoleResult<ContainerList> {
    pipeline
        .submit(
            ResourceKey::new("container", id),
            lifecycle.failure(),
            |_| lifecycle.success().to_string(),
            async {
                match lifecycle {
                    Lifecycle::Start => backend.start_container(id).await?,
                    Lifecycle::Stop => backend.stop_container(id).await?,
                    Lifecycle::Delete => backend.delete_container(id).await?,
                }
                pipeline
                    .resync(&data.containers, LIST_FAILED, backend.list_containers())
                    .await;
                Ok(container_list(data, &ContainerFilter::default()))
            },
        )
        .await
}

/// Runs the draft open for `image_id`.
///
/// The draft is closed on success unless it was closed or reopened meanwhile, and kept as is on
/// failure.
pub async fn run_container(
    backend: &Backend,
    pipeline: &Pipeline,
    data: &AppData,
    image_id: &str,
) -> ConsoleResult<Option<ContainerList>> {
    let draft = data
        .drafts
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(image_id)
        .cloned();
    let Some(draft) = draft else {
        return Ok(None);
    };
    let request = draft.to_request();

    let list = pipeline
        .submit(
            ResourceKey::new("run", image_id),
            "Failed to create container",
            |_| "Container created successfully".to_string(),
            async {
                backend.run_container(&request).await?;
                pipeline
                    .resync(&data.containers, LIST_FAILED, backend.list_containers())
                    .await;
                Ok(container_list(data, &ContainerFilter::default()))
            },
        )
        .await?;

    let mut drafts = data.drafts.lock().unwrap_or_else(PoisonError::into_inner);
    if drafts
        .get(image_id)
        .is_some_and(|current| current.session == draft.session)
    {
        drafts.remove(image_id);
    } else {
        debug!("Run dialog for {} changed while submitting", image_id);
        pipeline.notify(Notification::info(format!(
            "Run dialog for {} was changed while the container was created",
            image_id
        )));
    }
    Ok(Some(list))
}

#[get("/list")]
async fn get_containers(
    data: web::Data<AppData>,
    query: web::Query<ContainerFilter>,
) -> impl Responder {
    if let Some(since) = query.since {
        data.containers.newer_than(since, LONG_POLL).await;
    }
    HttpResponse::Ok().json(container_list(&data, &query))
}

#[post("/refresh")]
async fn reload_containers(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    data: web::Data<AppData>,
) -> impl Responder {
    match refresh_containers(&backend, &pipeline, &data, Trigger::Operator).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => e.to_response(LIST_FAILED),
    }
}

async fn lifecycle_response(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    data: web::Data<AppData>,
    id: String,
    lifecycle: Lifecycle,
) -> HttpResponse {
    match change_container(&backend, &pipeline, &data, &id, lifecycle).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => e.to_response(lifecycle.failure()),
    }
}

#[post("/{id}/start")]
async fn start_selected(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    data: web::Data<AppData>,
    path: web::Path<String>,
) -> impl Responder {
    lifecycle_response(backend, pipeline, data, path.into_inner(), Lifecycle::Start).await
}

#[post("/{id}/stop")]
async fn stop_selected(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    data: web::Data<AppData>,
    path: web::Path<String>,
) -> impl Responder {
    lifecycle_response(backend, pipeline, data, path.into_inner(), Lifecycle::Stop).await
}

#[delete("/{id}")]
async fn remove_container(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    data: web::Data<AppData>,
    path: web::Path<String>,
) -> impl Responder {
    lifecycle_response(backend, pipeline, data, path.into_inner(), Lifecycle::Delete).await
}

#[post("/draft")]
async fn open_draft(data: web::Data<AppData>, body: web::Json<OpenDraft>) -> impl Responder {
    let image_id = body.into_inner().image_id;
    if image_id.trim().is_empty() {
        return HttpResponse::BadRequest().json(ResponseError::new("Image id is required"));
    }

    match lock_drafts(&data) {
        Ok(mut drafts) => {
            let draft = RunDraft::new(image_id.clone());
            drafts.insert(image_id, draft.clone());
            HttpResponse::Created().json(draft)
        }
        Err(response) => response,
    }
}

#[get("/draft/{image_id}")]
async fn get_draft(data: web::Data<AppData>, path: web::Path<String>) -> impl Responder {
    let image_id = path.into_inner();
    match lock_drafts(&data) {
        Ok(drafts) => match drafts.get(&image_id) {
            Some(draft) => HttpResponse::Ok().json(draft),
            None => no_draft(&image_id),
        },
        Err(response) => response,
    }
}

#[delete("/draft/{image_id}")]
async fn close_draft(data: web::Data<AppData>, path: web::Path<String>) -> impl Responder {
    let image_id = path.into_inner();
    match lock_drafts(&data) {
        Ok(mut drafts) => match drafts.remove(&image_id) {
            Some(_) => HttpResponse::NoContent().finish(),
            None => no_draft(&image_id),
        },
        Err(response) => response,
    }
}

#[put("/draft/{image_id}/name")]
async fn rename_draft(
    data: web::Data<AppData>,
    path: web::Path<String>,
    body: web::Json<RenameDraft>,
) -> impl Responder {
    let image_id = path.into_inner();
    match lock_drafts(&data) {
        Ok(mut drafts) => match drafts.get_mut(&image_id) {
            Some(draft) => {
                draft.container_name = body.into_inner().container_name;
                HttpResponse::Ok().json(draft)
            }
            None => no_draft(&image_id),
        },
        Err(response) => response,
    }
}

#[post("/draft/{image_id}/run")]
async fn run_draft(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    data: web::Data<AppData>,
    path: web::Path<String>,
) -> impl Responder {
    let image_id = path.into_inner();
    match run_container(&backend, &pipeline, &data, &image_id).await {
        Ok(Some(list)) => HttpResponse::Created().json(list),
        Ok(None) => no_draft(&image_id),
        Err(e) => e.to_response("Failed to create container"),
    }
}

#[post("/draft/{image_id}/{group}")]
async fn append_row(
    data: web::Data<AppData>,
    path: web::Path<(String, Group)>,
) -> impl Responder {
    let (image_id, group) = path.into_inner();
    match lock_drafts(&data) {
        Ok(mut drafts) => match drafts.get_mut(&image_id) {
            Some(draft) => {
                let index = draft.append(group);
                HttpResponse::Created().json(AppendedRow {
                    index,
                    draft: draft.clone(),
                })
            }
            None => no_draft(&image_id),
        },
        Err(response) => response,
    }
}

#[put("/draft/{image_id}/{group}/{index}")]
async fn update_row(
    data: web::Data<AppData>,
    path: web::Path<(String, Group, usize)>,
    body: web::Json<Value>,
) -> impl Responder {
    let (image_id, group, index) = path.into_inner();
    match lock_drafts(&data) {
        Ok(mut drafts) => match drafts.get_mut(&image_id) {
            Some(draft) => match draft.update(group, index, body.into_inner()) {
                Ok(true) => HttpResponse::Ok().json(draft),
                Ok(false) => HttpResponse::NotFound().json(ResponseError::new(format!(
                    "Row {} out of range, {:?} has {} rows",
                    index,
                    group,
                    draft.row_count(group)
                ))),
                Err(e) => {
                    warn!("Rejected row update for {}: {}", image_id, e);
                    HttpResponse::BadRequest()
                        .json(ResponseError::new(format!("Invalid row update: {}", e)))
                }
            },
            None => no_draft(&image_id),
        },
        Err(response) => response,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use actix_web::{http::StatusCode, rt::time::timeout, test, App};
    use serde_json::json;
    use tokio::sync::oneshot;

    use super::*;
    use crate::{
        backend::mock::{container, MockEngine},
        containers::models::ContainerStatus,
    };

    async fn engine() -> MockEngine {
        MockEngine::start().await.with_containers(vec![
            container("c1", "web", "nginx:latest", "stopped"),
            container("c2", "cache", "redis:7", "running"),
        ])
    }

    #[actix_web::test]
    async fn start_reflects_authoritative_status() {
        let engine = engine().await;
        let backend = engine.backend();
        let pipeline = Pipeline::new(10, 1000);
        let data = AppData::default();
        refresh_containers(&backend, &pipeline, &data, Trigger::Startup)
            .await
            .unwrap();

        let list = change_container(&backend, &pipeline, &data, "c1", Lifecycle::Start)
            .await
            .unwrap();

        assert_eq!(list.containers[0].status, ContainerStatus::Running);
        assert_eq!(engine.count("POST /api/docker/containers/c1/start"), 1);
        assert_eq!(engine.count("GET /api/docker/containers"), 2);
    }

    #[actix_web::test]
    async fn stale_list_read_never_overwrites_later_start() {
        let engine = engine().await;
        let backend = engine.backend();
        let pipeline = Pipeline::new(10, 1000);
        let data = AppData::default();
        let stale = backend.list_containers().await.unwrap();

        let (release, released) = oneshot::channel::<()>();
        let mut old = Box::pin(pipeline.resync(&data.containers, LIST_FAILED, async move {
            let _ = released.await;
            Ok(stale)
        }));
        assert!(timeout(Duration::from_millis(10), &mut old).await.is_err());

        change_container(&backend, &pipeline, &data, "c1", Lifecycle::Start)
            .await
            .unwrap();
        release.send(()).unwrap();

        assert!(!old.await);
        let snapshot = data.containers.snapshot();
        assert_eq!(snapshot.items[0].status, ContainerStatus::Running);
    }

    #[actix_web::test]
    async fn only_operator_refresh_is_announced() {
        let engine = engine().await;
        let backend = engine.backend();
        let pipeline = Pipeline::new(10, 1000);
        let data = AppData::default();

        refresh_containers(&backend, &pipeline, &data, Trigger::Startup)
            .await
            .unwrap();
        assert!(pipeline.notifier().peek().is_empty());

        refresh_containers(&backend, &pipeline, &data, Trigger::Operator)
            .await
            .unwrap();
        let notices = pipeline.notifier().peek();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, "Container list refreshed");
    }

    #[actix_web::test]
    async fn failed_stop_leaves_status_unchanged() {
        let engine = engine().await;
        engine.fail("POST /api/docker/containers/c2/stop", 500, json!({}));
        let backend = engine.backend();
        let pipeline = Pipeline::new(10, 1000);
        let data = AppData::default();
        refresh_containers(&backend, &pipeline, &data, Trigger::Startup)
            .await
            .unwrap();

        let error = change_container(&backend, &pipeline, &data, "c2", Lifecycle::Stop)
            .await
            .unwrap_err();

        assert_eq!(error.report(Lifecycle::Stop.failure()), "Failed to stop container");
        assert!(data.containers.snapshot().items[1].is_running());
        let last = pipeline.notifier().peek().pop().unwrap();
        assert_eq!(last.message, "Failed to stop container");
    }

    #[actix_web::test]
    async fn run_closes_draft_on_success_only() {
        let engine = engine().await;
        let backend = engine.backend();
        let pipeline = Pipeline::new(10, 1000);
        let data = AppData::default();
        {
            let mut draft = RunDraft::new("img1");
            draft.container_name = "api".to_string();
            data.drafts.lock().unwrap().insert("img1".to_string(), draft);
        }

        engine.fail(
            "POST /api/docker/containers",
            409,
            json!({"message": "port is already allocated"}),
        );
        let error = run_container(&backend, &pipeline, &data, "img1")
            .await
            .unwrap_err();
        assert_eq!(error.report("Failed to create container"), "port is already allocated");
        assert!(data.drafts.lock().unwrap().contains_key("img1"));

        engine.recover("POST /api/docker/containers");
        let list = run_container(&backend, &pipeline, &data, "img1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(list.containers.len(), 3);
        assert!(!data.drafts.lock().unwrap().contains_key("img1"));

        let body: Value =
            serde_json::from_str(&engine.body("POST /api/docker/containers").unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "imageId": "img1",
                "containerName": "api",
                "ports": [{"hostPort": "", "containerPort": "8000", "protocol": "tcp"}],
            })
        );
    }

    #[actix_web::test]
    async fn reopened_draft_survives_earlier_run() {
        let engine = engine().await;
        engine.hold("POST /api/docker/containers");
        let backend = web::Data::new(engine.backend());
        let pipeline = web::Data::new(Pipeline::new(10, 1000));
        let data = web::Data::new(AppData::default());
        data.drafts
            .lock()
            .unwrap()
            .insert("img1".to_string(), RunDraft::new("img1"));

        let run = {
            let (backend, pipeline, data) = (backend.clone(), pipeline.clone(), data.clone());
            actix_web::rt::spawn(async move {
                run_container(&backend, &pipeline, &data, "img1").await
            })
        };
        let key = ResourceKey::new("run", "img1");
        while !pipeline.busy().is_busy(&key) {
            actix_web::rt::task::yield_now().await;
        }
        let reopened = RunDraft::new("img1");
        data.drafts
            .lock()
            .unwrap()
            .insert("img1".to_string(), reopened.clone());

        engine.release("POST /api/docker/containers");
        assert!(run.await.unwrap().unwrap().is_some());

        assert_eq!(data.drafts.lock().unwrap().get("img1"), Some(&reopened));
        let last = pipeline.notifier().peek().pop().unwrap();
        assert_eq!(last.level, crate::mutation::models::Level::Info);
    }

    #[actix_web::test]
    async fn run_without_draft_sends_nothing() {
        let engine = engine().await;
        let result = run_container(
            &engine.backend(),
            &Pipeline::new(10, 1000),
            &AppData::default(),
            "img9",
        )
        .await
        .unwrap();
        assert!(result.is_none());
        assert_eq!(engine.count("POST /api/docker/containers"), 0);
    }

    #[actix_web::test]
    async fn http_surface_edits_draft_rows() {
        let engine = engine().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(engine.backend()))
                .app_data(web::Data::new(Pipeline::new(10, 1000)))
                .app_data(web::Data::new(AppData::default()))
                .service(web::scope(&super::super::scope()).configure(super::super::configure)),
        )
        .await;

        let response = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/containers/draft")
                .set_json(json!({"imageId": "img1"}))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let appended: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/containers/draft/img1/ports")
                .to_request(),
        )
        .await;
        assert_eq!(appended["index"], json!(1));
        assert_eq!(
            appended["draft"]["ports"][1],
            json!({"hostPort": "", "containerPort": "", "protocol": "tcp"})
        );

        let updated: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::put()
                .uri("/containers/draft/img1/ports/1")
                .set_json(json!({"field": "hostPort", "value": "8080"}))
                .to_request(),
        )
        .await;
        assert_eq!(updated["ports"][1]["hostPort"], json!("8080"));
        assert_eq!(updated["ports"][0]["containerPort"], json!("8000"));

        let missing = test::call_service(
            &app,
            test::TestRequest::put()
                .uri("/containers/draft/img1/env/4")
                .set_json(json!({"field": "name", "value": "X"}))
                .to_request(),
        )
        .await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let mismatched = test::call_service(
            &app,
            test::TestRequest::put()
                .uri("/containers/draft/img1/volumes/0")
                .set_json(json!({"field": "name", "value": "X"}))
                .to_request(),
        )
        .await;
        assert_eq!(mismatched.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn http_surface_filters_running() {
        let engine = engine().await;
        let data = web::Data::new(AppData::default());
        let backend = engine.backend();
        let pipeline = Pipeline::new(10, 1000);
        refresh_containers(&backend, &pipeline, &data, Trigger::Startup)
            .await
            .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(data.clone())
                .service(web::scope(&super::super::scope()).configure(super::super::configure)),
        )
        .await;

        let running: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/containers/list?running=true")
                .to_request(),
        )
        .await;
        assert_eq!(running["containers"].as_array().unwrap().len(), 1);
        assert_eq!(running["containers"][0]["name"], json!("cache"));

        let by_image: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/containers/list?term=NGINX")
                .to_request(),
        )
        .await;
        assert_eq!(by_image["containers"][0]["id"], json!("c1"));
    }
}
