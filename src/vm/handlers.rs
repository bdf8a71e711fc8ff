use actix_web::{post, web, HttpResponse, Responder};
use log::info;
use serde_json::Value;

use crate::{
    backend::client::Backend,
    mutation::{models::ResourceKey, pipeline::Pipeline},
    utils::error::ConsoleResult,
};

use super::models::{IsoFile, VmRequest};

const CREATE_FAILED: &str = "An error occurred while creating or registering the VM";

/// Validates and creates a VM, uploading the ISO when one is given. Returns the engine's
/// descriptor of the new VM.
pub async fn create_vm(
    backend: &Backend,
    pipeline: &Pipeline,
    candidate: &Value,
) -> ConsoleResult<Value> {
    let request = VmRequest::parse(candidate)
        .map_err(|v| pipeline.report(v.into(), CREATE_FAILED))?;

    pipeline
        .submit(
            ResourceKey::new("vm", &request.name),
            CREATE_FAILED,
            |_| "Virtual machine created successfully!".to_string(),
            async {
                let iso = match &request.iso_path {
                    Some(path) => Some(IsoFile::read(path).await?),
                    None => None,
                };
                let descriptor = backend.create_vm(&request, iso).await?;
                info!("Created VM {}: {}", request.name, descriptor);
                Ok(descriptor)
            },
        )
        .await
}

#[post("/create")]
async fn post_vm(
    backend: web::Data<Backend>,
    pipeline: web::Data<Pipeline>,
    body: web::Json<Value>,
) -> impl Responder {
    match create_vm(&backend, &pipeline, &body).await {
        Ok(descriptor) => HttpResponse::Created().json(descriptor),
        Err(e) => e.to_response(CREATE_FAILED),
    }
}

#[cfg(test)]
mod tests {
    use std::env::temp_dir;

    use serde_json::json;

    use super::*;
    use crate::{backend::mock::MockEngine, utils::error::ConsoleError};

    #[actix_web::test]
    async fn creates_vm_with_multipart_fields() {
        let engine = MockEngine::start().await;
        let pipeline = Pipeline::new(10, 1000);

        let descriptor = create_vm(
            &engine.backend(),
            &pipeline,
            &json!({"name": "vm1", "diskName": "disk1", "cpu": "1"}),
        )
        .await
        .unwrap();

        assert_eq!(descriptor["id"], json!("vm-1"));
        let body = engine.body("POST /api/vms").unwrap();
        assert!(body.contains("name=\"diskName\"\r\n\r\ndisk1"));
        assert!(body.contains("name=\"cpu\"\r\n\r\n1"));
        assert!(body.contains("name=\"memory\"\r\n\r\n4"));
        assert!(!body.contains("isoFile"));
        assert_eq!(
            pipeline.notifier().peek().pop().unwrap().message,
            "Virtual machine created successfully!"
        );
    }

    #[actix_web::test]
    async fn uploads_iso_file() {
        let path = temp_dir().join(format!("console-test-{}.iso", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"ISO9660").await.unwrap();
        let engine = MockEngine::start().await;

        create_vm(
            &engine.backend(),
            &Pipeline::new(10, 1000),
            &json!({"name": "vm2", "diskName": "disk1", "isoPath": path.to_string_lossy()}),
        )
        .await
        .unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        let body = engine.body("POST /api/vms").unwrap();
        assert!(body.contains("name=\"isoFile\"; filename=\"console-test-"));
        assert!(body.contains("ISO9660"));
    }

    #[actix_web::test]
    async fn unreadable_iso_is_reported_without_request() {
        let engine = MockEngine::start().await;
        let pipeline = Pipeline::new(10, 1000);

        let error = create_vm(
            &engine.backend(),
            &pipeline,
            &json!({"name": "vm3", "diskName": "disk1", "isoPath": "/nonexistent/a.iso"}),
        )
        .await
        .unwrap_err();

        assert!(matches!(error, ConsoleError::Io(_)));
        assert_eq!(engine.count("POST /api/vms"), 0);
    }

    #[actix_web::test]
    async fn engine_failure_uses_generic_message() {
        let engine = MockEngine::start().await;
        engine.fail("POST /api/vms", 500, json!({}));
        let pipeline = Pipeline::new(10, 1000);

        let error = create_vm(
            &engine.backend(),
            &pipeline,
            &json!({"name": "vm4", "diskName": "disk1"}),
        )
        .await
        .unwrap_err();

        assert_eq!(error.report(CREATE_FAILED), CREATE_FAILED);
    }
}
