use std::time::Duration;

use log::debug;
use reqwest::{
    multipart::{Form, Part},
    Client, Method, RequestBuilder, Response, Url,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::{
    build::models::{BuildRequest, DockerFolder, DockerfileSave},
    containers::models::{ContainerRunRequest, DockerContainer},
    disk::models::{DiskFormat, DiskInfo, DiskSpec},
    hub::models::{HubImage, HubQuery},
    images::models::DockerImage,
    utils::error::{ConsoleError, ConsoleResult},
    vm::models::{IsoFile, VmRequest},
};

use super::models::{EngineDiskInfo, EngineError, EngineMessage, EngineSearch};

/// JSON-over-HTTP client for the engine's `/api` surface.
#[derive(Clone)]
pub struct Backend {
    client: Client,
    origin: Url,
}

impl Backend {
    pub fn new(origin: &str, timeout: Duration) -> ConsoleResult<Self> {
        let parsed = Url::parse(origin)
            .map_err(|e| ConsoleError::Config(format!("backend origin {}: {}", origin, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(ConsoleError::Config(format!(
                "backend origin {} cannot carry a path",
                origin
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ConsoleError::Transport)?;

        Ok(Self {
            client,
            origin: parsed,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.origin.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        debug!("{} {}", method, url);
        self.client.request(method, url)
    }

    async fn send(&self, request: RequestBuilder) -> ConsoleResult<Response> {
        let response = request.send().await.map_err(ConsoleError::Transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let mut engine = serde_json::from_str::<EngineError>(&body).unwrap_or_default();
        let logs = engine.logs.take();
        Err(ConsoleError::Api {
            status: status.as_u16(),
            message: engine.reason(),
            logs,
        })
    }

    async fn json<T: DeserializeOwned>(response: Response) -> ConsoleResult<T> {
        let body = response.bytes().await.map_err(ConsoleError::Transport)?;
        serde_json::from_slice(&body).map_err(|e| ConsoleError::Decode(e.to_string()))
    }

    pub async fn list_disks(&self) -> ConsoleResult<Vec<String>> {
        let response = self
            .send(self.request(Method::GET, &["virtual-disk"]))
            .await?;
        Self::json(response).await
    }

    pub async fn disk_info(&self, name: &str) -> ConsoleResult<DiskInfo> {
        let response = self
            .send(self.request(Method::GET, &["virtual-disk", "info", name]))
            .await?;
        Self::json::<EngineDiskInfo>(response).await.map(DiskInfo::from)
    }

    pub async fn create_disk(&self, spec: &DiskSpec) -> ConsoleResult<()> {
        self.send(self.request(Method::POST, &["virtual-disk"]).json(spec))
            .await?;
        Ok(())
    }

    pub async fn convert_disk(&self, name: &str, new_format: DiskFormat) -> ConsoleResult<()> {
        self.send(
            self.request(Method::POST, &["virtual-disk", "convert", name])
                .json(&json!({ "newFormat": new_format })),
        )
        .await?;
        Ok(())
    }

    pub async fn resize_disk(&self, name: &str, new_size: f64) -> ConsoleResult<()> {
        self.send(
            self.request(Method::POST, &["virtual-disk", "resize", name])
                .json(&json!({ "newSize": new_size })),
        )
        .await?;
        Ok(())
    }

    /// Multipart VM creation; returns the engine's VM descriptor as is.
    pub async fn create_vm(&self, vm: &VmRequest, iso: Option<IsoFile>) -> ConsoleResult<Value> {
        let mut form = Form::new()
            .text("name", vm.name.clone())
            .text("cpu", vm.cpu.to_string())
            .text("memory", vm.memory.to_string())
            .text("diskName", vm.disk_name.clone());
        if let Some(iso) = iso {
            form = form.part("isoFile", Part::bytes(iso.content).file_name(iso.file_name));
        }

        let response = self
            .send(self.request(Method::POST, &["vms"]).multipart(form))
            .await?;
        Self::json(response).await
    }

    pub async fn list_images(&self) -> ConsoleResult<Vec<DockerImage>> {
        let response = self
            .send(self.request(Method::GET, &["docker", "images"]))
            .await?;
        Self::json(response).await
    }

    pub async fn delete_image(&self, id: &str) -> ConsoleResult<()> {
        self.send(self.request(Method::DELETE, &["docker", "images", id]))
            .await?;
        Ok(())
    }

    pub async fn list_containers(&self) -> ConsoleResult<Vec<DockerContainer>> {
        let response = self
            .send(self.request(Method::GET, &["docker", "containers"]))
            .await?;
        Self::json(response).await
    }

    pub async fn run_container(&self, request: &ContainerRunRequest) -> ConsoleResult<()> {
        self.send(
            self.request(Method::POST, &["docker", "containers"])
                .json(request),
        )
        .await?;
        Ok(())
    }

    pub async fn start_container(&self, id: &str) -> ConsoleResult<()> {
        self.send(self.request(Method::POST, &["docker", "containers", id, "start"]))
            .await?;
        Ok(())
    }

    pub async fn stop_container(&self, id: &str) -> ConsoleResult<()> {
        self.send(self.request(Method::POST, &["docker", "containers", id, "stop"]))
            .await?;
        Ok(())
    }

    pub async fn delete_container(&self, id: &str) -> ConsoleResult<()> {
        self.send(self.request(Method::DELETE, &["docker", "containers", id]))
            .await?;
        Ok(())
    }

    pub async fn list_folders(&self) -> ConsoleResult<Vec<DockerFolder>> {
        let response = self
            .send(self.request(Method::GET, &["docker", "folders"]))
            .await?;
        Self::json(response).await
    }

    pub async fn save_dockerfile(&self, dockerfile: &DockerfileSave) -> ConsoleResult<()> {
        self.send(self.request(Method::POST, &["dockerfile"]).json(dockerfile))
            .await?;
        Ok(())
    }

    /// Returns the engine's success message, if it sent one.
    pub async fn build_image(&self, build: &BuildRequest) -> ConsoleResult<Option<String>> {
        let response = self
            .send(self.request(Method::POST, &["docker", "build"]).json(build))
            .await?;
        Ok(Self::json::<EngineMessage>(response)
            .await
            .ok()
            .and_then(|m| m.message)
            .filter(|m| !m.is_empty()))
    }

    pub async fn search_hub(&self, query: &HubQuery) -> ConsoleResult<Vec<HubImage>> {
        let limit = query.limit.to_string();
        let page = query.page.to_string();
        let response = self
            .send(
                self.request(Method::GET, &["docker", "search"]).query(&[
                    ("term", query.term.as_str()),
                    ("limit", limit.as_str()),
                    ("page", page.as_str()),
                ]),
            )
            .await?;
        let search: EngineSearch = Self::json(response).await?;
        Ok(search.results.into_iter().map(HubImage::from).collect())
    }

    pub async fn pull_image(&self, image_name: &str) -> ConsoleResult<()> {
        self.send(
            self.request(Method::POST, &["docker", "pull"])
                .json(&json!({ "imageName": image_name })),
        )
        .await?;
        Ok(())
    }
}
