//! In-process stand-in for the engine, used by tests.

use std::{collections::HashMap, sync::Mutex, time::Duration};

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::{json, Value};
use tokio::sync::watch;

use super::client::Backend;

#[derive(Default)]
pub struct MockState {
    pub disks: Mutex<Vec<String>>,
    pub images: Mutex<Vec<Value>>,
    pub containers: Mutex<Vec<Value>>,
    requests: Mutex<Vec<String>>,
    bodies: Mutex<Vec<(String, String)>>,
    failures: Mutex<HashMap<String, (u16, Value)>>,
    holds: Mutex<HashMap<String, watch::Sender<bool>>>,
}

pub struct MockEngine {
    pub origin: String,
    pub state: web::Data<MockState>,
}

impl MockEngine {
    pub async fn start() -> Self {
        let state = web::Data::new(MockState::default());
        let data = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .default_service(web::to(handle))
        })
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))
        .expect("mock engine could not bind");
        let origin = format!("http://{}", server.addrs()[0]);
        actix_web::rt::spawn(server.run());

        Self { origin, state }
    }

    pub fn backend(&self) -> Backend {
        Backend::new(&self.origin, Duration::from_secs(5)).expect("mock origin is valid")
    }

    pub fn with_disks(self, disks: &[&str]) -> Self {
        *self.state.disks.lock().unwrap() = disks.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_images(self, images: Vec<Value>) -> Self {
        *self.state.images.lock().unwrap() = images;
        self
    }

    pub fn with_containers(self, containers: Vec<Value>) -> Self {
        *self.state.containers.lock().unwrap() = containers;
        self
    }

    /// Makes `route` ("METHOD /path") answer `status` with `body`.
    pub fn fail(&self, route: &str, status: u16, body: Value) {
        self.state
            .failures
            .lock()
            .unwrap()
            .insert(route.to_string(), (status, body));
    }

    pub fn recover(&self, route: &str) {
        self.state.failures.lock().unwrap().remove(route);
    }

    /// Parks requests to `route` until [`MockEngine::release`] is called.
    pub fn hold(&self, route: &str) {
        self.state
            .holds
            .lock()
            .unwrap()
            .insert(route.to_string(), watch::channel(false).0);
    }

    pub fn release(&self, route: &str) {
        if let Some(gate) = self.state.holds.lock().unwrap().remove(route) {
            gate.send_replace(true);
        }
    }

    /// "METHOD /path?query" of every request received, in order.
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn count(&self, route: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.split('?').next() == Some(route))
            .count()
    }

    pub fn body(&self, route: &str) -> Option<String> {
        self.state
            .bodies
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(r, _)| r == route)
            .map(|(_, b)| b.clone())
    }
}

async fn handle(req: HttpRequest, body: web::Bytes, state: web::Data<MockState>) -> HttpResponse {
    let route = format!("{} {}", req.method(), req.path());
    state
        .requests
        .lock()
        .unwrap()
        .push(format!("{} {}", req.method(), req.uri()));
    let raw = String::from_utf8_lossy(&body).to_string();
    state
        .bodies
        .lock()
        .unwrap()
        .push((route.clone(), raw.clone()));

    let gate = state.holds.lock().unwrap().get(&route).map(|g| g.subscribe());
    if let Some(mut gate) = gate {
        let _ = gate.wait_for(|open| *open).await;
    }

    if let Some((status, body)) = state.failures.lock().unwrap().get(&route).cloned() {
        let status = actix_web::http::StatusCode::from_u16(status).unwrap();
        return HttpResponse::build(status).json(body);
    }

    let json_body: Value = serde_json::from_str(&raw).unwrap_or(Value::Null);
    let segments: Vec<&str> = req.path().trim_start_matches('/').split('/').collect();
    match (req.method().as_str(), segments.as_slice()) {
        ("GET", ["api", "virtual-disk"]) => HttpResponse::Ok().json(&*state.disks.lock().unwrap()),
        ("GET", ["api", "virtual-disk", "info", name]) => HttpResponse::Ok().json(json!({
            "image": format!("{}.qcow2", name),
            "file_format": "qcow2",
            "virtual_size": "20 GiB",
            "disk_size": "196 KiB",
        })),
        ("POST", ["api", "virtual-disk"]) => {
            let name = json_body["name"].as_str().unwrap_or_default().to_string();
            state.disks.lock().unwrap().push(name);
            HttpResponse::Created().json(json!({}))
        }
        ("POST", ["api", "virtual-disk", "convert" | "resize", _]) => {
            HttpResponse::Ok().json(json!({}))
        }
        ("POST", ["api", "vms"]) => {
            HttpResponse::Ok().json(json!({"id": "vm-1", "status": "created"}))
        }
        ("GET", ["api", "docker", "images"]) => {
            HttpResponse::Ok().json(&*state.images.lock().unwrap())
        }
        ("DELETE", ["api", "docker", "images", id]) => {
            state.images.lock().unwrap().retain(|i| i["id"] != *id);
            HttpResponse::Ok().json(json!({}))
        }
        ("GET", ["api", "docker", "containers"]) => {
            HttpResponse::Ok().json(&*state.containers.lock().unwrap())
        }
        ("POST", ["api", "docker", "containers"]) => {
            let mut containers = state.containers.lock().unwrap();
            let id = format!("c{}", containers.len() + 1);
            containers.push(json!({
                "id": id,
                "name": json_body["containerName"].as_str().unwrap_or("eager_einstein"),
                "image": json_body["imageId"],
                "status": "running",
                "created": "now",
                "ports": "",
            }));
            HttpResponse::Created().json(json!({"id": id}))
        }
        ("POST", ["api", "docker", "containers", id, action @ ("start" | "stop")]) => {
            let status = if *action == "start" { "running" } else { "stopped" };
            for container in state.containers.lock().unwrap().iter_mut() {
                if container["id"] == *id {
                    container["status"] = json!(status);
                }
            }
            HttpResponse::Ok().json(json!({}))
        }
        ("DELETE", ["api", "docker", "containers", id]) => {
            state.containers.lock().unwrap().retain(|c| c["id"] != *id);
            HttpResponse::Ok().json(json!({}))
        }
        ("GET", ["api", "docker", "folders"]) => HttpResponse::Ok().json(json!([
            {"name": "app", "path": "/srv/app/Dockerfile"},
            {"name": "worker", "path": "/srv/worker/Dockerfile"},
        ])),
        ("POST", ["api", "dockerfile"]) => HttpResponse::Ok().json(json!({})),
        ("POST", ["api", "docker", "build"]) => {
            let name = json_body["imageName"].as_str().unwrap_or_default().to_string();
            push_image(&state, &name);
            HttpResponse::Ok().json(json!({"message": format!("Successfully built {}", name)}))
        }
        ("GET", ["api", "docker", "search"]) => {
            let term = req
                .query_string()
                .split('&')
                .find_map(|pair| pair.strip_prefix("term="))
                .unwrap_or_default()
                .to_string();
            let results: Vec<Value> = [
                ("nginx", "Official build of Nginx", 15000, true, 1_000_000_000u64),
                ("node", "Node.js is a JavaScript runtime", 12000, true, 1_000_000_000),
                ("redis", "Redis is an open source key-value store", 9800, true, 1_000_000_000),
            ]
            .into_iter()
            .filter(|(name, ..)| name.contains(term.as_str()))
            .map(|(name, description, stars, official, pulls)| {
                json!({
                    "name": name,
                    "description": description,
                    "star_count": stars,
                    "is_official": official,
                    "pull_count": pulls,
                })
            })
            .collect();
            HttpResponse::Ok().json(json!({ "results": results }))
        }
        ("POST", ["api", "docker", "pull"]) => {
            let name = json_body["imageName"].as_str().unwrap_or_default().to_string();
            push_image(&state, &name);
            HttpResponse::Ok().json(json!({}))
        }
        _ => HttpResponse::NotFound().json(json!({"error": format!("no route for {}", route)})),
    }
}

fn push_image(state: &MockState, name: &str) {
    let (repository, tag) = name.split_once(':').unwrap_or((name, "latest"));
    let mut images = state.images.lock().unwrap();
    let id = format!("img{}", images.len() + 1);
    images.push(json!({
        "id": id,
        "repository": repository,
        "tag": tag,
        "created": "now",
        "size": "10MB",
    }));
}

pub fn image(id: &str, repository: &str, tag: &str) -> Value {
    json!({
        "id": id,
        "repository": repository,
        "tag": tag,
        "created": "2 days ago",
        "size": "135MB"
    })
}

pub fn container(id: &str, name: &str, image: &str, status: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "image": image,
        "status": status,
        "created": "3 hours ago",
        "ports": "80:80"
    })
}
