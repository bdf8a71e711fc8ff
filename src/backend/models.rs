use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{disk::models::DiskInfo, hub::models::HubImage};

/// Optional fields the engine may put in a failure body.
#[derive(Serialize, Deserialize, Default)]
pub struct EngineError {
    pub message: Option<String>,
    pub error: Option<String>,
    pub logs: Option<String>,
}

impl EngineError {
    pub fn reason(self) -> Option<String> {
        self.message
            .filter(|m| !m.is_empty())
            .or(self.error.filter(|e| !e.is_empty()))
    }
}

#[derive(Serialize, Deserialize, Default)]
pub struct EngineDiskInfo {
    pub image: Option<Value>,
    pub file_format: Option<Value>,
    pub virtual_size: Option<Value>,
    pub disk_size: Option<Value>,
}

fn text(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

impl From<EngineDiskInfo> for DiskInfo {
    fn from(info: EngineDiskInfo) -> Self {
        DiskInfo {
            image: text(info.image),
            file_format: text(info.file_format),
            virtual_size: text(info.virtual_size),
            disk_size: text(info.disk_size),
        }
    }
}

#[derive(Serialize, Deserialize, Default)]
pub struct EngineMessage {
    pub message: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct EngineHubResult {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub star_count: u64,
    #[serde(default)]
    pub is_official: bool,
    #[serde(default)]
    pub pull_count: u64,
}

impl From<EngineHubResult> for HubImage {
    fn from(result: EngineHubResult) -> Self {
        HubImage {
            name: result.name,
            description: result.description.unwrap_or_default(),
            stars: result.star_count,
            official: result.is_official,
            pulls: result.pull_count,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct EngineSearch {
    #[serde(default)]
    pub results: Vec<EngineHubResult>,
}
