use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    utils::error::ConsoleResult,
    validation::models::{Rule, Schema, Violations},
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VmRequest {
    pub name: String,
    pub cpu: u32,
    /// Gigabytes.
    pub memory: f64,
    pub disk_name: String,
    pub iso_path: Option<String>,
}

impl VmRequest {
    pub fn schema() -> Schema {
        Schema::new()
            .field(
                "name",
                Rule::Required {
                    message: "Please enter a name for the virtual machine",
                },
            )
            .field(
                "diskName",
                Rule::Required {
                    message: "Please select a disk for the virtual machine",
                },
            )
            .field(
                "cpu",
                Rule::Number {
                    min: 1.0,
                    max: Some(4.0),
                    integer: true,
                    message: "CPU cores must be between 1 and 4",
                },
            )
            .field(
                "memory",
                Rule::Number {
                    min: 1.0,
                    max: Some(10.0),
                    integer: false,
                    message: "Memory must be between 1 and 10 GB",
                },
            )
            .field("isoPath", Rule::Optional)
            .default_value("cpu", 2)
            .default_value("memory", 4)
    }

    /// Validates `candidate`, including the ISO extension when a path is given.
    pub fn parse(candidate: &Value) -> Result<Self, Violations> {
        let request: VmRequest = Self::schema().parse(candidate)?;
        match &request.iso_path {
            Some(path) if !has_iso_extension(path) => Err(Violations::single(
                "isoPath",
                "Please select an .iso file",
            )),
            _ => Ok(request),
        }
    }
}

fn has_iso_extension(path: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("iso"))
}

/// Installation image uploaded with a VM.
pub struct IsoFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl IsoFile {
    pub async fn read(path: &str) -> ConsoleResult<Self> {
        let content = tokio::fs::read(path).await?;
        let file_name = Path::new(path)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string());
        Ok(Self { file_name, content })
    }
}
