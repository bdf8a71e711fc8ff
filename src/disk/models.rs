use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::{
    mutation::store::Store,
    validation::models::{Rule, Schema, Violations},
};

use super::actions::DiskActions;

pub const DISK_FORMATS: &[&str] = &[
    "raw", "qcow2", "vmdk", "vdi", "qed", "qcow", "luks", "vpc", "VHDX",
];
pub const DISK_TYPES: &[&str] = &["fixed", "dynamic"];

#[derive(Default)]
pub struct AppData {
    pub disks: Store<String>,
    pub actions: Mutex<DiskActions>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DiskFormat {
    #[serde(rename = "raw")]
    Raw,
    #[default]
    #[serde(rename = "qcow2")]
    Qcow2,
    #[serde(rename = "vmdk")]
    Vmdk,
    #[serde(rename = "vdi")]
    Vdi,
    #[serde(rename = "qed")]
    Qed,
    #[serde(rename = "qcow")]
    Qcow,
    #[serde(rename = "luks")]
    Luks,
    #[serde(rename = "vpc")]
    Vpc,
    #[serde(rename = "VHDX")]
    Vhdx,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiskType {
    Fixed,
    #[default]
    Dynamic,
}

/// Validated disk creation parameters, also the engine request body.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DiskSpec {
    pub name: String,
    /// Gigabytes.
    pub size: f64,
    #[serde(rename = "type")]
    pub kind: DiskType,
    pub format: DiskFormat,
}

impl DiskSpec {
    pub fn schema() -> Schema {
        Schema::new()
            .field(
                "name",
                Rule::Required {
                    message: "Disk name is required",
                },
            )
            .field(
                "size",
                Rule::Number {
                    min: 1.0,
                    max: None,
                    integer: false,
                    message: "Size must be at least 1 GB",
                },
            )
            .field(
                "type",
                Rule::OneOf {
                    allowed: DISK_TYPES,
                    message: "Disk type must be fixed or dynamic",
                },
            )
            .field(
                "format",
                Rule::OneOf {
                    allowed: DISK_FORMATS,
                    message: "Unsupported disk format",
                },
            )
    }

    /// Rejects names already present among `known` disks.
    pub fn check_unique(&self, known: &[String]) -> Result<(), Violations> {
        if known.iter().any(|disk| disk == &self.name) {
            return Err(Violations::single(
                "name",
                "A disk with this name already exists.",
            ));
        }
        Ok(())
    }
}

pub fn resize_schema() -> Schema {
    Schema::new().field(
        "newSize",
        Rule::Number {
            min: 1.0,
            max: None,
            integer: false,
            message: "Size must be at least 1 GB",
        },
    )
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiskInfo {
    pub image: String,
    pub file_format: String,
    pub virtual_size: String,
    pub disk_size: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiskAction {
    #[default]
    Info,
    Convert,
    Resize,
}

/// Convert and resize inputs for one disk, kept across tab switches.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingEdits {
    pub new_format: DiskFormat,
    pub new_size: f64,
}

impl Default for PendingEdits {
    fn default() -> Self {
        Self {
            new_format: DiskFormat::Qcow2,
            new_size: 20.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiskActionsView {
    pub selected: Option<String>,
    /// `None` while no disk is selected.
    pub action: Option<DiskAction>,
    pub info: Option<DiskInfo>,
    pub loading: bool,
    pub pending: Option<PendingEdits>,
}

#[derive(Serialize, Deserialize, Default)]
pub struct DiskListQuery {
    pub since: Option<u64>,
}

#[derive(Serialize, Deserialize)]
pub struct SelectDisk {
    pub disk: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct SelectAction {
    pub action: DiskAction,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertInput {
    pub new_format: DiskFormat,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeInput {
    pub new_size: f64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DiskList {
    pub version: u64,
    pub disks: Vec<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_and_coerces_creation_form() {
        let spec: DiskSpec = DiskSpec::schema()
            .parse(&json!({"name": "disk2", "size": "20", "type": "dynamic", "format": "VHDX"}))
            .unwrap();
        assert_eq!(
            spec,
            DiskSpec {
                name: "disk2".to_string(),
                size: 20.0,
                kind: DiskType::Dynamic,
                format: DiskFormat::Vhdx,
            }
        );
    }

    #[test]
    fn non_numeric_size_is_field_scoped() {
        let violations = DiskSpec::schema()
            .parse::<DiskSpec>(
                &json!({"name": "disk2", "size": "twenty", "type": "fixed", "format": "raw"}),
            )
            .unwrap_err();
        assert_eq!(violations.for_field("size").count(), 1);
        assert_eq!(violations.for_field("name").count(), 0);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let spec = DiskSpec {
            name: "disk1".to_string(),
            size: 20.0,
            kind: DiskType::Dynamic,
            format: DiskFormat::Qcow2,
        };
        let violations = spec.check_unique(&["disk1".to_string()]).unwrap_err();
        assert_eq!(
            violations.for_field("name").collect::<Vec<_>>(),
            vec!["A disk with this name already exists."]
        );
        assert!(spec.check_unique(&["disk0".to_string()]).is_ok());
    }

    #[test]
    fn engine_body_uses_type_key() {
        let spec = DiskSpec {
            name: "disk2".to_string(),
            size: 20.0,
            kind: DiskType::Fixed,
            format: DiskFormat::Qcow2,
        };
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({"name": "disk2", "size": 20.0, "type": "fixed", "format": "qcow2"})
        );
    }
}
