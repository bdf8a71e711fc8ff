use std::{collections::HashMap, sync::Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    fields::models::{EnvVariable, FieldArray, PortMapping, Protocol, VolumeMapping},
    mutation::store::Store,
};

#[derive(Default)]
pub struct AppData {
    pub containers: Store<DockerContainer>,
    pub drafts: Mutex<HashMap<String, RunDraft>>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Running,
    Stopped,
    Exited,
    #[serde(other)]
    Unknown,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DockerContainer {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: ContainerStatus,
    pub created: String,
    #[serde(default)]
    pub ports: String,
}

impl DockerContainer {
    pub fn is_running(&self) -> bool {
        self.status == ContainerStatus::Running
    }

    /// Case-insensitive match of `term` against name or image.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.name.to_lowercase().contains(&term)
            || self.image.to_lowercase().contains(&term)
    }
}

#[derive(Serialize, Deserialize, Default)]
pub struct ContainerFilter {
    pub term: Option<String>,
    pub running: Option<bool>,
    pub since: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ContainerList {
    pub version: u64,
    pub containers: Vec<DockerContainer>,
}

/// Body of the engine's container run call. Empty groups are left out entirely.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRunRequest {
    pub image_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<PortMapping>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volumes: Option<Vec<VolumeMapping>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_vars: Option<Vec<EnvVariable>>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Ports,
    Volumes,
    Env,
}

/// Edit buffer of one run dialog.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunDraft {
    /// Distinguishes a reopened dialog from the one a run was submitted from.
    pub session: Uuid,
    pub image_id: String,
    pub container_name: String,
    pub ports: FieldArray<PortMapping>,
    pub volumes: FieldArray<VolumeMapping>,
    pub env_vars: FieldArray<EnvVariable>,
}

impl RunDraft {
    pub fn row_count(&self, group: Group) -> usize {
        match group {
            Group::Ports => self.ports.rows().len(),
            Group::Volumes => self.volumes.rows().len(),
            Group::Env => self.env_vars.rows().len(),
        }
    }

    pub fn new(image_id: impl Into<String>) -> Self {
        Self {
            session: Uuid::new_v4(),
            image_id: image_id.into(),
            container_name: String::new(),
            ports: FieldArray::new(vec![PortMapping {
                host_port: String::new(),
                container_port: "8000".to_string(),
                protocol: Protocol::Tcp,
            }]),
            volumes: FieldArray::new(vec![VolumeMapping::default()]),
            env_vars: FieldArray::new(vec![EnvVariable::default()]),
        }
    }

    /// Appends a blank row to `group` and returns its index.
    pub fn append(&mut self, group: Group) -> usize {
        match group {
            Group::Ports => self.ports.append(PortMapping::default()),
            Group::Volumes => self.volumes.append(VolumeMapping::default()),
            Group::Env => self.env_vars.append(EnvVariable::default()),
        }
    }

    /// Applies a `{field, value}` update to row `index` of `group`.
    ///
    /// `Ok(false)` when the row does not exist, `Err` when the update does not fit the group.
    pub fn update(
        &mut self,
        group: Group,
        index: usize,
        update: Value,
    ) -> Result<bool, serde_json::Error> {
        Ok(match group {
            Group::Ports => self.ports.update(index, serde_json::from_value(update)?),
            Group::Volumes => self.volumes.update(index, serde_json::from_value(update)?),
            Group::Env => self.env_vars.update(index, serde_json::from_value(update)?),
        })
    }

    pub fn to_request(&self) -> ContainerRunRequest {
        let name = self.container_name.trim();
        ContainerRunRequest {
            image_id: self.image_id.clone(),
            container_name: (!name.is_empty()).then(|| name.to_string()),
            ports: self.ports.to_submission(),
            volumes: self.volumes.to_submission(),
            env_vars: self.env_vars.to_submission(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenDraft {
    pub image_id: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameDraft {
    pub container_name: String,
}

#[derive(Serialize, Deserialize)]
pub struct AppendedRow {
    pub index: usize,
    pub draft: RunDraft,
}
