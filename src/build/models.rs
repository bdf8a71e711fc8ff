use serde::{Deserialize, Serialize};

use crate::{
    mutation::store::Store,
    validation::models::{Rule, Schema},
};

#[derive(Default)]
pub struct AppData {
    pub folders: Store<DockerFolder>,
}

/// A Dockerfile location offered for builds.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DockerFolder {
    pub name: String,
    pub path: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DockerfileSave {
    pub content: String,
    pub path: String,
}

impl DockerfileSave {
    pub fn schema() -> Schema {
        Schema::new()
            .field(
                "path",
                Rule::Required {
                    message: "Please select a Dockerfile",
                },
            )
            .field(
                "content",
                Rule::Required {
                    message: "Dockerfile content is required",
                },
            )
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest {
    pub dockerfile_path: String,
    pub image_name: String,
}

impl BuildRequest {
    pub fn schema() -> Schema {
        Schema::new()
            .field(
                "dockerfilePath",
                Rule::Required {
                    message: "Please select a Dockerfile",
                },
            )
            .field(
                "imageName",
                Rule::Required {
                    message: "Please enter an image name",
                },
            )
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct FolderList {
    pub version: u64,
    pub folders: Vec<DockerFolder>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct BuildOutcome {
    pub message: String,
}
