use serde::{Deserialize, Serialize};

use crate::mutation::store::Store;

#[derive(Default)]
pub struct AppData {
    pub images: Store<DockerImage>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DockerImage {
    pub id: String,
    pub repository: String,
    pub tag: String,
    pub created: String,
    pub size: String,
}

impl DockerImage {
    /// Case-insensitive match of `term` against the `repository:tag` reference.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty() || self.reference().to_lowercase().contains(&term)
    }

    pub fn reference(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }
}

#[derive(Serialize, Deserialize, Default)]
pub struct ImageFilter {
    pub term: Option<String>,
    /// Hold the request until the list is newer than this version.
    pub since: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ImageList {
    pub version: u64,
    pub images: Vec<DockerImage>,
}
