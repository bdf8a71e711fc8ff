use serde::{Deserialize, Serialize};

use crate::{
    mutation::store::Store,
    validation::models::{Rule, Schema},
};

#[derive(Default)]
pub struct AppData {
    pub results: Store<HubImage>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HubImage {
    pub name: String,
    pub description: String,
    pub stars: u64,
    pub official: bool,
    pub pulls: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HubQuery {
    pub term: String,
    pub limit: u32,
    pub page: u32,
}

impl HubQuery {
    pub fn schema() -> Schema {
        Schema::new()
            .field(
                "term",
                Rule::Required {
                    message: "Please enter a search term",
                },
            )
            .field(
                "limit",
                Rule::Number {
                    min: 1.0,
                    max: Some(100.0),
                    integer: true,
                    message: "Limit must be between 1 and 100",
                },
            )
            .field(
                "page",
                Rule::Number {
                    min: 1.0,
                    max: Some(u32::MAX as f64),
                    integer: true,
                    message: "Page must be between 1 and 4294967295",
                },
            )
            .default_value("limit", 10)
            .default_value("page", 1)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub image_name: String,
}

/// A search result and whether a pull of it is in flight.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HubResult {
    #[serde(flatten)]
    pub image: HubImage,
    pub pulling: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HubResults {
    pub version: u64,
    pub results: Vec<HubResult>,
}
