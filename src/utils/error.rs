use std::fmt::Display;

use actix_web::{http::StatusCode, HttpResponse};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    mutation::models::ResourceKey,
    utils::{env::buildlogtail, string::tail},
    validation::models::Violations,
};

#[derive(Serialize, Deserialize, Clone)]
pub struct ResponseError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Violations>,
    /// Tail of the engine's logs, when it sent any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ResponseError {
    pub fn new(error: impl Display) -> Self {
        Self {
            error: error.to_string(),
            violations: None,
            detail: None,
        }
    }
}

pub type ConsoleResult<T> = Result<T, ConsoleError>;

/// Everything that can go wrong between an operator edit and the engine's answer.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// The request never produced a response.
    #[error("Failed to contact backend: {0}")]
    Transport(reqwest::Error),

    /// The engine answered with a non-2xx status.
    #[error("Backend responded with {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Api {
        status: u16,
        message: Option<String>,
        logs: Option<String>,
    },

    /// The engine answered 2xx but the body was not what was expected.
    #[error("Unexpected response from backend: {0}")]
    Decode(String),

    /// Rejected locally, nothing was sent.
    #[error("{0}")]
    Validation(Violations),

    /// Another mutation for the same resource is still in flight.
    #[error("{0} is already in progress")]
    Busy(ResourceKey),

    #[error("Could not read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ConsoleError {
    /// Human readable failure text, falling back to `generic` when the engine gave no reason.
    pub fn report(&self, generic: &str) -> String {
        match self {
            ConsoleError::Transport(_) => "Failed to contact backend".to_string(),
            ConsoleError::Api {
                message: Some(message),
                ..
            } if !message.is_empty() => message.clone(),
            ConsoleError::Api { .. } | ConsoleError::Decode(_) => generic.to_string(),
            ConsoleError::Validation(violations) => violations.to_string(),
            ConsoleError::Busy(_) | ConsoleError::Io(_) | ConsoleError::Config(_) => {
                self.to_string()
            }
        }
    }

    pub fn logs(&self) -> Option<&str> {
        match self {
            ConsoleError::Api {
                logs: Some(logs), ..
            } => Some(logs),
            _ => None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ConsoleError::Validation(_) | ConsoleError::Io(_) => StatusCode::BAD_REQUEST,
            ConsoleError::Busy(_) => StatusCode::CONFLICT,
            ConsoleError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ConsoleError::Transport(_) | ConsoleError::Api { .. } | ConsoleError::Decode(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    pub fn to_response(&self, generic: &str) -> HttpResponse {
        let mut body = ResponseError::new(self.report(generic));
        if let ConsoleError::Validation(violations) = self {
            body.violations = Some(violations.clone());
        }
        body.detail = self
            .logs()
            .filter(|logs| !logs.is_empty())
            .map(|logs| tail(logs, buildlogtail()).to_string());
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<Violations> for ConsoleError {
    fn from(violations: Violations) -> Self {
        ConsoleError::Validation(violations)
    }
}
