//! Error types for an orchestration run.
//!
//! Any failure aborts the run. Client mistakes are detected before a
//! collaborator is contacted; everything else names the pipeline stage that
//! failed so the caller can tell which service misbehaved.

use std::fmt;
use std::time::Duration;

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::types::AppPackageId;

/// Pipeline stage, one per collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Dsl,
    Scheduling,
    Simulation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dsl => write!(f, "DSL service"),
            Self::Scheduling => write!(f, "scheduling service"),
            Self::Simulation => write!(f, "simulation service"),
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown application package: {0}")]
    UnknownPackage(AppPackageId),

    #[error("Request to {stage} failed: {message}")]
    Transport { stage: Stage, message: String },

    #[error("{stage} returned non-OK status: {status}")]
    Status { stage: Stage, status: StatusCode },

    #[error("Failed to decode {stage} response: {message}")]
    Decode { stage: Stage, message: String },

    #[error("{stage} rejected the call: {message}")]
    Rejected { stage: Stage, message: String },

    #[error("{stage} did not answer within {timeout:?}")]
    Timeout { stage: Stage, timeout: Duration },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, OrchestrationError>;

impl OrchestrationError {
    /// The stage this error belongs to, if it came from a collaborator.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Transport { stage, .. }
            | Self::Status { stage, .. }
            | Self::Decode { stage, .. }
            | Self::Rejected { stage, .. }
            | Self::Timeout { stage, .. } => Some(*stage),
            Self::InvalidRequest(_) | Self::UnknownPackage(_) | Self::Internal(_) => None,
        }
    }

    /// True for errors caused by the client's request rather than a service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_) | Self::UnknownPackage(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::UnknownPackage(_) => StatusCode::NOT_FOUND,
            Self::Transport { .. }
            | Self::Status { .. }
            | Self::Decode { .. }
            | Self::Rejected { .. } => StatusCode::BAD_GATEWAY,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Classify a reqwest failure that happened while talking to `stage`.
    pub(crate) fn from_reqwest(stage: Stage, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { stage, timeout }
        } else if err.is_decode() {
            Self::Decode {
                stage,
                message: err.to_string(),
            }
        } else {
            Self::Transport {
                stage,
                message: err.to_string(),
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<Stage>,
}

impl IntoResponse for OrchestrationError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
            stage: self.stage(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
