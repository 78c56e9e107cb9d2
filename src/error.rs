use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure of a single upstream fetch. Never fatal to a sensor.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("upstream returned HTTP {status}")]
    Status { status: u16 },

    #[error("failed to decode response body: {0}")]
    Decode(String),

    #[error("unexpected response shape: {0}")]
    Shape(String),
}

impl FetchError {
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(timeout_secs)
        } else if let Some(status) = err.status() {
            FetchError::Status { status: status.as_u16() }
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Rejected configuration. Surfaces at load time, before any sensor runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid value for `{field}` in sensor `{sensor}`: {message}")]
    Invalid {
        sensor: String,
        field: String,
        message: String,
    },

    #[error("invalid value for `upstream.{field}`: {message}")]
    InvalidUpstream { field: String, message: String },

    #[error("duplicate sensor name `{0}`")]
    DuplicateSensor(String),
}

/// Errors returned by the HTTP surface.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("sensor `{0}` not found")]
    SensorNotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::SensorNotFound(_) => StatusCode::NOT_FOUND,
        };

        (
            status,
            Json(json!({
                "success": false,
                "error": self.to_string(),
            })),
        )
            .into_response()
    }
}
