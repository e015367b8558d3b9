use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use thiserror::Error;

use crate::anthropic::messages::{ErrorDetails, ErrorResponse};

pub type Result<T> = std::result::Result<T, AdapterError>;

/// Adapter errors, each carrying enough information to rebuild an
/// Anthropic-shaped error envelope on the way out.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// No API key was supplied via `x-api-key` or the configured default.
    #[error("Missing API Key. Provide via x-api-key header or the adapter's configured default")]
    MissingApiKey,

    /// The inbound request body could not be parsed as JSON / the expected shape.
    #[error("{0}")]
    MalformedRequest(String),

    /// The upstream returned a non-2xx status; `error_type`/`message` are
    /// passed through from the upstream's own error payload where possible.
    #[error("Upstream API error ({status}): {message}")]
    UpstreamStatus { status: StatusCode, error_type: String, message: String },

    /// The upstream could not be reached, or the connection failed mid-flight.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Anything else unexpected (serialization, internal invariants).
    #[error("{0}")]
    Internal(String),
}

impl AdapterError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingApiKey => StatusCode::UNAUTHORIZED,
            Self::MalformedRequest(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamStatus { status, .. } => *status,
            Self::Connection(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::MissingApiKey => "authentication_error",
            Self::MalformedRequest(_) => "internal_server_error",
            Self::UpstreamStatus { error_type, .. } => error_type,
            Self::Connection(_) => "internal_server_error",
            Self::Internal(_) => "internal_server_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::UpstreamStatus { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AdapterError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error_type: "error".to_string(),
            error: ErrorDetails {
                error_type: self.error_type().to_string(),
                message: self.client_message(),
            },
        };
        (status, Json(body)).into_response()
    }
}

/// `/v1/messages/count_tokens` reports failures as a flat `{"error": "..."}`
/// body, always at 500 — a different shape from `AdapterError`'s nested
/// Anthropic envelope, matching the route's own exception handler.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CountTokensError(pub String);

impl IntoResponse for CountTokensError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({ "error": self.0 }))).into_response()
    }
}
