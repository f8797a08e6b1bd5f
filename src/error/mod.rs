use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Relay error types.
///
/// Upstream failures are tagged variants, not ad hoc strings: the retry layer
/// branches on `is_terminal()` and the fetch path on `BreakerOpen` without
/// inspecting messages. Cache unavailability never appears here at all; the
/// cache adapters swallow store errors and degrade to a miss.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upstream returned status {status}")]
    UpstreamStatus { status: u16 },

    #[error("Upstream request timed out: {0}")]
    Timeout(String),

    #[error("Failed to connect to upstream: {0}")]
    Connect(String),

    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("All {attempts} attempts failed: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<RelayError>,
    },

    #[error("Circuit breaker is open, retry in {retry_after_ms}ms")]
    BreakerOpen { retry_after_ms: u64 },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Whether retrying cannot help: a 4xx-class upstream reply.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RelayError::UpstreamStatus { status } if (400..500).contains(status))
    }

    /// Whether this is a breaker rejection rather than an upstream failure.
    pub fn is_breaker_open(&self) -> bool {
        matches!(self, RelayError::BreakerOpen { .. })
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::UpstreamStatus { status } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            RelayError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::Connect(_) => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            RelayError::RetriesExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::BreakerOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
