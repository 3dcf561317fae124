use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::relay::cors_headers;

/// Failures the relay reports back to its caller.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Server configuration error: API key not found")]
    MissingCredential,
    #[error("Invalid request: messages array is required")]
    InvalidPayload,
    #[error("Completion API error ({status})")]
    Upstream { status: StatusCode, details: Value },
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::MissingCredential | RelayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            RelayError::InvalidPayload => StatusCode::BAD_REQUEST,
            RelayError::Upstream { status, .. } => *status,
        }
    }

    fn body(&self) -> Value {
        match self {
            RelayError::Upstream { details, .. } => json!({
                "error": "Completion API error",
                "details": details,
            }),
            // The source chain stays in the logs, never in the response.
            other => json!({ "error": other.to_string() }),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        if let RelayError::Internal(source) = &self {
            tracing::error!("Relay request failed: {:?}", source);
        }
        let headers: HeaderMap = cors_headers();
        (self.status(), headers, Json(self.body())).into_response()
    }
}

/// Failures of a single chat or routine exchange on the client side.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("relay answered with status {status}")]
    Status { status: u16, body: String },
    #[error("could not reach the relay: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed stream frame: {0}")]
    MalformedFrame(String),
    #[error("reply did not contain any assistant content")]
    MissingContent,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to download catalog: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
