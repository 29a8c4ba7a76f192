//! Error types for chat-relay.
//!
//! Every variant renders as `{"error": "<message>"}` so that clients always
//! receive a JSON body, whatever went wrong.

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::config::API_KEY_ENV;
use crate::proxy::upstream::UpstreamError;

/// Result type alias for chat-relay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for chat-relay.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Missing 'message' in JSON")]
    MissingMessage,

    #[error("{} not configured on server", API_KEY_ENV)]
    NotConfigured,

    /// The request body could not be read.
    #[error("{}", .0.body_text())]
    Body(#[from] BytesRejection),

    #[error("no route for {0}")]
    NotFound(String),

    #[error("backend request failed: {0}")]
    Transport(String),

    #[error("invalid JSON from groq")]
    InvalidJson,

    /// Error reported by the upstream, relayed with its status code.
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    #[error("{0}")]
    Internal(String),
}

impl From<UpstreamError> for Error {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Transport(e) => Error::Transport(e.to_string()),
            UpstreamError::InvalidJson(_) => Error::InvalidJson,
        }
    }
}

impl Error {
    /// HTTP status code this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MissingMessage => StatusCode::BAD_REQUEST,
            Error::Upstream { status, .. } => *status,
            Error::Body(rejection) => rejection.status(),
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::NotConfigured
            | Error::Transport(_)
            | Error::InvalidJson
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON body for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(err: Error) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_message_is_bad_request() {
        let (status, body) = body_of(Error::MissingMessage).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"error": "Missing 'message' in JSON"}));
    }

    #[tokio::test]
    async fn not_configured_names_the_variable() {
        let (status, body) = body_of(Error::NotConfigured).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "GROK_API_KEY not configured on server");
    }

    #[tokio::test]
    async fn transport_error_is_prefixed() {
        let (status, body) = body_of(Error::Transport("connection refused".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "backend request failed: connection refused");
    }

    #[tokio::test]
    async fn upstream_error_keeps_its_status() {
        let (status, body) = body_of(Error::Upstream {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "rate limited".into(),
        })
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body, serde_json::json!({"error": "rate limited"}));
    }

    #[tokio::test]
    async fn not_found_names_the_path() {
        let (status, body) = body_of(Error::NotFound("/api/other".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({"error": "no route for /api/other"}));
    }
}
