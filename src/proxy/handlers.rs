//! HTTP request handlers.

use std::any::Any;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use super::fallback::relay_with_fallback;
use super::server::AppState;
use super::types::{ChatReply, ChatRequest};
use crate::error::Error;

/// Handle POST /api/chat
///
/// The body is read as raw bytes so that malformed JSON and a missing
/// `message` key produce the same 400 reply.
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ChatReply>, Error> {
    let body = body?;
    let request = ChatRequest::from_body(&body).ok_or(Error::MissingMessage)?;

    let upstream = &state.config.upstream;
    let api_key = upstream.api_key.as_ref().ok_or(Error::NotConfigured)?;

    tracing::info!(
        model = %upstream.model,
        fallback = ?upstream.effective_fallback(),
        "Received chat request"
    );

    let response = relay_with_fallback(&upstream.model, upstream.effective_fallback(), |model| {
        state.upstream.complete(api_key, model, &request.message)
    })
    .await?;

    Ok(Json(ChatReply { response }))
}

/// Reject every /api request while no upstream API key is configured.
///
/// Runs on the whole router, so unknown /api paths are rejected too.
pub async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if is_api_path(request.uri().path()) && state.config.upstream.api_key.is_none() {
        tracing::error!(
            path = %request.uri().path(),
            "Rejecting request: upstream API key not configured"
        );
        return Error::NotConfigured.into_response();
    }
    next.run(request).await
}

fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

/// Fallback for unmatched routes.
pub async fn not_found(request: Request) -> Error {
    Error::NotFound(request.uri().path().to_string())
}

/// Handle GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "upstream_configured": state.config.upstream.api_key.is_some(),
    }))
}

/// Turn a handler panic into a JSON 500 reply carrying the panic message.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "internal server error".to_string()
    };

    tracing::error!(panic = %message, "Request handler panicked");
    Error::Internal(message).into_response()
}
