//! Upstream error classification and the model-not-found fallback.
//!
//! A request is sent with the primary model first. If the upstream rejects
//! it with `model_not_found` and a distinct fallback model is configured,
//! the request is sent once more with the fallback model. There is no
//! other retry and no backoff.

use serde_json::Value;

use super::types::reply_text_or_placeholder;
use super::upstream::{UpstreamError, UpstreamReply};
use crate::error::Error;

/// Upstream error code that triggers the fallback attempt.
pub const MODEL_NOT_FOUND: &str = "model_not_found";

/// Error details pulled out of an unsuccessful upstream reply.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamFailure {
    pub code: Option<String>,
    pub message: String,
}

impl UpstreamFailure {
    /// Classify an unsuccessful reply.
    ///
    /// The error value is the body's `error` field, else its `message`
    /// field, else the raw body text. Object values contribute their
    /// `code` and `message`; anything else is used as the message.
    pub fn from_reply(reply: &UpstreamReply) -> Self {
        let error = ["error", "message"]
            .iter()
            .find_map(|key| reply.body.get(*key).filter(|v| is_present(v)));

        match error {
            Some(Value::Object(fields)) => UpstreamFailure {
                code: fields.get("code").and_then(stringify_code),
                message: fields
                    .get("message")
                    .filter(|v| is_present(v))
                    .map(display_value)
                    .unwrap_or_else(|| Value::Object(fields.clone()).to_string()),
            },
            Some(other) => UpstreamFailure {
                code: None,
                message: display_value(other),
            },
            None => UpstreamFailure {
                code: None,
                message: reply.raw.clone(),
            },
        }
    }

    pub fn is_model_not_found(&self) -> bool {
        self.code.as_deref() == Some(MODEL_NOT_FOUND)
    }
}

/// Null, false, zero and empty strings/arrays/objects count as absent.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// Strings as-is, everything else as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn stringify_code(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(display_value(other)),
    }
}

/// Send with the primary model, falling back once on `model_not_found`.
///
/// `send` performs one upstream call for the given model. Calls are
/// strictly sequential. Returns the reply text or the error to report:
/// - primary transport/parse failure: that error, no fallback
/// - fallback transport/parse failure: the primary's error and status
/// - fallback rejected too: the primary's message with a note, and the
///   fallback's status
pub async fn relay_with_fallback<'a, F, Fut>(
    primary: &'a str,
    fallback: Option<&'a str>,
    send: F,
) -> Result<String, Error>
where
    F: Fn(&'a str) -> Fut,
    Fut: std::future::Future<Output = Result<UpstreamReply, UpstreamError>>,
{
    let reply = send(primary).await?;
    if reply.is_ok() {
        return Ok(reply_text_or_placeholder(&reply.body));
    }

    let failure = UpstreamFailure::from_reply(&reply);
    tracing::warn!(
        status = %reply.status,
        code = ?failure.code,
        model = %primary,
        message = %failure.message,
        "Upstream returned error"
    );

    let fallback = match fallback {
        Some(model) if failure.is_model_not_found() && model != primary => model,
        _ => {
            return Err(Error::Upstream {
                status: reply.status,
                message: failure.message,
            })
        }
    };

    tracing::info!(primary = %primary, fallback = %fallback, "Retrying with fallback model");

    match send(fallback).await {
        Err(e) => {
            tracing::warn!(error = %e, fallback = %fallback, "Fallback request failed");
            Err(Error::Upstream {
                status: reply.status,
                message: failure.message,
            })
        }
        Ok(second) if second.is_ok() => Ok(reply_text_or_placeholder(&second.body)),
        Ok(second) => {
            tracing::warn!(status = %second.status, fallback = %fallback, "Fallback model also failed");
            Err(Error::Upstream {
                status: second.status,
                message: format!(
                    "{} (fallback model {} also unavailable)",
                    failure.message, fallback
                ),
            })
        }
    }
}
