//! Client-facing and upstream request/response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reply text used when the upstream answered but produced no text.
pub const EMPTY_REPLY_PLACEHOLDER: &str = "Sorry, I didn't get a response from the AI.";

/// Chat request accepted from clients.
///
/// `message` is forwarded to the upstream untouched, whatever its JSON type.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: Value,
}

impl ChatRequest {
    /// Parse a raw request body.
    ///
    /// Returns `None` unless the body is a JSON object with a `message` key.
    pub fn from_body(body: &[u8]) -> Option<Self> {
        match serde_json::from_slice::<Value>(body).ok()? {
            Value::Object(mut fields) => fields
                .remove("message")
                .map(|message| ChatRequest { message }),
            _ => None,
        }
    }
}

/// Successful reply returned to clients.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChatReply {
    pub response: String,
}

/// Chat completion request sent upstream (OpenAI-compatible).
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<UpstreamMessage<'a>>,
}

/// A single chat message in an upstream request.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamMessage<'a> {
    pub role: &'static str,
    pub content: &'a Value,
}

impl<'a> UpstreamRequest<'a> {
    /// Build a single-turn user request for `model`.
    pub fn user(model: &'a str, content: &'a Value) -> Self {
        Self {
            model,
            messages: vec![UpstreamMessage {
                role: "user",
                content,
            }],
        }
    }
}

/// One element of a list-shaped message content.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentPart {
    pub text: Option<String>,
}

/// Assistant message content as returned by the upstream.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    PlainText(String),
    PartList(Vec<ContentPart>),
}

impl MessageContent {
    /// Interpret a `content` value. Returns `None` for unsupported shapes.
    ///
    /// List elements that are not objects are dropped; a `text` field that
    /// is missing or not a string becomes `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(MessageContent::PlainText(text.clone())),
            Value::Array(items) => Some(MessageContent::PartList(
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|part| ContentPart {
                        text: part.get("text").and_then(Value::as_str).map(str::to_owned),
                    })
                    .collect(),
            )),
            _ => None,
        }
    }

    /// Flatten the content into a single string, preserving part order.
    pub fn into_text(self) -> String {
        match self {
            MessageContent::PlainText(text) => text,
            MessageContent::PartList(parts) => {
                parts.into_iter().filter_map(|part| part.text).collect()
            }
        }
    }
}

/// Extract `choices[0].message.content` from an upstream response body as text.
///
/// Any missing or unexpected shape yields an empty string.
pub fn extract_reply_text(body: &Value) -> String {
    body.get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .filter(|message| message.is_object())
        .and_then(|message| message.get("content"))
        .and_then(MessageContent::from_value)
        .map(MessageContent::into_text)
        .unwrap_or_default()
}

/// Reply text for a successful upstream body, substituting the placeholder
/// when nothing could be extracted.
pub fn reply_text_or_placeholder(body: &Value) -> String {
    let text = extract_reply_text(body);
    if text.is_empty() {
        EMPTY_REPLY_PLACEHOLDER.to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_request_requires_message_key() {
        assert!(ChatRequest::from_body(br#"{"message": "hi"}"#).is_some());
        assert!(ChatRequest::from_body(br#"{"msg": "hi"}"#).is_none());
        assert!(ChatRequest::from_body(br#"["message"]"#).is_none());
        assert!(ChatRequest::from_body(b"not json").is_none());
        assert!(ChatRequest::from_body(b"").is_none());
    }

    #[test]
    fn chat_request_forwards_any_message_type() {
        let request = ChatRequest::from_body(br#"{"message": {"nested": [1, 2]}}"#).unwrap();
        assert_eq!(request.message, json!({"nested": [1, 2]}));

        let request = ChatRequest::from_body(br#"{"message": null}"#).unwrap();
        assert_eq!(request.message, Value::Null);
    }

    #[test]
    fn upstream_request_shape() {
        let content = json!("hello");
        let request = UpstreamRequest::user("some-model", &content);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "some-model",
                "messages": [{"role": "user", "content": "hello"}]
            })
        );
    }

    #[test]
    fn extracts_plain_string_content() {
        let body = json!({"choices": [{"message": {"content": "hello"}}]});
        assert_eq!(extract_reply_text(&body), "hello");
    }

    #[test]
    fn concatenates_content_parts_in_order() {
        let body = json!({"choices": [{"message": {"content": [
            {"text": "a"},
            {"type": "image"},
            "stray string",
            {"text": "b"},
            {"text": 7}
        ]}}]});
        assert_eq!(extract_reply_text(&body), "ab");
    }

    #[test]
    fn content_parts_parse_into_variants() {
        let parts = MessageContent::from_value(&json!([{"text": "x"}, {}, 3])).unwrap();
        assert_eq!(
            parts,
            MessageContent::PartList(vec![
                ContentPart {
                    text: Some("x".to_string())
                },
                ContentPart { text: None },
            ])
        );
        assert_eq!(MessageContent::from_value(&json!(42)), None);
    }

    #[test]
    fn unexpected_shapes_yield_empty_text() {
        for body in [
            json!({}),
            json!({"choices": []}),
            json!({"choices": "nope"}),
            json!({"choices": [{"message": "not an object"}]}),
            json!({"choices": [{"message": {}}]}),
            json!({"choices": [{"message": {"content": null}}]}),
            json!([1, 2, 3]),
        ] {
            assert_eq!(extract_reply_text(&body), "", "body: {}", body);
        }
    }

    #[test]
    fn placeholder_used_for_empty_text() {
        let body = json!({"choices": [{"message": {"content": ""}}]});
        assert_eq!(reply_text_or_placeholder(&body), EMPTY_REPLY_PLACEHOLDER);

        let body = json!({"choices": [{"message": {"content": "ok"}}]});
        assert_eq!(reply_text_or_placeholder(&body), "ok");
    }
}
