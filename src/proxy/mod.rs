//! HTTP relay module.
//!
//! Accepts chat messages from clients and forwards them to the configured
//! upstream chat-completion API.

pub mod fallback;
mod handlers;
mod server;
pub mod types;
pub mod upstream;

pub use fallback::{relay_with_fallback, UpstreamFailure};
pub use server::{create_router, run_server, serve_with_shutdown, AppState};
pub use types::{ChatReply, ChatRequest, MessageContent, EMPTY_REPLY_PLACEHOLDER};
pub use upstream::{UpstreamClient, UpstreamError, UpstreamReply};
