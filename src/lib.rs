//! chat-relay - minimal chat relay for an LLM chat-completion API
//!
//! This library provides the core functionality for the relay server:
//! configuration, upstream forwarding with a single model fallback, and
//! JSON error normalization.

pub mod config;
pub mod error;
pub mod proxy;

pub use config::Config;
pub use error::{Error, Result};
