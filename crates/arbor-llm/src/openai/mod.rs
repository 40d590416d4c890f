//! Universal delta driver for OpenAI-compatible chat-completions endpoints.

pub mod message_converter;
pub mod provider;
pub mod stream_handler;
pub mod types;

pub use provider::{OpenAiCompatConfig, OpenAiCompatProvider};
