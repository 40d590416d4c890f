//! Native structured-stream driver (Gemini `streamGenerateContent` wire format).

pub mod message_converter;
pub mod provider;
pub mod stream_handler;
pub mod types;

pub use provider::{GoogleConfig, GoogleProvider};
