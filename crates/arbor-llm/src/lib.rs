//! # arbor-llm
//!
//! Streaming LLM drivers behind one abstraction.
//!
//! - [`Provider`]: `stream(request) -> Stream<StreamEvent>`, ending in exactly
//!   one `Done` or `Failed`
//! - Shared SSE line parser and a per-driver [`StreamHandler`] pipeline
//! - Tool-call argument parsing for fragment-accumulated blobs
//! - [`google`]: native structured-stream driver (parts per chunk)
//! - [`openai`]: universal delta driver for OpenAI-compatible endpoints
//! - [`DefaultProviderFactory`]: driver selection and credential resolution
//!
//! [`StreamHandler`]: stream_pipeline::StreamHandler

#![deny(unsafe_code)]

pub mod factory;
pub mod google;
pub mod openai;
pub mod provider;
pub mod sse;
pub mod stream_pipeline;
pub mod tool_parsing;

pub use factory::{DefaultProviderFactory, DriverConfig};
pub use provider::{
    ImagePayload, Provider, ProviderError, ProviderFactory, ProviderRequest, ProviderResult,
    ProviderType, StreamEventStream,
};
