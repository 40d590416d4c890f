//! Native structured-stream provider implementing the [`Provider`] trait.
//!
//! Sends `POST {base}/models/{model}:streamGenerateContent?alt=sse` with the
//! API key in the `x-goog-api-key` header. The extended-reasoning flag is
//! toggled by [`supports_thinking`](super::types::supports_thinking).

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, info, instrument};

use crate::provider::{Provider, ProviderError, ProviderRequest, ProviderResult, ProviderType, StreamEventStream};
use crate::sse::SseParserOptions;
use crate::stream_pipeline::{check_status, sse_to_event_stream, wrap_provider_stream};

use super::message_converter::build_request;
use super::stream_handler::GoogleStreamState;
use super::types::DEFAULT_BASE_URL;

/// The backend may close the body without a trailing newline.
const SSE_OPTIONS: SseParserOptions = SseParserOptions {
    process_remaining_buffer: true,
};

/// Configuration for [`GoogleProvider`].
#[derive(Clone, Debug)]
pub struct GoogleConfig {
    /// Model ID.
    pub model: String,
    /// API key.
    pub api_key: String,
    /// API root; defaults to the public endpoint.
    pub base_url: Option<String>,
}

/// Native structured-stream driver.
pub struct GoogleProvider {
    config: GoogleConfig,
    client: reqwest::Client,
}

impl GoogleProvider {
    /// Create a provider with its own HTTP client.
    #[must_use]
    pub fn new(config: GoogleConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Create a provider with a shared HTTP client.
    #[must_use]
    pub fn with_client(config: GoogleConfig, client: reqwest::Client) -> Self {
        info!(model = %config.model, base_url = ?config.base_url, "native provider initialized");
        Self { config, client }
    }

    fn api_url(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        format!("{base}/models/{}:streamGenerateContent?alt=sse", self.config.model)
    }

    fn build_headers(&self) -> ProviderResult<HeaderMap> {
        if self.config.api_key.is_empty() {
            return Err(ProviderError::Auth {
                message: "native provider requires an API key".into(),
            });
        }
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let _ = headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        let key = HeaderValue::from_str(&self.config.api_key).map_err(|e| ProviderError::Auth {
            message: format!("invalid API key header: {e}"),
        })?;
        let _ = headers.insert("x-goog-api-key", key);
        Ok(headers)
    }

    async fn stream_internal(&self, request: &ProviderRequest) -> ProviderResult<StreamEventStream> {
        let headers = self.build_headers()?;
        let body = build_request(request);

        debug!(
            contents = body.contents.len(),
            tool_groups = body.tools.len(),
            thinking = body.generation_config.thinking_config.is_some(),
            "starting native stream"
        );

        let response = self
            .client
            .post(self.api_url())
            .headers(headers)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        Ok(sse_to_event_stream(
            response,
            SSE_OPTIONS,
            "native",
            GoogleStreamState::default(),
        ))
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Native
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip_all, fields(provider = "native", model = %self.config.model))]
    async fn stream(&self, request: &ProviderRequest) -> ProviderResult<StreamEventStream> {
        wrap_provider_stream("native", self.stream_internal(request).await)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
