//! Universal delta provider for OpenAI-compatible chat-completions backends.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, info, instrument};

use crate::provider::{Provider, ProviderError, ProviderRequest, ProviderResult, ProviderType, StreamEventStream};
use crate::sse::SseParserOptions;
use crate::stream_pipeline::{check_status, sse_to_event_stream, wrap_provider_stream};

use super::message_converter::build_request;
use super::stream_handler::OpenAiStreamState;

/// The body always ends with `data: [DONE]` and a blank line.
const SSE_OPTIONS: SseParserOptions = SseParserOptions {
    process_remaining_buffer: false,
};

/// Configuration for [`OpenAiCompatProvider`].
#[derive(Clone, Debug)]
pub struct OpenAiCompatConfig {
    /// Provider id, used in logs only.
    pub provider_id: String,
    /// Model ID.
    pub model: String,
    /// Bearer credential; omitted from the request when `None`.
    pub api_key: Option<String>,
    /// API root; `/chat/completions` is appended.
    pub base_url: String,
}

/// Universal delta driver.
pub struct OpenAiCompatProvider {
    config: OpenAiCompatConfig,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a provider with its own HTTP client.
    #[must_use]
    pub fn new(config: OpenAiCompatConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Create a provider with a shared HTTP client.
    #[must_use]
    pub fn with_client(config: OpenAiCompatConfig, client: reqwest::Client) -> Self {
        info!(
            provider = %config.provider_id,
            model = %config.model,
            base_url = %config.base_url,
            "compatible provider initialized"
        );
        Self { config, client }
    }

    fn api_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn build_headers(&self) -> ProviderResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let _ = headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| ProviderError::Auth {
                message: format!("invalid API key header: {e}"),
            })?;
            let _ = headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn stream_internal(&self, request: &ProviderRequest) -> ProviderResult<StreamEventStream> {
        let headers = self.build_headers()?;
        let mut body = build_request(request);
        if body.model.is_empty() {
            body.model.clone_from(&self.config.model);
        }

        debug!(
            messages = body.messages.len(),
            tools = body.tools.len(),
            "starting compatible stream"
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
            self.config.provider_id.clone(),
            OpenAiStreamState::default(),
        ))
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Compatible
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip_all, fields(provider = %self.config.provider_id, model = %self.config.model))]
    async fn stream(&self, request: &ProviderRequest) -> ProviderResult<StreamEventStream> {
        wrap_provider_stream(&self.config.provider_id, self.stream_internal(request).await)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::events::StreamEvent;
    use arbor_core::messages::ChatMessage;
    use arbor_core::tools::ToolDeclaration;
    use futures::StreamExt;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer, api_key: Option<&str>) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new(OpenAiCompatConfig {
            provider_id: "openai".into(),
            model: "gpt-4o-mini".into(),
            api_key: api_key.map(String::from),
            base_url: format!("{}/v1", server.uri()),
        })
    }

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "gpt-4o-mini".into(),
            system_instruction: "You are Root.".into(),
            temperature: Some(0.2),
            tools: vec![
                ToolDeclaration::Search,
                ToolDeclaration::Function {
                    name: "Get_Time".into(),
                    description: "Get Time".into(),
                    parameters: json!({"type": "object", "properties": {}}),
                },
            ],
            messages: vec![ChatMessage::user("time?")],
            image: None,
        }
    }

    fn sse(chunks: &[serde_json::Value]) -> String {
        let mut body: String = chunks.iter().map(|c| format!("data: {c}\n\n")).collect();
        body.push_str("data: [DONE]\n\n");
        body
    }

    async fn collect(stream: StreamEventStream) -> Vec<StreamEvent> {
        stream.collect().await
    }

    #[test]
    fn url_and_type() {
        let p = OpenAiCompatProvider::new(OpenAiCompatConfig {
            provider_id: "groq".into(),
            model: "llama".into(),
            api_key: None,
            base_url: "https://api.groq.com/openai/v1/".into(),
        });
        assert_eq!(p.api_url(), "https://api.groq.com/openai/v1/chat/completions");
        assert_eq!(p.provider_type(), ProviderType::Compatible);
        assert!(!p.build_headers().unwrap().contains_key(AUTHORIZATION));
    }

    #[tokio::test]
    async fn text_and_fragmented_call() {
        let server = MockServer::start().await;
        let body = sse(&[
            json!({"choices": [{"index": 0, "delta": {"role": "assistant", "content": "Checking"}}]}),
            json!({"choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "id": "call_1", "type": "function", "function": {"name": "Get_Time", "arguments": "{\"tz\":"}}
            ]}}]}),
            json!({"choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "function": {"arguments": "\"UTC\"}"}}
            ]}}]}),
            json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]}),
        ]);
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "stream": true,
                "messages": [{"role": "system", "content": "You are Root."}, {"role": "user", "content": "time?"}],
                "tools": [{"type": "function", "function": {"name": "Get_Time"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        let events = collect(provider(&server, Some("sk-test")).stream(&request()).await.unwrap()).await;
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], StreamEvent::TextDelta { delta: "Checking".into() });
        match &events[1] {
            StreamEvent::ToolCallBatch { calls } => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].name, "Get_Time");
                assert_eq!(calls[0].str_arg("tz"), Some("UTC"));
            }
            other => panic!("expected batch, got {other:?}"),
        }
        assert_eq!(events[2], StreamEvent::Done);
    }

    #[tokio::test]
    async fn plain_answer_completes() {
        let server = MockServer::start().await;
        let body = sse(&[
            json!({"choices": [{"delta": {"content": "It is "}}]}),
            json!({"choices": [{"delta": {"content": "noon."}, "finish_reason": "stop"}]}),
        ]);
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let events = collect(provider(&server, None).stream(&request()).await.unwrap()).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta { delta: "It is ".into() },
                StreamEvent::TextDelta { delta: "noon.".into() },
                StreamEvent::Done,
            ]
        );
        let received = server.received_requests().await.unwrap();
        assert!(received[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn non_2xx_surfaces_status_and_raw_body() {
        let server = MockServer::start().await;
        let error_body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string(error_body))
            .mount(&server)
            .await;

        let events = collect(provider(&server, Some("bad")).stream(&request()).await.unwrap()).await;
        assert_eq!(
            events,
            vec![StreamEvent::Failed {
                status: Some(401),
                message: error_body.into()
            }]
        );
    }

    #[tokio::test]
    async fn malformed_line_dropped_and_broken_call_discarded() {
        let server = MockServer::start().await;
        let mut body = String::from("data: {garbage\n\n");
        body.push_str(&sse(&[
            json!({"choices": [{"delta": {"tool_calls": [
                {"index": 0, "function": {"name": "bad", "arguments": "{\"x\":"}},
                {"index": 1, "function": {"name": "good", "arguments": "{}"}}
            ]}}]}),
        ]));
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let events = collect(provider(&server, None).stream(&request()).await.unwrap()).await;
        assert_eq!(events.len(), 2);
        match &events[0] {
            StreamEvent::ToolCallBatch { calls } => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].name, "good");
            }
            other => panic!("expected batch, got {other:?}"),
        }
        assert_eq!(events[1], StreamEvent::Done);
    }
}
