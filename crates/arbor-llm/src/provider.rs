//! # Provider Trait
//!
//! Core abstraction for streaming LLM backends. Both drivers (native
//! structured-stream and universal OpenAI-compatible) implement [`Provider`].
//!
//! [`Provider::stream`] returns `Err` only for faults detected before any
//! request is sent (missing credential, unbuildable request). Once a request
//! is in flight, transport errors and non-2xx responses arrive as a terminal
//! [`StreamEvent::Failed`] carrying the status and raw body.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use arbor_core::events::StreamEvent;
use arbor_core::messages::ChatMessage;
use arbor_core::tools::ToolDeclaration;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::factory::DriverConfig;

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Boxed stream of [`StreamEvent`]s returned by [`Provider::stream`].
pub type StreamEventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Errors that can occur during provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading the response body failed mid-stream.
    #[error("stream read error: {message}")]
    Stream {
        /// Error description.
        message: String,
    },

    /// Missing or rejected credential.
    #[error("Auth error: {message}")]
    Auth {
        /// Error description.
        message: String,
    },

    /// Backend returned a non-2xx response.
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Driver selection or configuration problem.
    #[error("{message}")]
    Other {
        /// Error description.
        message: String,
    },
}

impl ProviderError {
    /// Whether retrying the same request could succeed.
    ///
    /// The loop never retries on its own; callers may.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Stream { .. } => true,
            Self::Json(_) | Self::Auth { .. } | Self::Other { .. } => false,
        }
    }

    /// Error category string for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http(_) | Self::Stream { .. } => "network",
            Self::Json(_) => "parse",
            Self::Auth { .. } => "auth",
            Self::Api { .. } => "api",
            Self::Other { .. } => "unknown",
        }
    }

    /// HTTP status associated with the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The terminal stream event reporting this error.
    pub fn to_failed_event(&self) -> StreamEvent {
        let message = match self {
            Self::Api { body, .. } => body.clone(),
            other => other.to_string(),
        };
        StreamEvent::Failed {
            status: self.status(),
            message,
        }
    }
}

/// Which driver family a provider belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Native structured-stream backend.
    Native,
    /// OpenAI-compatible delta backend.
    Compatible,
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Native => "native",
            Self::Compatible => "compatible",
        })
    }
}

/// Image attached to the current turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
    /// Base64-encoded bytes.
    pub data: String,
}

/// One dispatch: everything a driver needs to build a wire request.
///
/// `messages` is the full history including the current user prompt. The
/// image, when present, belongs to the last user message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProviderRequest {
    /// Model identifier.
    pub model: String,
    /// System instruction text.
    pub system_instruction: String,
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Tool catalog.
    pub tools: Vec<ToolDeclaration>,
    /// Conversation history.
    pub messages: Vec<ChatMessage>,
    /// Optional image for the current turn.
    pub image: Option<ImagePayload>,
}

/// Core LLM provider trait.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Driver family.
    fn provider_type(&self) -> ProviderType;

    /// Model ID sent to the backend.
    fn model(&self) -> &str;

    /// Dispatch a request and stream the response.
    ///
    /// The stream ends with exactly one [`StreamEvent::Done`] or
    /// [`StreamEvent::Failed`].
    async fn stream(&self, request: &ProviderRequest) -> ProviderResult<StreamEventStream>;
}

/// Creates a driver for a dispatch.
///
/// Called once per streaming round with the root node's configuration, so a
/// tree edit that changes the root's provider takes effect on the next round.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    /// Build a provider, or fail with [`ProviderError::Auth`] when no
    /// credential is available.
    async fn create(&self, config: &DriverConfig) -> ProviderResult<Arc<dyn Provider>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_failed_event_carries_raw_body() {
        let err = ProviderError::Api {
            status: 404,
            body: r#"{"error":"model not found"}"#.into(),
        };
        assert_eq!(
            err.to_failed_event(),
            StreamEvent::Failed {
                status: Some(404),
                message: r#"{"error":"model not found"}"#.into(),
            }
        );
        assert_eq!(err.category(), "api");
        assert!(!err.is_retryable());
    }

    #[test]
    fn server_errors_are_retryable() {
        let err = ProviderError::Api {
            status: 503,
            body: String::new(),
        };
        assert!(err.is_retryable());
        let err = ProviderError::Api {
            status: 429,
            body: String::new(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn auth_error() {
        let err = ProviderError::Auth {
            message: "no key".into(),
        };
        assert_eq!(err.category(), "auth");
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "Auth error: no key");
    }

    #[test]
    fn stream_error_failed_event_has_no_status() {
        let err = ProviderError::Stream {
            message: "reset".into(),
        };
        assert_eq!(
            err.to_failed_event(),
            StreamEvent::Failed {
                status: None,
                message: "stream read error: reset".into(),
            }
        );
    }

    #[tokio::test]
    async fn connect_error_is_retryable() {
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:1")
            .send()
            .await
            .unwrap_err();
        let err = ProviderError::Http(err);
        assert!(err.is_retryable());
        assert_eq!(err.category(), "network");
    }

    #[test]
    fn provider_type_display() {
        assert_eq!(ProviderType::Native.to_string(), "native");
        assert_eq!(ProviderType::Compatible.to_string(), "compatible");
    }
}
