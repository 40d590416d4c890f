//! Conversation messages.
//!
//! History is an append-only `Vec<ChatMessage>`. A model message may carry a
//! list of [`ToolCall`] requests; each request is answered by one following
//! `Role::Tool` message carrying a [`ToolResponse`], in request order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::MessageId;

// ─────────────────────────────────────────────────────────────────────────────
// Tool call / response
// ─────────────────────────────────────────────────────────────────────────────

/// A tool invocation requested by the model.
///
/// Providers do not persist call ids in this model; the universal driver
/// derives synthetic ids from the owning message id and call index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name as the model sent it.
    pub name: String,
    /// Arguments object.
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl ToolCall {
    /// Create a call.
    pub fn new(name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// String argument by key.
    #[must_use]
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }
}

/// The result of one tool call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Name of the call this answers.
    pub name: String,
    /// Result text; failures start with `Error: `.
    pub result: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Message
// ─────────────────────────────────────────────────────────────────────────────

/// Author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End user.
    User,
    /// The model.
    Model,
    /// Out-of-band system notice.
    System,
    /// Tool result.
    Tool,
}

/// One conversation message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message id.
    pub id: MessageId,
    /// Author.
    pub role: Role,
    /// Text content.
    #[serde(default)]
    pub content: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Set while the message is still being streamed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub thinking: bool,
    /// Tool calls requested by a model message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Result carried by a tool message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_response: Option<ToolResponse>,
    /// Grounding metadata attached by the native driver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding: Option<Value>,
}

impl ChatMessage {
    fn with_role(role: Role, content: String) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content,
            created_at: Utc::now(),
            thinking: false,
            tool_calls: None,
            tool_response: None,
            grounding: None,
        }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content.into())
    }

    /// A system notice.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content.into())
    }

    /// An empty model message marked as streaming.
    #[must_use]
    pub fn streaming_model() -> Self {
        let mut msg = Self::with_role(Role::Model, String::new());
        msg.thinking = true;
        msg
    }

    /// A finished model message.
    pub fn model(content: impl Into<String>) -> Self {
        Self::with_role(Role::Model, content.into())
    }

    /// A tool-result message answering the call named `name`.
    pub fn tool_result(name: impl Into<String>, result: impl Into<String>) -> Self {
        let result = result.into();
        let mut msg = Self::with_role(Role::Tool, result.clone());
        msg.tool_response = Some(ToolResponse {
            name: name.into(),
            result,
        });
        msg
    }

    /// Tool calls requested by this message, empty if none.
    #[must_use]
    pub fn calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
