//! OpenAI-compatible chat-completions wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────────────────────────────────────

/// Streaming chat-completions request body.
#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
    /// Model ID.
    pub model: String,
    /// Conversation.
    pub messages: Vec<ChatMessageParam>,
    /// Always `true`.
    pub stream: bool,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Function tools.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolParam>,
}

/// One request message.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessageParam {
    /// System prompt.
    System {
        /// Text.
        content: String,
    },
    /// User input.
    User {
        /// Text or multi-part content.
        content: UserContent,
    },
    /// Prior model output.
    Assistant {
        /// Text; `null` when the turn only called tools.
        content: Option<String>,
        /// Requested calls with synthetic ids.
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallParam>,
    },
    /// Tool result.
    Tool {
        /// Id of the call this answers.
        tool_call_id: String,
        /// Result text.
        content: String,
    },
}

/// User message content.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UserContent {
    /// Plain text.
    Text(String),
    /// Text plus image parts.
    Parts(Vec<ContentPart>),
}

/// One part of multi-part user content.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text part.
    Text {
        /// Text.
        text: String,
    },
    /// Image as a data URI.
    ImageUrl {
        /// URL wrapper.
        image_url: ImageUrl,
    },
}

/// Image URL wrapper.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageUrl {
    /// `data:{mime};base64,{data}`.
    pub url: String,
}

/// A prior tool call in an assistant message.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolCallParam {
    /// Synthetic id.
    pub id: String,
    /// Always `function`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Function name and JSON-encoded arguments.
    pub function: FunctionCallParam,
}

/// Function name and arguments.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FunctionCallParam {
    /// Name.
    pub name: String,
    /// JSON-encoded arguments object.
    pub arguments: String,
}

/// Function tool declaration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolParam {
    /// Always `function`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Declaration.
    pub function: FunctionDef,
}

/// Function declaration body.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FunctionDef {
    /// Name.
    pub name: String,
    /// Description.
    pub description: String,
    /// JSON Schema of the arguments.
    pub parameters: Value,
}

// ─────────────────────────────────────────────────────────────────────────────
// Response
// ─────────────────────────────────────────────────────────────────────────────

/// One SSE payload.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatChunk {
    /// Choices; only the first is used.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// In-band error some gateways send mid-stream.
    pub error: Option<Value>,
}

/// One choice of a chunk.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChunkChoice {
    /// Incremental content.
    #[serde(default)]
    pub delta: ChunkDelta,
    /// Finish reason, on the last chunk.
    pub finish_reason: Option<String>,
}

/// Incremental content.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChunkDelta {
    /// Text fragment.
    pub content: Option<String>,
    /// Tool-call fragments.
    #[serde(default)]
    pub tool_calls: Vec<ToolCallDelta>,
}

/// One indexed tool-call fragment.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ToolCallDelta {
    /// Position of the call in the batch.
    #[serde(default)]
    pub index: u32,
    /// Call id; usually only on the first fragment.
    pub id: Option<String>,
    /// Name and argument slice.
    pub function: Option<FunctionDelta>,
}

/// Function part of a fragment.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FunctionDelta {
    /// Name; usually only on the first fragment.
    pub name: Option<String>,
    /// Slice of the JSON arguments text.
    pub arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assistant_with_calls_serializes_null_content() {
        let msg = ChatMessageParam::Assistant {
            content: None,
            tool_calls: vec![ToolCallParam {
                id: "call_m_0".into(),
                kind: "function",
                function: FunctionCallParam {
                    name: "f".into(),
                    arguments: "{}".into(),
                },
            }],
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["role"], "assistant");
        assert!(v["content"].is_null());
        assert_eq!(v["tool_calls"][0]["type"], "function");
    }

    #[test]
    fn image_part_shape() {
        let content = UserContent::Parts(vec![
            ContentPart::Text { text: "look".into() },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: "data:image/png;base64,AAAA".into(),
                },
            },
        ]);
        let v = serde_json::to_value(&content).unwrap();
        assert_eq!(v[0], json!({"type": "text", "text": "look"}));
        assert_eq!(v[1]["type"], "image_url");
        assert_eq!(v[1]["image_url"]["url"], "data:image/png;base64,AAAA");
    }

    #[test]
    fn chunk_deserializes_fragments() {
        let chunk: ChatChunk = serde_json::from_value(json!({
            "id": "x",
            "choices": [{
                "index": 0,
                "delta": {"tool_calls": [{"index": 0, "id": "c1", "type": "function",
                    "function": {"name": "f", "arguments": "{\"a\""}}]},
                "finish_reason": null
            }]
        }))
        .unwrap();
        let frag = &chunk.choices[0].delta.tool_calls[0];
        assert_eq!(frag.id.as_deref(), Some("c1"));
        assert_eq!(frag.function.as_ref().unwrap().arguments.as_deref(), Some("{\"a\""));
    }

    #[test]
    fn chunk_with_null_delta_content() {
        let chunk: ChatChunk = serde_json::from_value(json!({
            "choices": [{"delta": {"role": "assistant", "content": null}}]
        }))
        .unwrap();
        assert!(chunk.choices[0].delta.content.is_none());
    }
}
