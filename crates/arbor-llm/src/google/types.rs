//! Gemini wire types for `streamGenerateContent`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ─────────────────────────────────────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────────────────────────────────────

/// Request body.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    /// Conversation contents.
    pub contents: Vec<GeminiContent>,
    /// System instruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
    /// Tool groups.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<GeminiTool>,
    /// Sampling and reasoning options.
    pub generation_config: GenerationConfig,
}

/// One turn of conversation content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeminiContent {
    /// `user` or `model`.
    pub role: String,
    /// Content parts.
    pub parts: Vec<GeminiPart>,
}

/// A content part.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeminiPart {
    /// Text, possibly a reasoning summary.
    Text {
        /// The text.
        text: String,
        /// Set on reasoning parts.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thought: Option<bool>,
    },
    /// Function call from the model.
    FunctionCall {
        /// Call details.
        #[serde(rename = "functionCall")]
        function_call: FunctionCallData,
    },
    /// Function result sent back to the model.
    FunctionResponse {
        /// Response details.
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponseData,
    },
    /// Inline binary data.
    InlineData {
        /// Data details.
        #[serde(rename = "inlineData")]
        inline_data: InlineDataContent,
    },
    /// Any part kind this driver does not handle (code execution, ...).
    Other(Value),
}

/// Function call details.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallData {
    /// Function name.
    pub name: String,
    /// Arguments object.
    #[serde(default)]
    pub args: Value,
}

/// Function response details.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponseData {
    /// Function name.
    pub name: String,
    /// Response object.
    pub response: Value,
}

/// Inline binary data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineDataContent {
    /// MIME type.
    pub mime_type: String,
    /// Base64 data.
    pub data: String,
}

/// System instruction.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SystemInstruction {
    /// Text parts.
    pub parts: Vec<SystemPart>,
}

/// System instruction text part.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SystemPart {
    /// Text.
    pub text: String,
}

/// One entry of the `tools` array.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GeminiTool {
    /// Callable functions.
    Functions {
        /// Declarations.
        #[serde(rename = "functionDeclarations")]
        function_declarations: Vec<FunctionDeclaration>,
    },
    /// Native search grounding.
    Search {
        /// Empty config object.
        #[serde(rename = "googleSearch")]
        google_search: Value,
    },
}

/// One function declaration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    /// Name.
    pub name: String,
    /// Description.
    pub description: String,
    /// JSON Schema of the arguments.
    pub parameters: Value,
}

/// Generation options.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Extended reasoning options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
}

/// Extended reasoning options.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    /// Ask the backend to stream reasoning summaries as thought parts.
    pub include_thoughts: bool,
}

/// Whether a model id gets the extended-reasoning flag.
#[must_use]
pub fn supports_thinking(model: &str) -> bool {
    let model = model.to_ascii_lowercase();
    model.contains("thinking") || model.contains("2.5") || model.contains("gemini-3")
}

// ─────────────────────────────────────────────────────────────────────────────
// Response
// ─────────────────────────────────────────────────────────────────────────────

/// One SSE payload.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiStreamChunk {
    /// Response candidates; only the first is used.
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    /// In-band error.
    pub error: Option<GeminiApiError>,
}

/// A response candidate.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    /// Content of this chunk.
    pub content: Option<GeminiCandidateContent>,
    /// Finish reason (`STOP`, `MAX_TOKENS`, `SAFETY`, ...).
    pub finish_reason: Option<String>,
    /// Search grounding metadata.
    pub grounding_metadata: Option<Value>,
}

/// Content inside a candidate.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GeminiCandidateContent {
    /// Parts, in arrival order.
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// In-band API error.
#[derive(Clone, Debug, Deserialize)]
pub struct GeminiApiError {
    /// Status code.
    #[serde(default)]
    pub code: u16,
    /// Message.
    #[serde(default)]
    pub message: String,
}
