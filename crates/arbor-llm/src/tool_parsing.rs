//! # Tool Call Argument Parsing
//!
//! Parsing for argument blobs reassembled from streamed tool-call fragments.
//! A blob that is not a JSON object means that one call is unusable: the
//! caller drops it and keeps the rest of the turn.

use serde_json::{Map, Value};
use tracing::warn;

/// Context for logging when tool call parsing fails.
#[derive(Clone, Debug, Default)]
pub struct ToolCallContext<'a> {
    /// Provider-assigned call id, if any.
    pub tool_call_id: Option<&'a str>,
    /// The tool name.
    pub tool_name: Option<&'a str>,
    /// The provider that generated this tool call.
    pub provider: Option<&'a str>,
}

/// Parse an accumulated arguments blob into an object.
///
/// An empty blob is an empty object. Malformed JSON or a non-object value
/// returns `None` and logs a warning.
pub fn parse_tool_call_arguments(
    args: &str,
    context: &ToolCallContext<'_>,
) -> Option<Map<String, Value>> {
    let trimmed = args.trim();
    if trimmed.is_empty() {
        return Some(Map::new());
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => Some(map),
        Ok(other) => {
            warn!(
                tool_call_id = context.tool_call_id,
                tool_name = context.tool_name,
                provider = context.provider,
                parsed_type = arbor_core::text::truncate_str(&other.to_string(), 20),
                "tool call arguments are not an object, dropping call"
            );
            None
        }
        Err(e) => {
            warn!(
                tool_call_id = context.tool_call_id,
                tool_name = context.tool_name,
                provider = context.provider,
                error = %e,
                args_preview = arbor_core::text::truncate_str(trimmed, 100),
                "failed to parse tool call arguments, dropping call"
            );
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
