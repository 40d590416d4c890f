//! SSE stream handler for the native backend.
//!
//! Parts are demultiplexed in arrival order. Text parts are forwarded as
//! soon as they arrive; reasoning (`thought`) parts are not part of the
//! answer and are skipped. Function calls are buffered until the body ends,
//! because a backend may send explanatory text before the call within the
//! same turn, and the loop needs the whole batch at once.

use serde_json::Map;
use tracing::{debug, warn};

use arbor_core::events::StreamEvent;
use arbor_core::messages::ToolCall;

use crate::stream_pipeline::StreamHandler;

use super::types::{FunctionCallData, GeminiPart, GeminiStreamChunk};

/// Mutable state accumulated across one stream.
#[derive(Debug, Default)]
pub struct GoogleStreamState {
    /// Buffered function calls, in arrival order.
    pub tool_calls: Vec<ToolCall>,
    /// Last finish reason seen.
    pub finish_reason: Option<String>,
}

impl StreamHandler for GoogleStreamState {
    type Chunk = GeminiStreamChunk;

    fn on_chunk(&mut self, chunk: GeminiStreamChunk) -> Vec<StreamEvent> {
        process_stream_chunk(chunk, self)
    }

    fn finish(self) -> Vec<StreamEvent> {
        debug!(
            finish_reason = self.finish_reason.as_deref().unwrap_or("none"),
            tool_calls = self.tool_calls.len(),
            "native stream finished"
        );
        let mut events = Vec::with_capacity(2);
        if !self.tool_calls.is_empty() {
            events.push(StreamEvent::ToolCallBatch {
                calls: self.tool_calls,
            });
        }
        events.push(StreamEvent::Done);
        events
    }
}

/// Process one SSE payload.
pub fn process_stream_chunk(
    chunk: GeminiStreamChunk,
    state: &mut GoogleStreamState,
) -> Vec<StreamEvent> {
    if let Some(error) = chunk.error {
        return vec![StreamEvent::Failed {
            status: (error.code != 0).then_some(error.code),
            message: error.message,
        }];
    }

    let mut events = Vec::new();
    let Some(candidate) = chunk.candidates.into_iter().next() else {
        return events;
    };

    if let Some(content) = candidate.content {
        for part in content.parts {
            if let Some(event) = process_part(part, state) {
                events.push(event);
            }
        }
    }

    if let Some(metadata) = candidate.grounding_metadata {
        events.push(StreamEvent::Grounding { metadata });
    }

    if let Some(reason) = candidate.finish_reason {
        if reason != "STOP" {
            warn!(finish_reason = %reason, "native stream finished abnormally");
        }
        state.finish_reason = Some(reason);
    }

    events
}

fn process_part(part: GeminiPart, state: &mut GoogleStreamState) -> Option<StreamEvent> {
    match part {
        GeminiPart::Text { thought: Some(true), .. } => None,
        GeminiPart::Text { text, .. } => {
            (!text.is_empty()).then_some(StreamEvent::TextDelta { delta: text })
        }
        GeminiPart::FunctionCall { function_call } => {
            state.tool_calls.push(into_tool_call(function_call));
            None
        }
        GeminiPart::FunctionResponse { .. } | GeminiPart::InlineData { .. } | GeminiPart::Other(_) => {
            None
        }
    }
}

fn into_tool_call(fc: FunctionCallData) -> ToolCall {
    let args = match fc.args {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Null => Map::new(),
        other => {
            warn!(tool_name = %fc.name, args = %other, "non-object function call args, using empty");
            Map::new()
        }
    };
    ToolCall::new(fc.name, args)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
