//! # Universal Stream Handler
//!
//! Chat-completions delta stream → [`StreamEvent`]s:
//! - `delta.content` → `TextDelta`, forwarded immediately
//! - `delta.tool_calls[*]` → accumulated by `index` across the whole stream
//! - body end → each accumulated argument blob parsed; unparsable calls are
//!   dropped; survivors emitted as one `ToolCallBatch`, then `Done`

use std::collections::BTreeMap;

use tracing::debug;

use arbor_core::events::StreamEvent;
use arbor_core::messages::ToolCall;

use crate::stream_pipeline::StreamHandler;
use crate::tool_parsing::{ToolCallContext, parse_tool_call_arguments};

use super::types::{ChatChunk, ToolCallDelta};

/// One tool call being reassembled.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolCallState {
    /// Provider call id, if sent.
    pub id: Option<String>,
    /// Function name.
    pub name: String,
    /// Concatenated argument slices.
    pub args: String,
}

/// Mutable state accumulated across one stream.
#[derive(Debug, Default)]
pub struct OpenAiStreamState {
    /// Calls by fragment index; ordered so the batch follows index order.
    pub tool_calls: BTreeMap<u32, ToolCallState>,
    /// Last finish reason seen.
    pub finish_reason: Option<String>,
}

impl StreamHandler for OpenAiStreamState {
    type Chunk = ChatChunk;

    fn on_chunk(&mut self, chunk: ChatChunk) -> Vec<StreamEvent> {
        process_stream_chunk(chunk, self)
    }

    fn finish(self) -> Vec<StreamEvent> {
        let requested = self.tool_calls.len();
        let calls = finalize_tool_calls(self.tool_calls);
        debug!(
            finish_reason = self.finish_reason.as_deref().unwrap_or("none"),
            requested,
            kept = calls.len(),
            "universal stream finished"
        );
        let mut events = Vec::with_capacity(2);
        if !calls.is_empty() {
            events.push(StreamEvent::ToolCallBatch { calls });
        }
        events.push(StreamEvent::Done);
        events
    }
}

/// Process one SSE payload.
pub fn process_stream_chunk(chunk: ChatChunk, state: &mut OpenAiStreamState) -> Vec<StreamEvent> {
    if let Some(error) = chunk.error {
        let status = error
            .get("code")
            .and_then(serde_json::Value::as_u64)
            .and_then(|c| u16::try_from(c).ok());
        return vec![StreamEvent::Failed {
            status,
            message: error.to_string(),
        }];
    }

    let mut events = Vec::new();
    let Some(choice) = chunk.choices.into_iter().next() else {
        return events;
    };

    if let Some(text) = choice.delta.content {
        if !text.is_empty() {
            events.push(StreamEvent::TextDelta { delta: text });
        }
    }

    for fragment in choice.delta.tool_calls {
        accumulate_fragment(fragment, state);
    }

    if let Some(reason) = choice.finish_reason {
        state.finish_reason = Some(reason);
    }

    events
}

fn accumulate_fragment(fragment: ToolCallDelta, state: &mut OpenAiStreamState) {
    let entry = state.tool_calls.entry(fragment.index).or_default();
    if let Some(id) = fragment.id {
        if !id.is_empty() {
            entry.id = Some(id);
        }
    }
    if let Some(function) = fragment.function {
        if let Some(name) = function.name {
            // Some backends repeat the full name on every fragment.
            if entry.name != name {
                entry.name.push_str(&name);
            }
        }
        if let Some(args) = function.arguments {
            entry.args.push_str(&args);
        }
    }
}

/// Parse every accumulated call; drop the ones whose arguments do not parse.
pub fn finalize_tool_calls(tool_calls: BTreeMap<u32, ToolCallState>) -> Vec<ToolCall> {
    tool_calls
        .into_values()
        .filter(|tc| !tc.name.is_empty())
        .filter_map(|tc| {
            let ctx = ToolCallContext {
                tool_call_id: tc.id.as_deref(),
                tool_name: Some(&tc.name),
                provider: Some("universal"),
            };
            let args = parse_tool_call_arguments(&tc.args, &ctx)?;
            Some(ToolCall::new(tc.name, args))
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
