//! Callbacks through which a front end follows a turn.

use serde_json::Value;

use arbor_core::messages::ToolCall;

use crate::errors::RuntimeError;

/// Receives turn progress in order.
///
/// `on_text_chunk` is append-only: chunks arrive in stream order and are
/// never revised. `on_tool_call_batch` fires at most once per streaming
/// round. Exactly one of `on_completed` / `on_failed` ends the turn.
pub trait TurnObserver: Send {
    /// Text (and, for grounding, metadata) appended to the model message.
    fn on_text_chunk(&mut self, text: &str, metadata: Option<&Value>) {
        let _ = (text, metadata);
    }

    /// The calls requested by one streaming round.
    fn on_tool_call_batch(&mut self, calls: &[ToolCall]) {
        let _ = calls;
    }

    /// One tool call finished; `result` is what the model will see.
    fn on_tool_result(&mut self, name: &str, result: &str) {
        let _ = (name, result);
    }

    /// The turn ended with a final answer.
    fn on_completed(&mut self) {}

    /// The turn ended with an error.
    fn on_failed(&mut self, error: &RuntimeError) {
        let _ = error;
    }
}

/// Observer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl TurnObserver for NoopObserver {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_accepts_everything() {
        let mut o = NoopObserver;
        o.on_text_chunk("x", None);
        o.on_tool_call_batch(&[]);
        o.on_tool_result("t", "r");
        o.on_completed();
        o.on_failed(&RuntimeError::Cancelled);
    }
}
