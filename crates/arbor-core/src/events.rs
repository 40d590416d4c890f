//! Provider-agnostic stream events.
//!
//! Every driver translates its backend's wire stream into this sequence:
//! zero or more [`StreamEvent::TextDelta`] / [`StreamEvent::Grounding`] in
//! arrival order, at most one [`StreamEvent::ToolCallBatch`] after the backend
//! stream ends, then exactly one terminal [`StreamEvent::Done`] or
//! [`StreamEvent::Failed`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::messages::ToolCall;

/// One event of a streaming dispatch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental text to append to the model message.
    TextDelta {
        /// Text fragment.
        delta: String,
    },
    /// Grounding / citation metadata attached to the model message.
    Grounding {
        /// Backend-specific metadata object.
        metadata: Value,
    },
    /// Every tool call requested in this streaming phase, in request order.
    ToolCallBatch {
        /// The calls.
        calls: Vec<ToolCall>,
    },
    /// Normal end of stream.
    Done,
    /// Transport or backend failure.
    Failed {
        /// HTTP status, when the failure came from a response.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        /// Raw error body or transport error text.
        message: String,
    },
}

impl StreamEvent {
    /// Whether this event ends the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_events() {
        assert!(StreamEvent::Done.is_terminal());
        assert!(
            StreamEvent::Failed {
                status: Some(500),
                message: "boom".into()
            }
            .is_terminal()
        );
        assert!(!StreamEvent::TextDelta { delta: "x".into() }.is_terminal());
        assert!(!StreamEvent::ToolCallBatch { calls: vec![] }.is_terminal());
    }
}
