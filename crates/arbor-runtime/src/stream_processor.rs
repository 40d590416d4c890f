//! Stream processor: applies a driver's event stream to the model message.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use arbor_core::events::StreamEvent;
use arbor_core::messages::{ChatMessage, ToolCall};
use arbor_llm::provider::StreamEventStream;

use crate::observer::TurnObserver;

/// How one streaming round ended.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamOutcome {
    /// Normal completion; `tool_calls` is empty for a final answer.
    Completed {
        /// Calls requested in this round, in request order.
        tool_calls: Vec<ToolCall>,
    },
    /// The driver reported a failure.
    Failed {
        /// HTTP status, when the backend answered.
        status: Option<u16>,
        /// Raw error body or transport error text.
        message: String,
    },
    /// The cancellation token fired.
    Cancelled,
}

/// Consume `stream`, appending text to `message` in place.
///
/// The message's streaming flag is cleared on every exit path. Text already
/// appended stays when the round fails or is cancelled.
pub async fn process_stream(
    mut stream: StreamEventStream,
    message: &mut ChatMessage,
    observer: &mut dyn TurnObserver,
    cancel: &CancellationToken,
) -> StreamOutcome {
    let mut tool_calls: Vec<ToolCall> = Vec::new();

    let outcome = loop {
        // biased: prefer cancellation when both are ready
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => break StreamOutcome::Cancelled,
            event = stream.next() => event,
        };

        match event {
            None => {
                warn!("stream ended without a terminal event");
                break StreamOutcome::Failed {
                    status: None,
                    message: "stream ended unexpectedly".into(),
                };
            }
            Some(StreamEvent::TextDelta { delta }) => {
                message.content.push_str(&delta);
                observer.on_text_chunk(&delta, None);
            }
            Some(StreamEvent::Grounding { metadata }) => {
                observer.on_text_chunk("", Some(&metadata));
                message.grounding = Some(metadata);
            }
            Some(StreamEvent::ToolCallBatch { calls }) => {
                if !tool_calls.is_empty() {
                    warn!(previous = tool_calls.len(), "second tool-call batch in one round, appending");
                }
                tool_calls.extend(calls);
            }
            Some(StreamEvent::Done) => break StreamOutcome::Completed { tool_calls },
            Some(StreamEvent::Failed { status, message: error }) => {
                break StreamOutcome::Failed { status, message: error };
            }
        }
    };

    message.thinking = false;
    debug!(
        content_len = message.content.len(),
        outcome = outcome_label(&outcome),
        "stream processed"
    );
    outcome
}

fn outcome_label(outcome: &StreamOutcome) -> &'static str {
    match outcome {
        StreamOutcome::Completed { tool_calls } if tool_calls.is_empty() => "completed",
        StreamOutcome::Completed { .. } => "tool_calls",
        StreamOutcome::Failed { .. } => "failed",
        StreamOutcome::Cancelled => "cancelled",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
