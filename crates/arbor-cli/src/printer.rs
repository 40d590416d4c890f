//! Prints turn progress: model text to one writer, tool activity to another.

use std::io::Write;

use serde_json::Value;

use arbor_core::messages::ToolCall;
use arbor_core::text::truncate_str;
use arbor_runtime::{RuntimeError, TurnObserver};

const RESULT_PREVIEW_BYTES: usize = 200;

/// Streams text as it arrives.
pub struct Printer<O, E> {
    out: O,
    err: E,
}

impl<O: Write, E: Write> Printer<O, E> {
    /// Printer writing model text to `out` and tool activity to `err`.
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }
}

impl Printer<std::io::Stdout, std::io::Stderr> {
    /// Printer on stdout and stderr.
    pub fn stdio() -> Self {
        Self::new(std::io::stdout(), std::io::stderr())
    }
}

// write errors are ignored
impl<O: Write + Send, E: Write + Send> TurnObserver for Printer<O, E> {
    fn on_text_chunk(&mut self, text: &str, metadata: Option<&Value>) {
        if metadata.is_some() {
            let _ = writeln!(self.err, "[grounding metadata received]");
        }
        let _ = write!(self.out, "{text}");
        let _ = self.out.flush();
    }

    fn on_tool_call_batch(&mut self, calls: &[ToolCall]) {
        for call in calls {
            let _ = writeln!(self.err, "-> {}({})", call.name, Value::Object(call.args.clone()));
        }
    }

    fn on_tool_result(&mut self, name: &str, result: &str) {
        let _ = writeln!(self.err, "<- {name}: {}", truncate_str(result, RESULT_PREVIEW_BYTES));
    }

    fn on_completed(&mut self) {
        let _ = writeln!(self.out);
    }

    fn on_failed(&mut self, error: &RuntimeError) {
        let _ = writeln!(self.out);
        let _ = writeln!(self.err, "error: {error}");
    }
}
