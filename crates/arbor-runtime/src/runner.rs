//! # Tool Runner Boundary
//!
//! User tool code never runs in-process. A [`ToolRunner`] receives the
//! language, the source and the JSON-encoded arguments and returns text.
//! [`RunnerSet`] routes Python to an optional bridge and everything else to
//! the default runner, and renders failures as `Error: ...` results.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::RunnerError;

/// Prefix marking a failed tool result.
pub const ERROR_PREFIX: &str = "Error: ";

/// Executes tool source code outside the orchestration core.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run `source` written in `language` with `arguments` (a JSON object).
    async fn execute(&self, language: &str, source: &str, arguments: &str) -> Result<String, RunnerError>;
}

/// Whether `language` names Python.
#[must_use]
pub fn is_python(language: &str) -> bool {
    matches!(language.trim().to_ascii_lowercase().as_str(), "python" | "py" | "python3")
}

/// Format a failure as a tool result.
#[must_use]
pub fn error_result(message: impl std::fmt::Display) -> String {
    format!("{ERROR_PREFIX}{message}")
}

/// The runners available to a session.
#[derive(Clone)]
pub struct RunnerSet {
    default: Arc<dyn ToolRunner>,
    python: Option<Arc<dyn ToolRunner>>,
}

impl std::fmt::Debug for RunnerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerSet")
            .field("python", &self.python.is_some())
            .finish_non_exhaustive()
    }
}

impl RunnerSet {
    /// Runner set without a Python bridge.
    #[must_use]
    pub fn new(default: Arc<dyn ToolRunner>) -> Self {
        Self { default, python: None }
    }

    /// Attach a Python bridge.
    #[must_use]
    pub fn with_python(mut self, python: Arc<dyn ToolRunner>) -> Self {
        self.python = Some(python);
        self
    }

    /// Whether a Python bridge is attached.
    #[must_use]
    pub fn has_python(&self) -> bool {
        self.python.is_some()
    }

    /// Run a tool and render the outcome as tool-result text.
    ///
    /// Never fails: every fault becomes an `Error: ` result.
    pub async fn run(&self, language: Option<&str>, source: &str, arguments: &str) -> String {
        match self.execute(language, source, arguments).await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "tool execution failed");
                error_result(e)
            }
        }
    }

    async fn execute(&self, language: Option<&str>, source: &str, arguments: &str) -> Result<String, RunnerError> {
        let language = language.filter(|l| !l.trim().is_empty()).unwrap_or("javascript");
        let runner = if is_python(language) {
            self.python.as_ref().ok_or_else(|| RunnerError::Unavailable {
                language: "Python".into(),
            })?
        } else {
            &self.default
        };
        debug!(language, source_len = source.len(), "dispatching tool to runner");
        runner.execute(language, source, arguments).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
