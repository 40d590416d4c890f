//! Tool runner backed by interpreter subprocesses.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use arbor_runtime::RunnerError;
use arbor_runtime::runner::{ToolRunner, is_python};

/// Env var carrying the JSON-encoded call arguments.
pub const ARGS_ENV: &str = "ARBOR_TOOL_ARGS";

/// Program plus the flag that makes it evaluate inline source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interpreter {
    /// Executable name or path.
    pub program: String,
    /// Inline-source flag (`-e`, `-c`).
    pub flag: String,
}

impl Interpreter {
    /// Interpreter invoked as `program flag source`.
    pub fn new(program: impl Into<String>, flag: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            flag: flag.into(),
        }
    }
}

/// Runs JavaScript with `node -e` and Python with `python3 -c`.
///
/// Stdout is the result. A non-zero exit fails the call with stderr as the
/// message. The child is killed when the call is dropped, so cancelling the
/// turn stops it.
#[derive(Clone, Debug)]
pub struct ProcessRunner {
    javascript: Interpreter,
    python: Interpreter,
    timeout: Duration,
}

impl ProcessRunner {
    /// Runner with the default interpreters.
    pub fn new(timeout: Duration) -> Self {
        Self {
            javascript: Interpreter::new("node", "-e"),
            python: Interpreter::new("python3", "-c"),
            timeout,
        }
    }

    /// Override the JavaScript interpreter.
    #[must_use]
    pub fn with_javascript(mut self, interpreter: Interpreter) -> Self {
        self.javascript = interpreter;
        self
    }

    /// Override the Python interpreter.
    #[must_use]
    pub fn with_python(mut self, interpreter: Interpreter) -> Self {
        self.python = interpreter;
        self
    }

    fn interpreter(&self, language: &str) -> Result<&Interpreter, RunnerError> {
        if is_python(language) {
            return Ok(&self.python);
        }
        match language.trim().to_ascii_lowercase().as_str() {
            "javascript" | "js" | "node" => Ok(&self.javascript),
            _ => Err(RunnerError::Unavailable {
                language: language.to_owned(),
            }),
        }
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn execute(&self, language: &str, source: &str, arguments: &str) -> Result<String, RunnerError> {
        let start = Instant::now();
        let interpreter = self.interpreter(language)?;

        let mut cmd = tokio::process::Command::new(&interpreter.program);
        let _ = cmd
            .arg(&interpreter.flag)
            .arg(source)
            .env(ARGS_ENV, arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(program = %interpreter.program, language, "spawning tool process");
        let child = cmd.spawn()?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                warn!(language, timeout_ms = self.timeout.as_millis(), "tool process timed out");
                RunnerError::Timeout(self.timeout)
            })??;

        let duration_ms = start.elapsed().as_millis();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            debug!(language, duration_ms, code = ?output.status.code(), "tool process failed");
            return Err(RunnerError::Execution(if stderr.is_empty() {
                format!("process exited with {}", output.status)
            } else {
                stderr
            }));
        }

        debug!(language, duration_ms, "tool process completed");
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_owned())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
