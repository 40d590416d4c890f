//! Runtime error types.

use arbor_core::store::StoreError;
use arbor_llm::provider::ProviderError;

/// Errors that end a conversation turn.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Raised before dispatch: missing credential, unknown provider.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The driver reported a transport fault or a non-2xx response.
    #[error("Stream failed{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    StreamFailed {
        /// HTTP status, when the backend answered.
        status: Option<u16>,
        /// Raw error body or transport error text.
        message: String,
    },

    /// The turn needed more streaming rounds than allowed.
    #[error("tool-loop limit exceeded ({0} rounds)")]
    ToolLoopLimit(u32),

    /// The turn was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// The node tree cannot drive a turn.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl RuntimeError {
    /// Whether resubmitting the same prompt could succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_retryable(),
            Self::StreamFailed { status, .. } => status.is_none_or(|s| s == 429 || s >= 500),
            Self::Cancelled => true,
            Self::ToolLoopLimit(_) | Self::Store(_) => false,
        }
    }

    /// Error category string for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Provider(e) => e.category(),
            Self::StreamFailed { .. } => "stream",
            Self::ToolLoopLimit(_) => "tool_loop_limit",
            Self::Cancelled => "cancelled",
            Self::Store(_) => "store",
        }
    }
}

/// Errors from an administrative tool; surfaced to the model as a tool result.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// Missing or invalid argument.
    #[error("{0}")]
    InvalidArguments(String),

    /// Structural fault from the node store.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from the external tool runner.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The script failed (non-zero exit, thrown error). Message is verbatim.
    #[error("{0}")]
    Execution(String),

    /// No runner is available for the language.
    #[error("{language} execution bridge is not available")]
    Unavailable {
        /// Display name of the language.
        language: String,
    },

    /// The script did not finish in time.
    #[error("execution timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The runner could not be started.
    #[error("failed to start runner: {0}")]
    Io(#[from] std::io::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_failed_display() {
        let err = RuntimeError::StreamFailed {
            status: Some(401),
            message: "bad key".into(),
        };
        assert_eq!(err.to_string(), "Stream failed (401): bad key");
        assert!(!err.is_recoverable());

        let err = RuntimeError::StreamFailed {
            status: None,
            message: "connection refused".into(),
        };
        assert_eq!(err.to_string(), "Stream failed: connection refused");
        assert!(err.is_recoverable());
    }

    #[test]
    fn categories() {
        assert_eq!(RuntimeError::ToolLoopLimit(25).category(), "tool_loop_limit");
        assert_eq!(RuntimeError::Cancelled.category(), "cancelled");
        let auth = RuntimeError::from(ProviderError::Auth {
            message: "x".into(),
        });
        assert_eq!(auth.category(), "auth");
        assert!(!auth.is_recoverable());
    }

    #[test]
    fn loop_limit_message() {
        assert_eq!(
            RuntimeError::ToolLoopLimit(3).to_string(),
            "tool-loop limit exceeded (3 rounds)"
        );
    }

    #[test]
    fn python_bridge_message() {
        let err = RunnerError::Unavailable {
            language: "Python".into(),
        };
        assert_eq!(err.to_string(), "Python execution bridge is not available");
    }
}
