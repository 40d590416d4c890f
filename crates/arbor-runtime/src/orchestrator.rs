//! Orchestrator: runs one turn as a loop of streaming rounds and tool calls.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use arbor_core::messages::{ChatMessage, ToolCall};
use arbor_core::nodes::Node;
use arbor_llm::factory::DriverConfig;
use arbor_llm::provider::{ImagePayload, ProviderError, ProviderFactory, ProviderRequest};
use arbor_settings::AgentSettings;

use crate::admin::{
    MANAGE_NODE, MANAGE_SIMULATION, ManageNodeArgs, ManageSimulationArgs, apply_manage_node,
};
use crate::assembler::assemble;
use crate::errors::RuntimeError;
use crate::observer::TurnObserver;
use crate::runner::{RunnerSet, error_result};
use crate::session::Session;
use crate::stream_processor::{StreamOutcome, process_stream};
use crate::tool_index::ToolIndex;

/// One user submission.
#[derive(Clone, Debug, Default)]
pub struct TurnInput {
    /// Prompt text.
    pub prompt: String,
    /// Optional image for this turn only.
    pub image: Option<ImagePayload>,
}

impl TurnInput {
    /// Text-only submission.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
        }
    }
}

/// Summary of a completed turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TurnSummary {
    /// Streaming rounds used, including the final one.
    pub rounds: u32,
    /// Tool calls executed across all rounds.
    pub tool_calls: usize,
}

/// Drives turns against a session.
pub struct Orchestrator {
    factory: Arc<dyn ProviderFactory>,
    runners: RunnerSet,
    max_tool_rounds: u32,
    default_temperature: f64,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("runners", &self.runners)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .field("default_temperature", &self.default_temperature)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator.
    pub fn new(factory: Arc<dyn ProviderFactory>, runners: RunnerSet, settings: &AgentSettings) -> Self {
        Self {
            factory,
            runners,
            max_tool_rounds: settings.max_tool_rounds.max(1),
            default_temperature: settings.default_temperature,
        }
    }

    /// Run one turn: append the prompt, then stream and execute tool calls
    /// until the model answers without calls.
    ///
    /// Every exit notifies `observer` exactly once, through `on_completed`
    /// or `on_failed`.
    #[instrument(skip_all, fields(prompt_len = input.prompt.len()))]
    pub async fn run_turn(
        &self,
        session: &mut Session,
        input: TurnInput,
        observer: &mut dyn TurnObserver,
        cancel: &CancellationToken,
    ) -> Result<TurnSummary, RuntimeError> {
        let start = Instant::now();
        let result = self.run_rounds(session, input, observer, cancel).await;
        match &result {
            Ok(summary) => {
                info!(
                    rounds = summary.rounds,
                    tool_calls = summary.tool_calls,
                    duration_ms = start.elapsed().as_millis(),
                    "turn completed"
                );
                observer.on_completed();
            }
            Err(e) => {
                warn!(error = %e, category = e.category(), "turn failed");
                observer.on_failed(e);
            }
        }
        result
    }

    async fn run_rounds(
        &self,
        session: &mut Session,
        input: TurnInput,
        observer: &mut dyn TurnObserver,
        cancel: &CancellationToken,
    ) -> Result<TurnSummary, RuntimeError> {
        session.history_mut().push(ChatMessage::user(input.prompt));
        let mut executed = 0usize;

        for round in 1..=self.max_tool_rounds {
            if cancel.is_cancelled() {
                return Err(RuntimeError::Cancelled);
            }

            // 1. Driver from the root of the working tree, re-read every round
            let (driver, temperature) = driver_config(session.store().root(), self.default_temperature);
            let provider = self
                .factory
                .create(&driver)
                .await
                .map_err(|e| record_provider_error(session, e))?;

            // 2. Context from the visible tree
            let context = assemble(session.store(), session.active_set());
            let request = ProviderRequest {
                model: driver.model.clone(),
                system_instruction: context.instruction(),
                temperature: Some(temperature),
                tools: context.tools,
                messages: session.history().to_vec(),
                image: input.image.clone(),
            };
            debug!(round, model = %request.model, tools = request.tools.len(), "dispatching round");

            // 3. Stream into a fresh model message
            let stream = provider
                .stream(&request)
                .await
                .map_err(|e| record_provider_error(session, e))?;
            session.history_mut().push(ChatMessage::streaming_model());
            let outcome = match session.history_mut().last_mut() {
                Some(message) => process_stream(stream, message, observer, cancel).await,
                None => StreamOutcome::Cancelled,
            };

            // 4. Final answer, failure, or another batch of calls
            let calls = match outcome {
                StreamOutcome::Completed { tool_calls } if tool_calls.is_empty() => {
                    return Ok(TurnSummary {
                        rounds: round,
                        tool_calls: executed,
                    });
                }
                StreamOutcome::Completed { tool_calls } => tool_calls,
                StreamOutcome::Failed { status, message } => {
                    drop_empty_model_message(session);
                    session.history_mut().push(ChatMessage::system(format!("Error: {message}")));
                    return Err(RuntimeError::StreamFailed { status, message });
                }
                StreamOutcome::Cancelled => {
                    drop_empty_model_message(session);
                    return Err(RuntimeError::Cancelled);
                }
            };

            if let Some(message) = session.history_mut().last_mut() {
                message.tool_calls = Some(calls.clone());
            }
            observer.on_tool_call_batch(&calls);
            executed += calls.len();
            self.execute_batch(session, &calls, observer, cancel).await?;
        }

        Err(RuntimeError::ToolLoopLimit(self.max_tool_rounds))
    }

    /// Run `calls` sequentially, appending one result message per call in
    /// request order. After cancellation the remaining calls are answered
    /// without running.
    async fn execute_batch(
        &self,
        session: &mut Session,
        calls: &[ToolCall],
        observer: &mut dyn TurnObserver,
        cancel: &CancellationToken,
    ) -> Result<(), RuntimeError> {
        let index = ToolIndex::build(session.store(), session.active_set());

        for call in calls {
            let result = if cancel.is_cancelled() {
                error_result("cancelled")
            } else {
                self.execute_call(session, &index, call, cancel).await
            };
            observer.on_tool_result(&call.name, &result);
            session.history_mut().push(ChatMessage::tool_result(&call.name, result));
        }

        if cancel.is_cancelled() {
            return Err(RuntimeError::Cancelled);
        }
        Ok(())
    }

    #[instrument(skip_all, fields(tool_name = %call.name))]
    async fn execute_call(
        &self,
        session: &mut Session,
        index: &ToolIndex,
        call: &ToolCall,
        cancel: &CancellationToken,
    ) -> String {
        let start = Instant::now();
        let result = match call.name.as_str() {
            MANAGE_SIMULATION => match ManageSimulationArgs::from_args(&call.args) {
                Ok(args) => session.apply_simulation(args.action).to_string(),
                Err(e) => error_result(e),
            },
            MANAGE_NODE => {
                let (store, active) = session.store_and_active_mut();
                match ManageNodeArgs::from_args(&call.args).and_then(|args| apply_manage_node(store, active, &args)) {
                    Ok(message) => message,
                    Err(e) => error_result(e),
                }
            }
            _ => self.execute_user_tool(session, index, call, cancel).await,
        };
        debug!(duration_ms = start.elapsed().as_millis(), "tool call finished");
        result
    }

    async fn execute_user_tool(
        &self,
        session: &Session,
        index: &ToolIndex,
        call: &ToolCall,
        cancel: &CancellationToken,
    ) -> String {
        let Some(node_id) = index.resolve(&call.name) else {
            warn!("model called an unknown tool");
            return error_result(format!("Unknown tool: {}", call.name));
        };
        let Some(config) = session.store().get(node_id.as_str()).and_then(Node::tool_config) else {
            return error_result(format!("Tool '{}' no longer exists", call.name));
        };
        let Some(code) = config.code.as_deref().filter(|c| !c.trim().is_empty()) else {
            return error_result(format!("Tool '{}' has no code to run", call.name));
        };

        let arguments = Value::Object(call.args.clone()).to_string();
        tokio::select! {
            biased;
            () = cancel.cancelled() => error_result("cancelled"),
            output = self.runners.run(config.language.as_deref(), code, &arguments) => output,
        }
    }
}

/// Driver configuration and temperature from the root node.
///
/// A root that is not an agent or router yields an empty model, which the
/// factory rejects.
fn driver_config(root: &Node, default_temperature: f64) -> (DriverConfig, f64) {
    match root.agent_config() {
        Some(config) => (
            DriverConfig::from_agent(config),
            config.temperature.unwrap_or(default_temperature),
        ),
        None => (DriverConfig::default(), default_temperature),
    }
}

/// Log a pre-dispatch fault into history the same way a stream failure is.
fn record_provider_error(session: &mut Session, error: ProviderError) -> RuntimeError {
    session.history_mut().push(ChatMessage::system(format!("Error: {error}")));
    RuntimeError::Provider(error)
}

fn drop_empty_model_message(session: &mut Session) {
    let history = session.history_mut();
    if history.last().is_some_and(|m| m.content.is_empty() && m.grounding.is_none()) {
        let _ = history.pop();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::nodes::{AgentConfig, NodeKind};

    #[test]
    fn root_temperature_overrides_default() {
        let root = Node::with_id(
            "root",
            "Root",
            None,
            NodeKind::Agent(AgentConfig {
                model: "m".into(),
                temperature: Some(0.2),
                ..Default::default()
            }),
        );
        let (driver, temperature) = driver_config(&root, 0.7);
        assert_eq!(driver.model, "m");
        assert!((temperature - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn non_agent_root_has_no_model() {
        let root = Node::with_id("root", "Root", None, NodeKind::System);
        let (driver, temperature) = driver_config(&root, 0.7);
        assert!(driver.model.is_empty());
        assert!((temperature - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn turn_input_text() {
        let input = TurnInput::text("hi");
        assert_eq!(input.prompt, "hi");
        assert!(input.image.is_none());
    }
}
