//! # arbor-runtime
//!
//! Turn orchestration over a node tree.
//!
//! A turn appends the user prompt, assembles the system instruction and tool
//! catalog from the visible tree, streams one round from the driver chosen
//! by the root node, and executes any requested tool calls before streaming
//! again. Tool results are appended in request order.
//!
//! - [`Session`]: live tree, simulation fork, active set and history
//! - [`Orchestrator`]: the round loop, bounded by `max_tool_rounds`
//! - [`assembler`]: instruction blocks and tool catalog
//! - [`admin`]: the built-in `manage_node` and `manage_simulation` tools
//! - [`runner`]: the boundary to external tool execution
//! - [`TurnObserver`]: progress callbacks for front ends

#![deny(unsafe_code)]

pub mod active_set;
pub mod admin;
pub mod assembler;
pub mod errors;
pub mod observer;
pub mod orchestrator;
pub mod runner;
pub mod session;
pub mod simulation;
pub mod stream_processor;
pub mod tool_index;

pub use active_set::ActiveSet;
pub use errors::{AdminError, RunnerError, RuntimeError};
pub use observer::{NoopObserver, TurnObserver};
pub use orchestrator::{Orchestrator, TurnInput, TurnSummary};
pub use runner::{RunnerSet, ToolRunner};
pub use session::Session;
pub use simulation::{SimulationManager, SimulationOutcome};
