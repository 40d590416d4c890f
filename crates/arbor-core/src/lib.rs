//! # arbor-core
//!
//! Foundation types shared by every arbor crate:
//!
//! - **Branded IDs**: `NodeId`, `MessageId` as newtypes for type safety
//! - **Nodes**: the typed agent/tool/memory/router/system tree and its [`NodeStore`]
//! - **Messages**: `ChatMessage` with roles, tool-call requests and tool results
//! - **Stream events**: the provider-agnostic `StreamEvent` protocol
//! - **Tool declarations**: the catalog entries sent to a provider
//! - **Logging**: `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod events;
pub mod ids;
pub mod logging;
pub mod messages;
pub mod nodes;
pub mod store;
pub mod text;
pub mod tools;

pub use events::StreamEvent;
pub use ids::{MessageId, NodeId};
pub use messages::{ChatMessage, Role, ToolCall, ToolResponse};
pub use nodes::{Node, NodeKind, NodePatch, NodeType, ToolKind};
pub use store::{NodeStore, StoreError};
pub use tools::ToolDeclaration;
