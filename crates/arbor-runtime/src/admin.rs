//! # Administrative Tools
//!
//! Two built-in tools are always in the catalog:
//!
//! - `manage_node{action: create|update|delete, nodeId?, parentId?, type?, name?, content?, code?, language?}`
//! - `manage_simulation{action: start|commit|abort, reason?}`
//!
//! `manage_node` mutates whichever store the turn is working on (the fork
//! while a simulation is active). Every failure is an [`AdminError`] that the
//! loop turns into a tool result, so the model can react to it.

use std::str::FromStr;

use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use arbor_core::ids::NodeId;
use arbor_core::nodes::{Node, NodeKind, NodePatch, NodeType, ToolKind};
use arbor_core::store::NodeStore;
use arbor_core::tools::ToolDeclaration;

use crate::active_set::ActiveSet;
use crate::errors::AdminError;

/// Name of the node-mutation tool.
pub const MANAGE_NODE: &str = "manage_node";
/// Name of the simulation-control tool.
pub const MANAGE_SIMULATION: &str = "manage_simulation";

/// Whether `name` is one of the built-in tools.
#[must_use]
pub fn is_admin_tool(name: &str) -> bool {
    name == MANAGE_NODE || name == MANAGE_SIMULATION
}

/// Catalog entry for `manage_node`.
#[must_use]
pub fn manage_node_declaration() -> ToolDeclaration {
    ToolDeclaration::Function {
        name: MANAGE_NODE.into(),
        description: "Create, update, or delete a node in the agent tree. \
                      Create needs type and name (parentId defaults to the root). \
                      Update and delete need nodeId; parentId on update moves the node. \
                      Deleting a node deletes its subtree."
            .into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "action": {"type": "string", "enum": ["create", "update", "delete"]},
                "nodeId": {"type": "string", "description": "Target node id (update, delete)"},
                "parentId": {"type": "string", "description": "Parent node id (create, move on update)"},
                "type": {"type": "string", "enum": ["agent", "router", "tool", "memory", "system"]},
                "name": {"type": "string"},
                "content": {"type": "string", "description": "Instruction, memory text, or tool description"},
                "code": {"type": "string", "description": "Tool source code"},
                "language": {"type": "string", "description": "Tool source language"}
            },
            "required": ["action"]
        }),
    }
}

/// Catalog entry for `manage_simulation`.
#[must_use]
pub fn manage_simulation_declaration() -> ToolDeclaration {
    ToolDeclaration::Function {
        name: MANAGE_SIMULATION.into(),
        description: "Stage tree changes in a sandbox. start forks the tree; \
                      later manage_node calls change only the fork until commit \
                      applies them or abort discards them."
            .into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "action": {"type": "string", "enum": ["start", "commit", "abort"]},
                "reason": {"type": "string"}
            },
            "required": ["action"]
        }),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// manage_node
// ─────────────────────────────────────────────────────────────────────────────

/// `manage_node` action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeAction {
    /// Insert a node.
    Create,
    /// Patch a node.
    Update,
    /// Remove a node and its subtree.
    Delete,
}

/// Parsed `manage_node` arguments.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManageNodeArgs {
    /// What to do.
    pub action: NodeAction,
    /// Target of update/delete.
    #[serde(default)]
    pub node_id: Option<String>,
    /// Parent for create; new parent on update.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Type for create.
    #[serde(default, rename = "type")]
    pub node_type: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Instruction, memory text, or tool description.
    #[serde(default)]
    pub content: Option<String>,
    /// Tool source code.
    #[serde(default)]
    pub code: Option<String>,
    /// Tool language.
    #[serde(default)]
    pub language: Option<String>,
}

impl ManageNodeArgs {
    /// Parse from a tool call's argument object.
    pub fn from_args(args: &Map<String, Value>) -> Result<Self, AdminError> {
        serde_json::from_value(Value::Object(args.clone()))
            .map_err(|e| AdminError::InvalidArguments(format!("invalid manage_node arguments: {e}")))
    }

    fn patch(&self) -> NodePatch {
        NodePatch {
            name: self.name.clone(),
            content: self.content.clone(),
            code: self.code.clone(),
            language: self.language.clone(),
        }
    }

    fn target(&self) -> Result<&str, AdminError> {
        self.node_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AdminError::InvalidArguments("nodeId is required".into()))
    }
}

/// Apply a `manage_node` call to `store`, keeping `active` in step.
///
/// Returns the text reported back to the model.
pub fn apply_manage_node(
    store: &mut NodeStore,
    active: &mut ActiveSet,
    args: &ManageNodeArgs,
) -> Result<String, AdminError> {
    match args.action {
        NodeAction::Create => create_node(store, active, args),
        NodeAction::Update => {
            let id = args.target()?;
            let patch = args.patch();
            let new_parent = args.parent_id.as_deref().filter(|p| !p.is_empty());
            if patch.is_empty() && new_parent.is_none() {
                return Err(AdminError::InvalidArguments("update needs at least one field".into()));
            }
            if let Some(parent) = new_parent {
                store.reparent(id, parent)?;
            }
            let node = store.update(id, &patch)?;
            info!(node_id = %node.id, "node updated");
            Ok(format!("Updated {} node '{}' ({})", node.node_type(), node.name, node.id))
        }
        NodeAction::Delete => {
            let id = args.target()?;
            let removed = store.remove(id)?;
            active.remove_all(&removed);
            info!(node_id = id, removed = removed.len(), "node deleted");
            Ok(format!("Deleted node {id} and {} descendant(s)", removed.len() - 1))
        }
    }
}

fn create_node(
    store: &mut NodeStore,
    active: &mut ActiveSet,
    args: &ManageNodeArgs,
) -> Result<String, AdminError> {
    let node_type = args
        .node_type
        .as_deref()
        .ok_or_else(|| AdminError::InvalidArguments("type is required for create".into()))
        .and_then(|t| NodeType::from_str(t).map_err(AdminError::InvalidArguments))?;
    let parent = match args.parent_id.as_deref().filter(|p| !p.is_empty()) {
        Some(p) => NodeId::from(p),
        None => store.root_id().clone(),
    };
    let name = args
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("New {node_type}"));

    let mut kind = NodeKind::empty(node_type);
    if let NodeKind::Tool(cfg) = &mut kind {
        cfg.tool_kind = ToolKind::Function;
    }
    let mut node = Node::new(name, Some(parent), kind);
    node.apply_patch(&args.patch());
    let id = node.id.clone();

    let node = store.insert(node)?;
    active.insert(id.clone());
    debug!(node_id = %id, node_type = %node_type, "node created");
    Ok(format!("Created {node_type} node '{}' with id {id}", node.name))
}

// ─────────────────────────────────────────────────────────────────────────────
// manage_simulation
// ─────────────────────────────────────────────────────────────────────────────

/// `manage_simulation` action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationAction {
    /// Fork the tree.
    Start,
    /// Apply the fork.
    Commit,
    /// Discard the fork.
    Abort,
}

/// Parsed `manage_simulation` arguments.
#[derive(Clone, Debug, Deserialize)]
pub struct ManageSimulationArgs {
    /// What to do.
    pub action: SimulationAction,
    /// Free-text reason, logged only.
    #[serde(default)]
    pub reason: Option<String>,
}

impl ManageSimulationArgs {
    /// Parse from a tool call's argument object.
    pub fn from_args(args: &Map<String, Value>) -> Result<Self, AdminError> {
        serde_json::from_value(Value::Object(args.clone())).map_err(|e| {
            AdminError::InvalidArguments(format!("invalid manage_simulation arguments: {e}"))
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
