//! Node types for the agent tree.
//!
//! A [`Node`] is one typed unit of the user's tree: an agent or router that
//! carries model configuration, a tool that the model can call, a memory
//! holding free text, or a plain system grouping node. Type-specific fields
//! live in [`NodeKind`], which serializes internally tagged by `type` so a
//! node reads naturally in a tree file:
//!
//! ```json
//! { "id": "t1", "name": "Get Time", "parentId": "root",
//!   "type": "tool", "toolKind": "function", "code": "...", "language": "javascript" }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ids::NodeId;

// ─────────────────────────────────────────────────────────────────────────────
// Type-specific configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Model configuration shared by agent and router nodes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    /// Provider identifier (`google`, `openai`, `openrouter`, ...). Absent means native.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Model identifier sent to the backend.
    #[serde(default)]
    pub model: String,
    /// Free-text instruction contributed to the system prompt.
    #[serde(default)]
    pub instruction: String,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Bearer credential for the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL override for the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// What a tool node does when called.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    /// Provider-native web search.
    Search,
    /// Call to an external HTTP API, implemented by the tool's code.
    ExternalApi,
    /// Arbitrary user function.
    #[default]
    Function,
}

/// Configuration of a tool node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    /// Tool kind.
    #[serde(default)]
    pub tool_kind: ToolKind,
    /// Source code run by the external tool runner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Source language (`javascript`, `python`, ...). Absent means the default language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Free-text description shown to the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Type-specific payload of a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    /// Conversational agent.
    Agent(AgentConfig),
    /// Router agent; assembled exactly like an agent.
    Router(AgentConfig),
    /// Callable tool.
    Tool(ToolConfig),
    /// Free-text memory.
    Memory {
        /// Memory content.
        #[serde(default)]
        content: String,
    },
    /// Grouping node without payload.
    System,
}

impl NodeKind {
    /// The payload-free type tag.
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Agent(_) => NodeType::Agent,
            Self::Router(_) => NodeType::Router,
            Self::Tool(_) => NodeType::Tool,
            Self::Memory { .. } => NodeType::Memory,
            Self::System => NodeType::System,
        }
    }

    /// An empty payload of the given type.
    #[must_use]
    pub fn empty(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Agent => Self::Agent(AgentConfig::default()),
            NodeType::Router => Self::Router(AgentConfig::default()),
            NodeType::Tool => Self::Tool(ToolConfig::default()),
            NodeType::Memory => Self::Memory {
                content: String::new(),
            },
            NodeType::System => Self::System,
        }
    }
}

/// Node type tag without payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Agent node.
    Agent,
    /// Router node.
    Router,
    /// Tool node.
    Tool,
    /// Memory node.
    Memory,
    /// System node.
    System,
}

impl NodeType {
    /// Lowercase wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Router => "router",
            Self::Tool => "tool",
            Self::Memory => "memory",
            Self::System => "system",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "agent" => Ok(Self::Agent),
            "router" => Ok(Self::Router),
            "tool" => Ok(Self::Tool),
            "memory" => Ok(Self::Memory),
            "system" => Ok(Self::System),
            other => Err(format!("unknown node type: {other}")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node
// ─────────────────────────────────────────────────────────────────────────────

/// A typed unit of the agent tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique identifier.
    pub id: NodeId,
    /// Display name.
    pub name: String,
    /// Parent node; `None` only for the root.
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    /// Type-specific payload.
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// Field changes applied by an update; `None` leaves a field untouched.
///
/// `content` is interpreted per node type: the instruction of an agent or
/// router, the text of a memory, the description of a tool.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodePatch {
    /// New display name.
    pub name: Option<String>,
    /// New content (see type mapping above).
    pub content: Option<String>,
    /// New tool source code.
    pub code: Option<String>,
    /// New tool language.
    pub language: Option<String>,
}

impl NodePatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.content.is_none() && self.code.is_none() && self.language.is_none()
    }
}

impl Node {
    /// Create a node with a fresh ID.
    #[must_use]
    pub fn new(name: impl Into<String>, parent_id: Option<NodeId>, kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            parent_id,
            kind,
        }
    }

    /// Create a node with an explicit ID.
    #[must_use]
    pub fn with_id(
        id: impl Into<NodeId>,
        name: impl Into<String>,
        parent_id: Option<NodeId>,
        kind: NodeKind,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id,
            kind,
        }
    }

    /// The node's type tag.
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    /// Whether this node is the tree root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Model configuration, for agent and router nodes.
    #[must_use]
    pub fn agent_config(&self) -> Option<&AgentConfig> {
        match &self.kind {
            NodeKind::Agent(cfg) | NodeKind::Router(cfg) => Some(cfg),
            _ => None,
        }
    }

    /// Tool configuration, for tool nodes.
    #[must_use]
    pub fn tool_config(&self) -> Option<&ToolConfig> {
        match &self.kind {
            NodeKind::Tool(cfg) => Some(cfg),
            _ => None,
        }
    }

    /// Name under which this node is exposed as a callable tool.
    #[must_use]
    pub fn tool_name(&self) -> String {
        sanitize_tool_name(&self.name)
    }

    /// Apply a patch in place.
    pub fn apply_patch(&mut self, patch: &NodePatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        match &mut self.kind {
            NodeKind::Agent(cfg) | NodeKind::Router(cfg) => {
                if let Some(content) = &patch.content {
                    cfg.instruction.clone_from(content);
                }
            }
            NodeKind::Memory { content } => {
                if let Some(new_content) = &patch.content {
                    content.clone_from(new_content);
                }
            }
            NodeKind::Tool(cfg) => {
                if let Some(content) = &patch.content {
                    cfg.description = Some(content.clone());
                }
                if let Some(code) = &patch.code {
                    cfg.code = Some(code.clone());
                }
                if let Some(language) = &patch.language {
                    cfg.language = Some(language.clone());
                }
            }
            NodeKind::System => {}
        }
    }
}

/// Turn a display name into a callable tool name.
///
/// Whitespace runs become a single underscore, then every character that is
/// not ASCII alphanumeric or `_` is dropped. Distinct display names can map to
/// the same tool name; callers resolve collisions with first-match-wins.
#[must_use]
pub fn sanitize_tool_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        }
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
