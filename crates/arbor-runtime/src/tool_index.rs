//! Sanitized-name lookup of callable tool nodes.

use std::collections::HashMap;

use tracing::warn;

use arbor_core::ids::NodeId;
use arbor_core::nodes::ToolKind;
use arbor_core::store::NodeStore;

use crate::active_set::ActiveSet;

/// Maps callable names to tool nodes, built from the visible tree.
///
/// When several nodes sanitize to the same name, the first in traversal
/// order wins and the collision is logged.
#[derive(Clone, Debug, Default)]
pub struct ToolIndex {
    by_name: HashMap<String, NodeId>,
}

impl ToolIndex {
    /// Index the visible non-search tool nodes of `store`.
    #[must_use]
    pub fn build(store: &NodeStore, active: &ActiveSet) -> Self {
        let mut by_name = HashMap::new();
        for node in active.visible(store) {
            let Some(cfg) = node.tool_config() else {
                continue;
            };
            if cfg.tool_kind == ToolKind::Search {
                continue;
            }
            let name = node.tool_name();
            if let Some(existing) = by_name.get(&name) {
                warn!(tool_name = %name, kept = %existing, shadowed = %node.id, "tool name collision");
                continue;
            }
            let _ = by_name.insert(name, node.id.clone());
        }
        Self { by_name }
    }

    /// Node registered under `name`.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&NodeId> {
        self.by_name.get(name)
    }

    /// Number of callable names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether nothing is callable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
