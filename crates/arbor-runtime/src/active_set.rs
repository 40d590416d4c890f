//! The set of nodes visible to the model for a turn.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use arbor_core::ids::NodeId;
use arbor_core::nodes::Node;
use arbor_core::store::NodeStore;

/// Node ids visible to the context assembler.
///
/// The root is always visible, whether or not it is listed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActiveSet {
    /// Every node is visible.
    #[default]
    All,
    /// Only the listed nodes (plus the root).
    Only(BTreeSet<NodeId>),
}

impl ActiveSet {
    /// An active set holding exactly these ids.
    pub fn only(ids: impl IntoIterator<Item = NodeId>) -> Self {
        Self::Only(ids.into_iter().collect())
    }

    /// Whether `node` is visible.
    #[must_use]
    pub fn contains(&self, node: &Node) -> bool {
        match self {
            Self::All => true,
            Self::Only(ids) => node.is_root() || ids.contains(&node.id),
        }
    }

    /// Make a node visible. No effect on [`ActiveSet::All`].
    pub fn insert(&mut self, id: NodeId) {
        if let Self::Only(ids) = self {
            let _ = ids.insert(id);
        }
    }

    /// Hide the given nodes.
    pub fn remove_all<'a>(&mut self, removed: impl IntoIterator<Item = &'a NodeId>) {
        if let Self::Only(ids) = self {
            for id in removed {
                let _ = ids.remove(id);
            }
        }
    }

    /// Drop ids that no longer resolve in `store`.
    pub fn retain_existing(&mut self, store: &NodeStore) {
        if let Self::Only(ids) = self {
            ids.retain(|id| store.contains(id.as_str()));
        }
    }

    /// Visible nodes of `store` in depth-first order.
    pub fn visible<'a>(&self, store: &'a NodeStore) -> Vec<&'a Node> {
        store
            .iter_depth_first()
            .into_iter()
            .filter(|node| self.contains(node))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::nodes::NodeKind;

    fn store() -> NodeStore {
        let mut store = NodeStore::new(Node::with_id("root", "Root", None, NodeKind::System)).unwrap();
        let _ = store
            .insert(Node::with_id("a", "A", Some("root".into()), NodeKind::System))
            .unwrap();
        let _ = store
            .insert(Node::with_id("b", "B", Some("a".into()), NodeKind::System))
            .unwrap();
        store
    }

    #[test]
    fn root_always_visible() {
        let s = store();
        let set = ActiveSet::only([]);
        let names: Vec<&str> = set.visible(&s).iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Root"]);
    }

    #[test]
    fn all_sees_everything() {
        assert_eq!(ActiveSet::All.visible(&store()).len(), 3);
    }

    #[test]
    fn insert_and_remove() {
        let s = store();
        let mut set = ActiveSet::only([NodeId::from("a")]);
        set.insert(NodeId::from("b"));
        assert_eq!(set.visible(&s).len(), 3);
        set.remove_all(&[NodeId::from("a")]);
        let names: Vec<&str> = set.visible(&s).iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Root", "B"]);
    }

    #[test]
    fn insert_on_all_is_noop() {
        let mut set = ActiveSet::All;
        set.insert(NodeId::from("x"));
        assert_eq!(set, ActiveSet::All);
    }

    #[test]
    fn retain_existing_prunes_dangling() {
        let mut set = ActiveSet::only([NodeId::from("a"), NodeId::from("gone")]);
        set.retain_existing(&store());
        assert_eq!(set, ActiveSet::only([NodeId::from("a")]));
    }
}
