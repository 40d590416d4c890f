//! In-memory node tree.
//!
//! [`NodeStore`] keeps nodes in insertion order (the "store iteration order"
//! that traversal relies on) plus an id → position index. The tree invariants
//! hold for every value of this type:
//!
//! - exactly one node has no parent (the root)
//! - every other parent id resolves to a node in the store
//! - ids are unique
//! - there are no cycles
//!
//! Mutations check the invariants up front and leave the store untouched when
//! they would be violated. Deserialization goes through [`NodeStore::from_nodes`],
//! so a tree file that breaks an invariant is rejected at load time.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::NodeId;
use crate::nodes::{Node, NodePatch};

/// Errors raised by structural operations on a [`NodeStore`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No node has the given id.
    #[error("node not found: {0}")]
    NotFound(NodeId),
    /// A node with this id already exists.
    #[error("duplicate node id: {0}")]
    DuplicateId(NodeId),
    /// The tree has no root.
    #[error("tree has no root node")]
    MissingRoot,
    /// More than one node has no parent.
    #[error("tree has more than one root: {0} and {1}")]
    MultipleRoots(NodeId, NodeId),
    /// A node references a parent that does not exist.
    #[error("node {node} references unknown parent {parent}")]
    UnknownParent {
        /// Offending node.
        node: NodeId,
        /// Missing parent id.
        parent: NodeId,
    },
    /// The operation would make a node its own ancestor.
    #[error("moving {node} under {parent} would create a cycle")]
    Cycle {
        /// Node being moved.
        node: NodeId,
        /// Requested parent.
        parent: NodeId,
    },
    /// The root cannot be removed or given a parent.
    #[error("the root node cannot be removed or reparented")]
    RootImmutable,
    /// A non-root node must have a parent.
    #[error("node {0} has no parent")]
    MissingParent(NodeId),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Serialized form of a [`NodeStore`].
#[derive(Clone, Debug, Serialize, Deserialize)]
struct NodeSnapshot {
    nodes: Vec<Node>,
}

/// The in-memory tree of nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NodeSnapshot", into = "NodeSnapshot")]
pub struct NodeStore {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
}

impl TryFrom<NodeSnapshot> for NodeStore {
    type Error = StoreError;

    fn try_from(snapshot: NodeSnapshot) -> Result<Self, Self::Error> {
        Self::from_nodes(snapshot.nodes)
    }
}

impl From<NodeStore> for NodeSnapshot {
    fn from(store: NodeStore) -> Self {
        Self { nodes: store.nodes }
    }
}

impl NodeStore {
    /// Create a store holding only `root`.
    pub fn new(root: Node) -> StoreResult<Self> {
        Self::from_nodes(vec![root])
    }

    /// Build a store from nodes in iteration order, validating every invariant.
    pub fn from_nodes(nodes: Vec<Node>) -> StoreResult<Self> {
        let mut index = HashMap::with_capacity(nodes.len());
        let mut root: Option<&NodeId> = None;
        for (pos, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), pos).is_some() {
                return Err(StoreError::DuplicateId(node.id.clone()));
            }
            if node.parent_id.is_none() {
                if let Some(existing) = root {
                    return Err(StoreError::MultipleRoots(existing.clone(), node.id.clone()));
                }
                root = Some(&node.id);
            }
        }
        if root.is_none() {
            return Err(StoreError::MissingRoot);
        }
        for node in &nodes {
            if let Some(parent) = &node.parent_id {
                if !index.contains_key(parent) {
                    return Err(StoreError::UnknownParent {
                        node: node.id.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        let store = Self { nodes, index };
        // With a single root and resolvable parents, any node unreachable
        // from the root sits on a cycle.
        let reachable = store.iter_depth_first().len();
        if reachable != store.nodes.len() {
            let visited: HashSet<&NodeId> =
                store.iter_depth_first().into_iter().map(|n| &n.id).collect();
            if let Some(node) = store.nodes.iter().find(|n| !visited.contains(&n.id)) {
                return Err(StoreError::Cycle {
                    node: node.id.clone(),
                    parent: node.parent_id.clone().unwrap_or_else(|| node.id.clone()),
                });
            }
        }
        Ok(store)
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        // Invariant: exactly one node without a parent.
        self.nodes
            .iter()
            .find(|n| n.parent_id.is_none())
            .unwrap_or(&self.nodes[0])
    }

    /// The root node's id.
    #[must_use]
    pub fn root_id(&self) -> &NodeId {
        &self.root().id
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a store holds at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether a node with this id exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Look up a node.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&pos| &self.nodes[pos])
    }

    /// Nodes in store iteration order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Direct children of `id`, in store iteration order.
    pub fn children<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .iter()
            .filter(move |n| n.parent_id.as_ref().is_some_and(|p| p.as_str() == id))
    }

    /// Depth-first traversal from the root: a parent, then each child subtree
    /// in store iteration order.
    #[must_use]
    pub fn iter_depth_first(&self) -> Vec<&Node> {
        let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
        for (pos, node) in self.nodes.iter().enumerate() {
            if let Some(parent) = &node.parent_id {
                children.entry(parent.as_str()).or_default().push(pos);
            }
        }

        let mut out = Vec::with_capacity(self.nodes.len());
        let Some(root_pos) = self.nodes.iter().position(|n| n.parent_id.is_none()) else {
            return out;
        };
        let mut stack = vec![root_pos];
        while let Some(pos) = stack.pop() {
            let node = &self.nodes[pos];
            out.push(node);
            if let Some(kids) = children.get(node.id.as_str()) {
                stack.extend(kids.iter().rev());
            }
        }
        out
    }

    /// Ids of every node below `id` (excluding `id`).
    #[must_use]
    pub fn descendants(&self, id: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut frontier = vec![id.to_owned()];
        while let Some(current) = frontier.pop() {
            for child in self.children(&current) {
                out.push(child.id.clone());
                frontier.push(child.id.as_str().to_owned());
            }
        }
        out
    }

    /// Whether `ancestor` is `node` itself or lies on its parent chain.
    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: &str, node: &str) -> bool {
        let mut current = self.get(node);
        while let Some(n) = current {
            if n.id.as_str() == ancestor {
                return true;
            }
            current = n.parent_id.as_ref().and_then(|p| self.get(p));
        }
        false
    }

    /// First node whose display name equals `name`.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Add a non-root node under an existing parent.
    pub fn insert(&mut self, node: Node) -> StoreResult<&Node> {
        if self.index.contains_key(&node.id) {
            return Err(StoreError::DuplicateId(node.id));
        }
        let Some(parent) = &node.parent_id else {
            return Err(StoreError::MissingParent(node.id));
        };
        if !self.index.contains_key(parent) {
            return Err(StoreError::UnknownParent {
                node: node.id.clone(),
                parent: parent.clone(),
            });
        }
        let pos = self.nodes.len();
        let _ = self.index.insert(node.id.clone(), pos);
        self.nodes.push(node);
        Ok(&self.nodes[pos])
    }

    /// Apply a field patch to an existing node.
    pub fn update(&mut self, id: &str, patch: &NodePatch) -> StoreResult<&Node> {
        let pos = *self
            .index
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.into()))?;
        self.nodes[pos].apply_patch(patch);
        Ok(&self.nodes[pos])
    }

    /// Move a node under a new parent.
    ///
    /// Rejects moving the root and any move that would make a node its own
    /// ancestor.
    pub fn reparent(&mut self, id: &str, new_parent: &str) -> StoreResult<()> {
        let pos = *self
            .index
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.into()))?;
        if self.nodes[pos].parent_id.is_none() {
            return Err(StoreError::RootImmutable);
        }
        if !self.index.contains_key(new_parent) {
            return Err(StoreError::UnknownParent {
                node: id.into(),
                parent: new_parent.into(),
            });
        }
        if self.is_ancestor_or_self(id, new_parent) {
            return Err(StoreError::Cycle {
                node: id.into(),
                parent: new_parent.into(),
            });
        }
        self.nodes[pos].parent_id = Some(new_parent.into());
        Ok(())
    }

    /// Remove a node and its whole subtree; returns the removed ids.
    pub fn remove(&mut self, id: &str) -> StoreResult<Vec<NodeId>> {
        let node = self.get(id).ok_or_else(|| StoreError::NotFound(id.into()))?;
        if node.is_root() {
            return Err(StoreError::RootImmutable);
        }
        let mut removed = vec![node.id.clone()];
        removed.extend(self.descendants(id));

        let doomed: HashSet<&str> = removed.iter().map(NodeId::as_str).collect();
        self.nodes.retain(|n| !doomed.contains(n.id.as_str()));
        self.reindex();
        Ok(removed)
    }

    fn reindex(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(pos, n)| (n.id.clone(), pos))
            .collect();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{AgentConfig, NodeKind, NodeType, ToolConfig, ToolKind};
    use assert_matches::assert_matches;

    fn root() -> Node {
        Node::with_id("root", "Root", None, NodeKind::Agent(AgentConfig::default()))
    }

    fn child(id: &str, parent: &str, kind: NodeKind) -> Node {
        Node::with_id(id, id.to_uppercase(), Some(parent.into()), kind)
    }

    fn sample() -> NodeStore {
        NodeStore::from_nodes(vec![
            root(),
            child("a", "root", NodeKind::System),
            child("b", "root", NodeKind::Memory { content: "mem".into() }),
            child("a1", "a", NodeKind::Tool(ToolConfig::default())),
            child("a2", "a", NodeKind::empty(NodeType::Router)),
        ])
        .unwrap()
    }

    fn ids(nodes: &[&Node]) -> Vec<String> {
        nodes.iter().map(|n| n.id.to_string()).collect()
    }

    // ── Construction ─────────────────────────────────────────────────

    #[test]
    fn new_store_has_root() {
        let store = NodeStore::new(root()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.root_id().as_str(), "root");
        assert!(!store.is_empty());
    }

    #[test]
    fn rejects_missing_root() {
        let err = NodeStore::from_nodes(vec![child("a", "b", NodeKind::System)]).unwrap_err();
        assert_eq!(err, StoreError::MissingRoot);
    }

    #[test]
    fn rejects_two_roots() {
        let second = Node::with_id("r2", "R2", None, NodeKind::System);
        let err = NodeStore::from_nodes(vec![root(), second]).unwrap_err();
        assert_matches!(err, StoreError::MultipleRoots(_, _));
    }

    #[test]
    fn rejects_unknown_parent() {
        let err = NodeStore::from_nodes(vec![root(), child("a", "ghost", NodeKind::System)])
            .unwrap_err();
        assert_matches!(err, StoreError::UnknownParent { .. });
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = NodeStore::from_nodes(vec![
            root(),
            child("a", "root", NodeKind::System),
            child("a", "root", NodeKind::System),
        ])
        .unwrap_err();
        assert_eq!(err, StoreError::DuplicateId("a".into()));
    }

    #[test]
    fn rejects_detached_cycle() {
        let err = NodeStore::from_nodes(vec![
            root(),
            child("x", "y", NodeKind::System),
            child("y", "x", NodeKind::System),
        ])
        .unwrap_err();
        assert_matches!(err, StoreError::Cycle { .. });
    }

    // ── Traversal ────────────────────────────────────────────────────

    #[test]
    fn depth_first_is_parent_then_children_in_store_order() {
        let store = sample();
        assert_eq!(ids(&store.iter_depth_first()), vec!["root", "a", "a1", "a2", "b"]);
    }

    #[test]
    fn children_in_store_order() {
        let store = sample();
        let kids: Vec<&str> = store.children("a").map(|n| n.id.as_str()).collect();
        assert_eq!(kids, vec!["a1", "a2"]);
    }

    #[test]
    fn descendants_cover_subtree() {
        let store = sample();
        let mut desc: Vec<String> = store.descendants("root").into_iter().map(|id| id.to_string()).collect();
        desc.sort();
        assert_eq!(desc, vec!["a", "a1", "a2", "b"]);
    }

    // ── Mutation ─────────────────────────────────────────────────────

    #[test]
    fn insert_requires_existing_parent() {
        let mut store = sample();
        let err = store.insert(child("z", "nope", NodeKind::System)).unwrap_err();
        assert_matches!(err, StoreError::UnknownParent { .. });
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn insert_rejects_second_root() {
        let mut store = sample();
        let err = store
            .insert(Node::with_id("r2", "R2", None, NodeKind::System))
            .unwrap_err();
        assert_matches!(err, StoreError::MissingParent(_));
    }

    #[test]
    fn insert_appends_in_order() {
        let mut store = sample();
        let _ = store.insert(child("b1", "b", NodeKind::System)).unwrap();
        assert_eq!(ids(&store.iter_depth_first()), vec!["root", "a", "a1", "a2", "b", "b1"]);
    }

    #[test]
    fn reparent_rejects_descendant_target() {
        let mut store = sample();
        let err = store.reparent("a", "a1").unwrap_err();
        assert_matches!(err, StoreError::Cycle { .. });
        let err = store.reparent("a", "a").unwrap_err();
        assert_matches!(err, StoreError::Cycle { .. });
    }

    #[test]
    fn reparent_rejects_root() {
        let mut store = sample();
        assert_eq!(store.reparent("root", "a").unwrap_err(), StoreError::RootImmutable);
    }

    #[test]
    fn reparent_moves_subtree() {
        let mut store = sample();
        store.reparent("a", "b").unwrap();
        assert_eq!(ids(&store.iter_depth_first()), vec!["root", "b", "a", "a1", "a2"]);
    }

    #[test]
    fn remove_deletes_subtree() {
        let mut store = sample();
        let removed = store.remove("a").unwrap();
        assert_eq!(removed.len(), 3);
        assert!(!store.contains("a1"));
        assert!(store.get("b").is_some());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn remove_root_is_rejected() {
        let mut store = sample();
        assert_eq!(store.remove("root").unwrap_err(), StoreError::RootImmutable);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn remove_unknown_is_not_found() {
        let mut store = sample();
        assert_matches!(store.remove("nope"), Err(StoreError::NotFound(_)));
    }

    #[test]
    fn update_applies_patch() {
        let mut store = sample();
        let node = store
            .update(
                "b",
                &NodePatch {
                    content: Some("changed".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(node.kind, NodeKind::Memory { content: "changed".into() });
    }

    #[test]
    fn clone_is_independent() {
        let live = sample();
        let mut fork = live.clone();
        let _ = fork.remove("b").unwrap();
        assert!(live.contains("b"));
        assert!(!fork.contains("b"));
    }

    // ── Serialization ────────────────────────────────────────────────

    #[test]
    fn serde_roundtrip_preserves_structure() {
        let store = sample();
        let json = serde_json::to_string(&store).unwrap();
        let back: NodeStore = serde_json::from_str(&json).unwrap();
        assert_eq!(back, store);
        assert_eq!(ids(&back.iter_depth_first()), ids(&store.iter_depth_first()));
    }

    #[test]
    fn deserialize_rejects_invalid_tree() {
        let json = r#"{"nodes":[{"id":"a","name":"A","parentId":"b","type":"system"}]}"#;
        assert!(serde_json::from_str::<NodeStore>(json).is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_kind() -> impl Strategy<Value = NodeKind> {
            prop_oneof![
                Just(NodeKind::System),
                "[a-z ]{0,12}".prop_map(|content| NodeKind::Memory { content }),
                ("[a-z-]{0,10}", proptest::option::of(0.0f64..2.0)).prop_map(|(model, temperature)| {
                    NodeKind::Agent(AgentConfig {
                        model,
                        temperature,
                        ..Default::default()
                    })
                }),
                (any::<bool>(), proptest::option::of("[a-z]{1,8}")).prop_map(|(search, code)| {
                    NodeKind::Tool(ToolConfig {
                        tool_kind: if search { ToolKind::Search } else { ToolKind::Function },
                        code,
                        ..Default::default()
                    })
                }),
            ]
        }

        /// Random trees: node `i` picks a parent among nodes `0..i`.
        fn arb_store() -> impl Strategy<Value = NodeStore> {
            proptest::collection::vec((any::<prop::sample::Index>(), arb_kind(), "[A-Za-z ]{1,10}"), 0..24)
                .prop_map(|specs| {
                    let mut nodes = vec![root()];
                    for (i, (parent_idx, kind, name)) in specs.into_iter().enumerate() {
                        let parent = nodes[parent_idx.index(nodes.len())].id.clone();
                        nodes.push(Node::with_id(format!("n{i}"), name, Some(parent), kind));
                    }
                    NodeStore::from_nodes(nodes).unwrap()
                })
        }

        proptest! {
            #[test]
            fn serde_roundtrip(store in arb_store()) {
                let json = serde_json::to_string(&store).unwrap();
                let back: NodeStore = serde_json::from_str(&json).unwrap();
                prop_assert_eq!(&back, &store);
                for node in store.iter() {
                    prop_assert_eq!(back.get(node.id.as_str()), Some(node));
                }
            }

            #[test]
            fn traversal_visits_every_node_once(store in arb_store()) {
                let visited = store.iter_depth_first();
                prop_assert_eq!(visited.len(), store.len());
                let unique: HashSet<&NodeId> = visited.iter().map(|n| &n.id).collect();
                prop_assert_eq!(unique.len(), store.len());
            }
        }
    }
}
