//! # Context Assembler
//!
//! Projects the visible part of the node tree into a system instruction and
//! a tool catalog.
//!
//! Traversal is depth-first from the root in store iteration order. Each
//! visible node contributes one labeled block:
//!
//! | node          | block                          | catalog entry                 |
//! |---------------|--------------------------------|-------------------------------|
//! | agent         | `[AGENT: name]` + instruction  | none                          |
//! | router        | `[ROUTER: name]` + instruction | none                          |
//! | memory        | `[MEMORY: name]` + content     | none                          |
//! | tool (search) | `[TOOL: name]`                 | search (once per catalog)     |
//! | tool (other)  | `[TOOL: name]` + callable name | function taking `payload`     |
//! | system        | `[SYSTEM: name]`               | none                          |
//!
//! The two administrative tools always follow, each with its own block.
//! Tool names are sanitized display names; two nodes that sanitize to the
//! same name both stay in the catalog.

use serde_json::json;

use arbor_core::ids::NodeId;
use arbor_core::nodes::{Node, NodeKind, ToolConfig, ToolKind};
use arbor_core::store::NodeStore;
use arbor_core::tools::ToolDeclaration;

use crate::active_set::ActiveSet;
use crate::admin::{MANAGE_NODE, MANAGE_SIMULATION, manage_node_declaration, manage_simulation_declaration};

/// One labeled section of the system instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextBlock {
    /// Contributing node; `None` for the built-in tool blocks.
    pub node_id: Option<NodeId>,
    /// Block text, label line first.
    pub text: String,
}

/// Output of [`assemble`].
#[derive(Clone, Debug, PartialEq)]
pub struct AssembledContext {
    /// Blocks in traversal order, built-ins last.
    pub blocks: Vec<ContextBlock>,
    /// Tool catalog, built-ins last.
    pub tools: Vec<ToolDeclaration>,
}

impl AssembledContext {
    /// The system instruction: all blocks separated by blank lines.
    #[must_use]
    pub fn instruction(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Assemble the instruction and catalog for the visible nodes of `store`.
#[must_use]
pub fn assemble(store: &NodeStore, active: &ActiveSet) -> AssembledContext {
    let mut blocks = Vec::new();
    let mut tools = Vec::new();
    let mut has_search = false;

    for node in active.visible(store) {
        blocks.push(ContextBlock {
            node_id: Some(node.id.clone()),
            text: node_block(node),
        });
        if let NodeKind::Tool(cfg) = &node.kind {
            if cfg.tool_kind == ToolKind::Search {
                if !has_search {
                    has_search = true;
                    tools.push(ToolDeclaration::Search);
                }
            } else {
                tools.push(function_declaration(node, cfg));
            }
        }
    }

    for (name, decl) in [
        (MANAGE_NODE, manage_node_declaration()),
        (MANAGE_SIMULATION, manage_simulation_declaration()),
    ] {
        let description = match &decl {
            ToolDeclaration::Function { description, .. } => description.as_str(),
            ToolDeclaration::Search => "",
        };
        blocks.push(ContextBlock {
            node_id: None,
            text: format!("[BUILT-IN TOOL: {name}]\n{description}"),
        });
        tools.push(decl);
    }

    AssembledContext { blocks, tools }
}

fn node_block(node: &Node) -> String {
    match &node.kind {
        NodeKind::Agent(cfg) => labeled("AGENT", &node.name, &cfg.instruction),
        NodeKind::Router(cfg) => labeled("ROUTER", &node.name, &cfg.instruction),
        NodeKind::Memory { content } => labeled("MEMORY", &node.name, content),
        NodeKind::Tool(cfg) => {
            let body = match cfg.tool_kind {
                ToolKind::Search => "Native web search.".to_owned(),
                ToolKind::ExternalApi | ToolKind::Function => {
                    let mut body = format!("Callable as `{}`.", node.tool_name());
                    if let Some(desc) = cfg.description.as_deref().filter(|d| !d.is_empty()) {
                        body.push(' ');
                        body.push_str(desc);
                    }
                    body
                }
            };
            labeled("TOOL", &node.name, &body)
        }
        NodeKind::System => labeled("SYSTEM", &node.name, ""),
    }
}

fn labeled(label: &str, name: &str, body: &str) -> String {
    if body.is_empty() {
        format!("[{label}: {name}]")
    } else {
        format!("[{label}: {name}]\n{body}")
    }
}

fn function_declaration(node: &Node, cfg: &ToolConfig) -> ToolDeclaration {
    let description = cfg
        .description
        .clone()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| format!("Runs the '{}' tool.", node.name));
    ToolDeclaration::Function {
        name: node.tool_name(),
        description,
        parameters: json!({
            "type": "object",
            "properties": {
                "payload": {
                    "type": "string",
                    "description": "Free-form input passed to the tool"
                }
            }
        }),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::nodes::AgentConfig;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn agent(instruction: &str) -> NodeKind {
        NodeKind::Agent(AgentConfig {
            instruction: instruction.into(),
            ..Default::default()
        })
    }

    fn tool(kind: ToolKind) -> NodeKind {
        NodeKind::Tool(ToolConfig {
            tool_kind: kind,
            ..Default::default()
        })
    }

    fn sample() -> NodeStore {
        let mut s = NodeStore::new(Node::with_id("root", "Root", None, agent("You coordinate."))).unwrap();
        for node in [
            Node::with_id("t1", "Get Time", Some("root".into()), tool(ToolKind::Function)),
            Node::with_id("m1", "Facts", Some("root".into()), NodeKind::Memory { content: "Paris is in France.".into() }),
            Node::with_id("s1", "Web", Some("t1".into()), tool(ToolKind::Search)),
            Node::with_id("s2", "Web 2", Some("root".into()), tool(ToolKind::Search)),
        ] {
            let _ = s.insert(node).unwrap();
        }
        s
    }

    #[test]
    fn blocks_follow_depth_first_order() {
        let ctx = assemble(&sample(), &ActiveSet::All);
        let ids: Vec<Option<&str>> = ctx.blocks.iter().map(|b| b.node_id.as_ref().map(NodeId::as_str)).collect();
        assert_eq!(
            ids,
            vec![Some("root"), Some("t1"), Some("s1"), Some("m1"), Some("s2"), None, None]
        );
        let instruction = ctx.instruction();
        assert!(instruction.starts_with("[AGENT: Root]\nYou coordinate."));
        assert!(instruction.contains("[MEMORY: Facts]\nParis is in France."));
        assert!(instruction.contains("[TOOL: Get Time]\nCallable as `Get_Time`."));
        assert!(instruction.contains("[TOOL: Web]\nNative web search."));
        assert!(instruction.contains("\n\n[BUILT-IN TOOL: manage_simulation]\nStage tree changes"));
    }

    #[test]
    fn catalog_has_one_search_and_builtins_last() {
        let ctx = assemble(&sample(), &ActiveSet::All);
        let names: Vec<Option<&str>> = ctx.tools.iter().map(ToolDeclaration::name).collect();
        assert_eq!(
            names,
            vec![Some("Get_Time"), None, Some(MANAGE_NODE), Some(MANAGE_SIMULATION)]
        );
        match &ctx.tools[0] {
            ToolDeclaration::Function { parameters, description, .. } => {
                assert_eq!(parameters["properties"]["payload"]["type"], "string");
                assert_eq!(description, "Runs the 'Get Time' tool.");
            }
            ToolDeclaration::Search => panic!("expected function"),
        }
    }

    #[test]
    fn active_set_filters_blocks_and_tools() {
        let ctx = assemble(&sample(), &ActiveSet::only([NodeId::from("m1")]));
        assert_eq!(ctx.blocks.len(), 4);
        assert_eq!(ctx.tools.len(), 2);
    }

    #[test]
    fn colliding_names_both_kept() {
        let mut s = sample();
        let _ = s
            .insert(Node::with_id("t2", "Get-Time", Some("root".into()), tool(ToolKind::Function)))
            .unwrap();
        let _ = s
            .insert(Node::with_id("t3", "GetTime", Some("root".into()), tool(ToolKind::ExternalApi)))
            .unwrap();
        let ctx = assemble(&s, &ActiveSet::All);
        let names: Vec<&str> = ctx.tools.iter().filter_map(ToolDeclaration::name).collect();
        assert_eq!(names.iter().filter(|n| **n == "GetTime").count(), 2);
    }

    // ── properties ───────────────────────────────────────────────────────

    fn arb_kind() -> impl Strategy<Value = NodeKind> {
        prop_oneof![
            "[a-z ]{0,12}".prop_map(|s| agent(&s)),
            "[a-z ]{0,12}".prop_map(|content| NodeKind::Memory { content }),
            Just(tool(ToolKind::Function)),
            Just(tool(ToolKind::ExternalApi)),
            Just(tool(ToolKind::Search)),
            Just(NodeKind::System),
        ]
    }

    fn arb_tree() -> impl Strategy<Value = (NodeStore, ActiveSet)> {
        prop::collection::vec((arb_kind(), any::<prop::sample::Index>(), any::<bool>()), 0..20).prop_map(
            |specs| {
                let mut store = NodeStore::new(Node::with_id("n0", "Root", None, agent("root"))).unwrap();
                let mut ids = vec![NodeId::from("n0")];
                let mut active = HashSet::new();
                for (i, (kind, parent, visible)) in specs.into_iter().enumerate() {
                    let id = NodeId::from(format!("n{}", i + 1));
                    let parent = parent.get(&ids).clone();
                    let _ = store
                        .insert(Node::with_id(id.clone(), format!("Node {i}"), Some(parent), kind))
                        .unwrap();
                    if visible {
                        let _ = active.insert(id.clone());
                    }
                    ids.push(id);
                }
                (store, ActiveSet::only(active))
            },
        )
    }

    proptest! {
        #[test]
        fn one_block_per_visible_node_plus_builtins((store, active) in arb_tree()) {
            let ctx = assemble(&store, &active);
            let visible: Vec<&Node> = store.iter().filter(|n| active.contains(n)).collect();

            let node_blocks: Vec<&NodeId> = ctx.blocks.iter().filter_map(|b| b.node_id.as_ref()).collect();
            prop_assert_eq!(node_blocks.len(), visible.len());
            let unique: HashSet<&NodeId> = node_blocks.iter().copied().collect();
            prop_assert_eq!(unique.len(), visible.len());
            prop_assert_eq!(ctx.blocks.len() - node_blocks.len(), 2);
        }

        #[test]
        fn catalog_size_matches_visible_tools((store, active) in arb_tree()) {
            let ctx = assemble(&store, &active);
            let visible_tools: Vec<&ToolConfig> = store
                .iter()
                .filter(|n| active.contains(n))
                .filter_map(Node::tool_config)
                .collect();
            let functions = visible_tools.iter().filter(|c| c.tool_kind != ToolKind::Search).count();
            let search = usize::from(visible_tools.iter().any(|c| c.tool_kind == ToolKind::Search));
            prop_assert_eq!(ctx.tools.len(), functions + search + 2);
        }
    }
}
