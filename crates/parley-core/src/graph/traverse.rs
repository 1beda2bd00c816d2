//! Valid-children resolution.
//!
//! Given a node, compute the ordered nodes that are presentable as the next
//! step. Text-less scaffolding is flattened away, obsolete nodes are pruned,
//! and link chains are followed to their first node with text.
//!
//! The walk is a depth-first, left-to-right recursion over `children`. The
//! nodes on the current recursion path are tracked so that a cycle through
//! text-less nodes fails with [`GraphError::Cycle`] instead of recursing
//! forever. A node reached twice through different branches (a diamond) is
//! not a cycle and contributes each time it is reached.

use std::collections::HashSet;

use super::{DialogueGraph, GraphError};
use crate::model::{Edges, Node, NodeId};

/// What navigation does after presenting a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// No valid children: the conversation ends here.
    End,
    /// Exactly one valid child: advance without asking.
    Advance(NodeId),
    /// Two or more valid children: the user picks one.
    Choose(Vec<NodeId>),
}

impl Step {
    fn from_children(mut children: Vec<NodeId>) -> Self {
        match children.len() {
            0 => Self::End,
            1 => Self::Advance(children.remove(0)),
            _ => Self::Choose(children),
        }
    }
}

/// Ordered presentable successors of `id`.
///
/// # Errors
///
/// - [`GraphError::UnresolvedNode`] if `id` or a referenced node is missing.
/// - [`GraphError::Cycle`] if the walk re-enters a node on its own path.
pub fn valid_children(graph: &DialogueGraph, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
    let node = graph.node(id)?;
    let mut walk = Walk::new(graph, id);
    walk.expand(node)?;
    tracing::debug!(node = %id.short(), count = walk.out.len(), "resolved valid children");
    Ok(walk.out)
}

/// Classify the valid children of `id` as end, auto-advance or choice point.
///
/// # Errors
///
/// Same as [`valid_children`].
pub fn next_step(graph: &DialogueGraph, id: NodeId) -> Result<Step, GraphError> {
    valid_children(graph, id).map(Step::from_children)
}

struct Walk<'g> {
    graph: &'g DialogueGraph,
    path: Vec<NodeId>,
    on_path: HashSet<NodeId>,
    out: Vec<NodeId>,
}

impl<'g> Walk<'g> {
    fn new(graph: &'g DialogueGraph, start: NodeId) -> Self {
        Self {
            graph,
            path: vec![start],
            on_path: HashSet::from([start]),
            out: Vec::new(),
        }
    }

    fn expand(&mut self, node: &'g Node) -> Result<(), GraphError> {
        match &node.edges {
            Edges::Link(None) => Ok(()),
            Edges::Link(Some(target)) => self.visit(*target),
            Edges::Children(children) => {
                for child in children {
                    self.visit(*child)?;
                }
                Ok(())
            }
        }
    }

    /// Contribute `id` itself, nothing, or its flattened descendants.
    fn visit(&mut self, id: NodeId) -> Result<(), GraphError> {
        let node = self.graph.node(id)?;
        if node.is_obsolete() {
            return Ok(());
        }
        if node.has_text() {
            self.out.push(id);
            return Ok(());
        }
        self.descend(node)
    }

    fn descend(&mut self, node: &'g Node) -> Result<(), GraphError> {
        if !self.on_path.insert(node.id) {
            let start = self
                .path
                .iter()
                .position(|id| *id == node.id)
                .unwrap_or_default();
            let mut cycle = self.path[start..].to_vec();
            cycle.push(node.id);
            return Err(GraphError::Cycle { path: cycle });
        }
        self.path.push(node.id);
        let result = self.expand(node);
        self.path.pop();
        self.on_path.remove(&node.id);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::model::{NodeKind, RawDatabase, RawNode};
    use std::collections::HashMap;
    use uuid::Uuid;

    /// Tiny fixture DSL: ids are small integers, placed in the top bits so
    /// each node gets a distinct short id.
    struct Fixture {
        nodes: Vec<RawNode>,
    }

    fn uid(n: u32) -> Uuid {
        Uuid::from_u128(u128::from(n) << 96)
    }

    fn id(n: u32) -> NodeId {
        NodeId::from_uuid(uid(n))
    }

    impl Fixture {
        fn new() -> Self {
            Self { nodes: Vec::new() }
        }

        fn node(mut self, n: u32, kind: NodeKind, text: u32, children: &[u32]) -> Self {
            let mut raw = RawNode::new(uid(n), kind);
            raw.text = text;
            raw.child = children.iter().map(|c| uid(*c)).collect();
            self.nodes.push(raw);
            self
        }

        fn link(mut self, n: u32, target: Option<u32>) -> Self {
            let mut raw = RawNode::new(uid(n), NodeKind::Link);
            raw.linked_line = target.map(uid);
            self.nodes.push(raw);
            self
        }

        fn build(self) -> DialogueGraph {
            let strings: HashMap<String, String> =
                (1..=20).map(|i| (i.to_string(), format!("s{i}"))).collect();
            GraphBuilder::new()
                .build(RawDatabase {
                    conversations: self.nodes,
                    string_table: strings,
                })
                .expect("fixture builds")
        }
    }

    #[test]
    fn textless_intermediate_is_flattened() {
        // R -> [A(text), B(no text) -> [C(text)]]
        let graph = Fixture::new()
            .node(1, NodeKind::Conversation, 0, &[2, 3])
            .node(2, NodeKind::Line, 1, &[])
            .node(3, NodeKind::Line, 0, &[4])
            .node(4, NodeKind::Line, 2, &[])
            .build();

        assert_eq!(valid_children(&graph, id(1)).unwrap(), vec![id(2), id(4)]);
    }

    #[test]
    fn obsolete_children_are_skipped() {
        let graph = Fixture::new()
            .node(1, NodeKind::Conversation, 0, &[2, 3])
            .node(2, NodeKind::Line, 0, &[])
            .node(3, NodeKind::Line, 1, &[])
            .build();

        assert_eq!(valid_children(&graph, id(1)).unwrap(), vec![id(3)]);
        assert_eq!(next_step(&graph, id(1)).unwrap(), Step::Advance(id(3)));
    }

    #[test]
    fn link_to_obsolete_target_yields_nothing() {
        let graph = Fixture::new()
            .link(1, Some(2))
            .node(2, NodeKind::Line, 0, &[])
            .build();
        assert!(valid_children(&graph, id(1)).unwrap().is_empty());
        assert_eq!(next_step(&graph, id(1)).unwrap(), Step::End);
    }

    #[test]
    fn link_without_target_yields_nothing() {
        let graph = Fixture::new().link(1, None).build();
        assert!(valid_children(&graph, id(1)).unwrap().is_empty());
    }

    #[test]
    fn link_to_text_node_yields_target() {
        let graph = Fixture::new()
            .link(1, Some(2))
            .node(2, NodeKind::Line, 3, &[5])
            .node(5, NodeKind::Line, 4, &[])
            .build();
        assert_eq!(valid_children(&graph, id(1)).unwrap(), vec![id(2)]);
    }

    #[test]
    fn link_to_structural_node_recurses() {
        let graph = Fixture::new()
            .node(1, NodeKind::Line, 1, &[2])
            .link(2, Some(3))
            .node(3, NodeKind::Line, 0, &[4, 5])
            .node(4, NodeKind::Line, 2, &[])
            .node(5, NodeKind::Line, 3, &[])
            .build();
        assert_eq!(
            next_step(&graph, id(1)).unwrap(),
            Step::Choose(vec![id(4), id(5)])
        );
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        // R -> [B, C], both text-less and both lead to D.
        let graph = Fixture::new()
            .node(1, NodeKind::Conversation, 0, &[2, 3])
            .node(2, NodeKind::Line, 0, &[4])
            .node(3, NodeKind::Line, 0, &[4])
            .node(4, NodeKind::Line, 1, &[])
            .build();
        assert_eq!(valid_children(&graph, id(1)).unwrap(), vec![id(4), id(4)]);
    }

    #[test]
    fn textless_cycle_is_reported() {
        // A(text) -> L1 -> B(no text) -> L2 -> B
        let graph = Fixture::new()
            .node(1, NodeKind::Line, 1, &[2])
            .link(2, Some(3))
            .node(3, NodeKind::Line, 0, &[4])
            .link(4, Some(3))
            .build();

        let err = valid_children(&graph, id(1)).unwrap_err();
        match err {
            GraphError::Cycle { path } => {
                assert_eq!(path.first(), path.last());
                assert!(path.contains(&id(3)));
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn cycle_through_start_node_is_reported() {
        let graph = Fixture::new()
            .node(1, NodeKind::Line, 0, &[2])
            .node(2, NodeKind::Line, 0, &[1])
            .build();
        assert!(matches!(
            valid_children(&graph, id(1)),
            Err(GraphError::Cycle { .. })
        ));
    }

    #[test]
    fn loop_through_text_nodes_is_fine() {
        // Dialogue loops back to an earlier line with text: not a structural cycle.
        let graph = Fixture::new()
            .node(1, NodeKind::Line, 1, &[2])
            .link(2, Some(1))
            .build();
        assert_eq!(valid_children(&graph, id(1)).unwrap(), vec![id(1)]);
    }

    #[test]
    fn unknown_start_is_unresolved() {
        let graph = Fixture::new().build();
        assert!(matches!(
            valid_children(&graph, id(42)),
            Err(GraphError::UnresolvedNode(_))
        ));
    }
}
