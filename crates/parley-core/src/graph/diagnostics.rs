//! Whole-graph health report.
//!
//! Three kinds of loops are told apart:
//!
//! - **Structural cycles** run entirely through text-less nodes. Valid
//!   children resolution cannot terminate inside one and fails with a
//!   cyclic-graph error whenever it enters it.
//! - **Auto-advance cycles** are loops in which every node has exactly one
//!   valid child. Forward descent would never reach a choice or an end.
//! - **Dialogue loops** are any other cycles (for example a link back to an
//!   earlier question). They are normal content and only counted.

#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use super::traverse::{Step, next_step};
use super::{DialogueGraph, ShortIdCollision};
use crate::model::{NodeId, NodeKind, StringId};

/// Summary produced by [`analyze`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphReport {
    pub nodes: usize,
    pub conversations: usize,
    pub lines: usize,
    pub links: usize,
    pub strings: usize,
    pub roots: Vec<NodeId>,
    pub obsolete: Vec<NodeId>,
    pub collisions: Vec<ShortIdCollision>,
    /// Text references that do not resolve in the string table.
    pub missing_strings: Vec<MissingString>,
    /// Node referenced by the most other nodes, with its referrer count.
    pub max_fan_in: Option<FanIn>,
    pub structural_cycles: Vec<Vec<NodeId>>,
    pub auto_advance_cycles: Vec<Vec<NodeId>>,
    pub dialogue_loops: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MissingString {
    pub node: NodeId,
    pub string: StringId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FanIn {
    pub node: NodeId,
    pub referrers: usize,
}

impl GraphReport {
    /// True when the report contains anything that makes navigation fail.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.structural_cycles.is_empty()
            || !self.auto_advance_cycles.is_empty()
            || !self.missing_strings.is_empty()
    }
}

/// Analyze every node of `graph`.
#[must_use]
#[tracing::instrument(skip_all, fields(nodes = graph.len()))]
pub fn analyze(graph: &DialogueGraph) -> GraphReport {
    let mut report = GraphReport {
        nodes: graph.len(),
        strings: graph.strings().len(),
        collisions: graph.short_id_collisions().to_vec(),
        ..GraphReport::default()
    };

    for node in graph.nodes() {
        match node.kind {
            NodeKind::Conversation => report.conversations += 1,
            NodeKind::Line => report.lines += 1,
            NodeKind::Link => report.links += 1,
        }
        if node.parent.is_none() {
            report.roots.push(node.id);
        }
        if node.is_obsolete() {
            report.obsolete.push(node.id);
        }
        for (_, string) in node.text_slots() {
            if !graph.strings().contains(string) {
                report.missing_strings.push(MissingString {
                    node: node.id,
                    string,
                });
            }
        }
        let referrers = graph.referrers(node.id).len();
        if referrers > report.max_fan_in.map_or(0, |fan| fan.referrers) {
            report.max_fan_in = Some(FanIn {
                node: node.id,
                referrers,
            });
        }
    }

    report.structural_cycles = cycles(&edge_graph(graph, |to| {
        graph.get(to).is_some_and(|n| !n.has_text() && !n.is_obsolete())
    }));
    report.dialogue_loops = cycles(&edge_graph(graph, |_| true)).len();
    report.auto_advance_cycles = auto_advance_cycles(graph);

    tracing::debug!(
        obsolete = report.obsolete.len(),
        structural = report.structural_cycles.len(),
        auto_advance = report.auto_advance_cycles.len(),
        loops = report.dialogue_loops,
        "graph analyzed"
    );
    report
}

// ---------------------------------------------------------------------------
// petgraph helpers
// ---------------------------------------------------------------------------

/// Project the dialogue graph onto a petgraph, keeping the edges whose
/// target satisfies `keep`.
fn edge_graph<F>(graph: &DialogueGraph, keep: F) -> DiGraph<NodeId, ()>
where
    F: Fn(NodeId) -> bool,
{
    let mut pg = DiGraph::with_capacity(graph.len(), graph.len());
    let mut index: HashMap<NodeId, NodeIndex> = HashMap::with_capacity(graph.len());
    for node in graph.nodes() {
        index.insert(node.id, pg.add_node(node.id));
    }
    for node in graph.nodes() {
        let Some(&from) = index.get(&node.id) else {
            continue;
        };
        for target in node.outgoing() {
            if !keep(target) {
                continue;
            }
            if let Some(&to) = index.get(&target) {
                pg.add_edge(from, to, ());
            }
        }
    }
    pg
}

/// Non-trivial strongly connected components. Members are sorted, and the
/// components are sorted by their first member.
fn cycles(pg: &DiGraph<NodeId, ()>) -> Vec<Vec<NodeId>> {
    let mut out: Vec<Vec<NodeId>> = tarjan_scc(pg)
        .into_iter()
        .filter(|component| {
            component.len() > 1
                || component
                    .first()
                    .is_some_and(|idx| pg.find_edge(*idx, *idx).is_some())
        })
        .map(|component| {
            let mut ids: Vec<NodeId> = component.into_iter().map(|idx| pg[idx]).collect();
            ids.sort_unstable();
            ids
        })
        .collect();
    out.sort_unstable();
    out
}

fn auto_advance_cycles(graph: &DialogueGraph) -> Vec<Vec<NodeId>> {
    let mut pg = DiGraph::<NodeId, ()>::new();
    let mut index: HashMap<NodeId, NodeIndex> = HashMap::new();
    let mut intern = |pg: &mut DiGraph<NodeId, ()>, id: NodeId| {
        *index.entry(id).or_insert_with(|| pg.add_node(id))
    };

    for node in graph.nodes() {
        // Only nodes that descent actually stops on can auto-advance.
        if !node.has_text() {
            continue;
        }
        if let Ok(Step::Advance(next)) = next_step(graph, node.id) {
            let from = intern(&mut pg, node.id);
            let to = intern(&mut pg, next);
            pg.add_edge(from, to, ());
        }
    }
    cycles(&pg)
}
