//! Two-pass construction of a [`DialogueGraph`] from raw records.
//!
//! Pass one inserts every node into the full-id and short-id lookups.
//! Pass two validates every child, link and parent reference against the
//! now-complete lookup and fills the reverse-edge index. Edge resolution
//! needs every node to be present first, so the passes cannot be merged.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::instrument;

use super::{DialogueGraph, EdgeKind, GraphError, ShortIdCollision};
use crate::model::{Edges, Node, NodeId, NodeKind, RawDatabase, RawNode, StringId, StringTable};

/// Builder for [`DialogueGraph`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphBuilder {
    strict_short_ids: bool,
}

impl GraphBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            strict_short_ids: false,
        }
    }

    /// Fail on short-id collisions instead of keeping the first node.
    #[must_use]
    pub const fn strict_short_ids(mut self, strict: bool) -> Self {
        self.strict_short_ids = strict;
        self
    }

    /// Validate `raw` and build the graph.
    ///
    /// # Errors
    ///
    /// Returns a Malformed Database error ([`GraphError::code`]) when a
    /// string-table key is not numeric, a node id is duplicated, a reference
    /// does not resolve, or (in strict mode) two nodes share a short id.
    #[instrument(skip_all, fields(records = raw.conversations.len()))]
    pub fn build(self, raw: RawDatabase) -> Result<DialogueGraph, GraphError> {
        let strings = parse_string_table(raw.string_table)?;

        let mut graph = DialogueGraph {
            strings,
            ..DialogueGraph::default()
        };
        graph.order.reserve(raw.conversations.len());
        graph.nodes.reserve(raw.conversations.len());

        // Pass one: index.
        for record in raw.conversations {
            let node = convert(record);
            let id = node.id;
            match graph.nodes.entry(id) {
                Entry::Occupied(_) => return Err(GraphError::DuplicateNode { id }),
                Entry::Vacant(slot) => {
                    slot.insert(node);
                }
            }
            graph.order.push(id);

            match graph.short_ids.entry(id.short()) {
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
                Entry::Occupied(existing) => {
                    let kept = *existing.get();
                    if self.strict_short_ids {
                        return Err(GraphError::ShortIdCollision {
                            short: id.short(),
                            first: kept,
                            second: id,
                        });
                    }
                    tracing::warn!(
                        short = %id.short(),
                        %kept,
                        shadowed = %id,
                        "short id collision; keeping the first node"
                    );
                    graph.collisions.push(ShortIdCollision {
                        short: id.short(),
                        kept,
                        shadowed: id,
                    });
                }
            }
        }

        // Pass two: resolve edges.
        let mut referrers: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for id in &graph.order {
            let Some(node) = graph.nodes.get(id) else {
                continue;
            };
            for child in node.children() {
                require(&graph, *id, *child, EdgeKind::Child)?;
                referrers.entry(*child).or_default().push(*id);
            }
            if let Some(target) = node.linked_target() {
                require(&graph, *id, target, EdgeKind::Link)?;
                referrers.entry(target).or_default().push(*id);
            }
            if let Some(parent) = node.parent {
                require(&graph, *id, parent, EdgeKind::Parent)?;
            }
        }
        graph.referrers = referrers;

        tracing::info!(
            nodes = graph.len(),
            strings = graph.strings.len(),
            collisions = graph.collisions.len(),
            "built dialogue graph"
        );
        Ok(graph)
    }
}

impl DialogueGraph {
    /// Build with default settings.
    ///
    /// # Errors
    ///
    /// See [`GraphBuilder::build`].
    pub fn from_raw(raw: RawDatabase) -> Result<Self, GraphError> {
        GraphBuilder::new().build(raw)
    }
}

fn require(
    graph: &DialogueGraph,
    from: NodeId,
    missing: NodeId,
    edge: EdgeKind,
) -> Result<(), GraphError> {
    if graph.nodes.contains_key(&missing) {
        Ok(())
    } else {
        Err(GraphError::DanglingReference {
            from,
            missing,
            edge,
        })
    }
}

fn parse_string_table(raw: HashMap<String, String>) -> Result<StringTable, GraphError> {
    let mut entries = HashMap::with_capacity(raw.len());
    for (key, text) in raw {
        let value = key
            .trim()
            .parse::<u32>()
            .map_err(|_| GraphError::InvalidStringKey { key: key.clone() })?;
        // Slot value 0 means "unset", so no node can reach this entry.
        let Some(id) = StringId::from_raw(value) else {
            tracing::debug!(key = %key, "skipping string table entry for the unset id");
            continue;
        };
        entries.insert(id, text);
    }
    Ok(StringTable::new(entries))
}

fn convert(record: RawNode) -> Node {
    let id = NodeId::from_uuid(record.guid);
    let children: Vec<NodeId> = record
        .child
        .into_iter()
        .filter(|uuid| !uuid.is_nil())
        .map(NodeId::from_uuid)
        .collect();
    let link = NodeId::from_reference(record.linked_line);

    let edges = if record.kind == NodeKind::Link {
        if !children.is_empty() {
            tracing::warn!(%id, count = children.len(), "link node carries children; ignoring them");
        }
        Edges::Link(link)
    } else {
        if link.is_some() {
            tracing::warn!(%id, kind = %record.kind, "non-link node carries linked_line; ignoring it");
        }
        Edges::Children(children)
    };

    Node {
        id,
        kind: record.kind,
        edges,
        parent: NodeId::from_reference(record.parent),
        speaker: record.speaker,
        paraphrase: StringId::from_raw(record.paraphrase),
        hover_text: StringId::from_raw(record.hover_text),
        body_text: StringId::from_raw(record.text),
    }
}
