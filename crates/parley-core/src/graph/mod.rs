//! The in-memory dialogue graph and the algorithms that run over it.
//!
//! ## Submodules
//!
//! - [`build`]: two-pass construction from [`RawDatabase`] records.
//! - [`traverse`]: "valid children" resolution with a cycle guard.
//! - [`diagnostics`]: whole-graph report (obsolete nodes, collisions,
//!   structural cycles).
//!
//! [`DialogueGraph`] is read-only once built. Everything that needs the
//! graph borrows it; there is no ambient "current database".
//!
//! [`RawDatabase`]: crate::model::RawDatabase

pub mod build;
pub mod diagnostics;
pub mod traverse;

use std::collections::HashMap;
use std::fmt;
use std::io;

use serde::Serialize;

use crate::error::ErrorCode;
use crate::model::{Node, NodeId, ShortId, StringId, StringTable};

pub use build::GraphBuilder;
pub use traverse::{Step, next_step, valid_children};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Which field of a node carried a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Child,
    Link,
    Parent,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Child => "child",
            Self::Link => "linked_line",
            Self::Parent => "parent",
        })
    }
}

/// Failures raised while loading, building or walking a graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("failed to read database: {0}")]
    Io(#[from] io::Error),

    #[error("malformed database: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed database: string table key '{key}' is not a numeric string id")]
    InvalidStringKey { key: String },

    #[error("malformed database: node {id} appears more than once")]
    DuplicateNode { id: NodeId },

    #[error("malformed database: short id {short} is shared by {first} and {second}")]
    ShortIdCollision {
        short: ShortId,
        first: NodeId,
        second: NodeId,
    },

    #[error("malformed database: node {from} has {edge} reference to missing node {missing}")]
    DanglingReference {
        from: NodeId,
        missing: NodeId,
        edge: EdgeKind,
    },

    #[error("unresolved reference: node {0} is not in the graph")]
    UnresolvedNode(NodeId),

    #[error("unresolved reference: string {0} is not in the string table")]
    UnresolvedString(StringId),

    #[error("cyclic graph: {}", format_cycle(.path))]
    Cycle { path: Vec<NodeId> },
}

impl GraphError {
    /// Machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io(err) if err.kind() == io::ErrorKind::NotFound => ErrorCode::DatabaseMissing,
            Self::Io(_) => ErrorCode::InternalUnexpected,
            Self::Json(_)
            | Self::InvalidStringKey { .. }
            | Self::DuplicateNode { .. }
            | Self::ShortIdCollision { .. }
            | Self::DanglingReference { .. } => ErrorCode::MalformedDatabase,
            Self::UnresolvedNode(_) | Self::UnresolvedString(_) => ErrorCode::UnresolvedReference,
            Self::Cycle { .. } => ErrorCode::CyclicGraph,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

fn format_cycle(path: &[NodeId]) -> String {
    path.iter()
        .map(|id| id.short().to_string())
        .collect::<Vec<_>>()
        .join(" → ")
}

// ---------------------------------------------------------------------------
// DialogueGraph
// ---------------------------------------------------------------------------

/// A short-id collision that was resolved first-inserted-wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShortIdCollision {
    pub short: ShortId,
    /// The node the short id resolves to.
    pub kept: NodeId,
    /// The later node that shares the prefix and is reachable by full id only.
    pub shadowed: NodeId,
}

/// All nodes, the string table, and the lookups built over them.
#[derive(Debug, Clone, Default)]
pub struct DialogueGraph {
    nodes: HashMap<NodeId, Node>,
    /// Node ids in database order.
    order: Vec<NodeId>,
    short_ids: HashMap<ShortId, NodeId>,
    collisions: Vec<ShortIdCollision>,
    /// node → nodes that reference it as a child or link target.
    referrers: HashMap<NodeId, Vec<NodeId>>,
    strings: StringTable,
}

impl DialogueGraph {
    /// Look up a node that is expected to exist.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnresolvedNode`] if the id is unknown.
    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::UnresolvedNode(id))
    }

    /// Look up a node that may not exist.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    #[must_use]
    pub fn by_short_id(&self, short: ShortId) -> Option<&Node> {
        self.short_ids.get(&short).and_then(|id| self.nodes.get(id))
    }

    /// Resolve a user-typed reference: a full GUID or an 8-character prefix.
    #[must_use]
    pub fn find(&self, reference: &str) -> Option<&Node> {
        let trimmed = reference.trim();
        if let Ok(id) = trimmed.parse::<NodeId>() {
            return self.get(id);
        }
        trimmed
            .parse::<ShortId>()
            .ok()
            .and_then(|short| self.by_short_id(short))
    }

    /// Nodes that reference `id` as a child or link target, in database order.
    #[must_use]
    pub fn referrers(&self, id: NodeId) -> &[NodeId] {
        self.referrers.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Source text for a string id.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnresolvedString`] if the id is not in the table.
    pub fn text(&self, id: StringId) -> Result<&str, GraphError> {
        self.strings.get(id).ok_or(GraphError::UnresolvedString(id))
    }

    #[must_use]
    pub const fn strings(&self) -> &StringTable {
        &self.strings
    }

    /// All nodes in database order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Nodes without a parent.
    pub fn roots(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes().filter(|node| node.parent.is_none())
    }

    #[must_use]
    pub fn short_id_collisions(&self) -> &[ShortIdCollision] {
        &self.collisions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
