//! Data model for dialogue databases.
//!
//! - [`node`]: node identifiers, kinds, edges, text slots.
//! - [`raw`]: serde records for the on-disk JSON database.
//! - [`strings`]: the immutable string table.

pub mod node;
pub mod raw;
pub mod strings;

pub use node::{Edges, Node, NodeId, NodeKind, ShortId, StringId, TextSlot};
pub use raw::{RawDatabase, RawNode};
pub use strings::StringTable;
