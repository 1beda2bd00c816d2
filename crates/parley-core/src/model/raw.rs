//! On-disk database records.
//!
//! The extraction tool writes one JSON document with two keys:
//!
//! ```json
//! {
//!   "conversations": [
//!     { "guid": "…", "type": "ConversationLine", "child": ["…"],
//!       "paraphrase": 0, "hovertext": 0, "text": 12,
//!       "speaker": "Varric", "linked_line": "0000…", "parent": "…" }
//!   ],
//!   "stringtable": { "12": "Hawke!" }
//! }
//! ```
//!
//! These records are deserialized verbatim; all validation happens in
//! [`crate::graph::build`].

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::instrument;
use uuid::Uuid;

use super::node::NodeKind;
use crate::graph::GraphError;

/// A whole database as read from disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDatabase {
    #[serde(default, deserialize_with = "null_as_default")]
    pub conversations: Vec<RawNode>,
    /// Numeric-string key → source text. Keys are validated by the builder.
    #[serde(default, rename = "stringtable", deserialize_with = "null_as_default")]
    pub string_table: HashMap<String, String>,
}

/// One node record, field names as written by the extraction tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNode {
    pub guid: Uuid,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, deserialize_with = "null_as_default")]
    pub child: Vec<Uuid>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub paraphrase: u32,
    #[serde(default, rename = "hovertext", deserialize_with = "null_as_default")]
    pub hover_text: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub speaker: String,
    #[serde(default)]
    pub linked_line: Option<Uuid>,
    #[serde(default)]
    pub parent: Option<Uuid>,
}

impl RawNode {
    /// A bare record of the given kind with every optional field unset.
    #[must_use]
    pub const fn new(guid: Uuid, kind: NodeKind) -> Self {
        Self {
            guid,
            kind,
            child: Vec::new(),
            paraphrase: 0,
            hover_text: 0,
            text: 0,
            speaker: String::new(),
            linked_line: None,
            parent: None,
        }
    }
}

impl RawDatabase {
    /// Parse a database from any reader.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Json`] if the document is not a valid database.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, GraphError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Parse a database from an in-memory JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Json`] if the document is not a valid database.
    pub fn from_json_str(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a database file.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Io`] if the file cannot be opened and
    /// [`GraphError::Json`] if it cannot be parsed.
    #[instrument]
    pub fn from_path(path: &Path) -> Result<Self, GraphError> {
        let file = std::fs::File::open(path)?;
        let db = Self::from_reader(std::io::BufReader::new(file))?;
        tracing::info!(
            nodes = db.conversations.len(),
            strings = db.string_table.len(),
            "read dialogue database"
        );
        Ok(db)
    }
}

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
