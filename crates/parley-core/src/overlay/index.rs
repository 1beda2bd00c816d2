//! String id → Weblate unit index.
//!
//! The translation project stores every dialogue string as a unit with its
//! own numeric id and an editor position. The export tool writes that mapping
//! either as CSV (`key,unit_id,position` per line, no header) or as JSON
//! (`{"12": {"id": 301, "pos": 7}}`). The file extension picks the format.

use std::collections::HashMap;
use std::io::{self, BufRead, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::ErrorCode;
use crate::model::StringId;

/// Where a string lives in the translation project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    #[serde(rename = "id")]
    pub unit_id: u64,
    #[serde(rename = "pos")]
    pub position: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("failed to read translation index: {0}")]
    Io(#[from] io::Error),

    #[error("translation index line {line}: {reason}")]
    Csv { line: usize, reason: String },

    #[error("translation index is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("translation index key '{key}' is not a numeric string id")]
    InvalidKey { key: String },
}

impl IndexError {
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io(err) if err.kind() == io::ErrorKind::NotFound => ErrorCode::DatabaseMissing,
            Self::Io(_) => ErrorCode::InternalUnexpected,
            Self::Csv { .. } | Self::Json(_) | Self::InvalidKey { .. } => {
                ErrorCode::IndexParseError
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeblateIndex {
    entries: HashMap<StringId, IndexEntry>,
}

impl WeblateIndex {
    #[must_use]
    pub fn get(&self, id: StringId) -> Option<IndexEntry> {
        self.entries.get(&id).copied()
    }

    pub fn insert(&mut self, id: StringId, entry: IndexEntry) {
        self.entries.insert(id, entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse the CSV form. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Csv`] with a 1-based line number when a line
    /// does not have exactly three numeric fields.
    pub fn from_csv_reader<R: BufRead>(reader: R) -> Result<Self, IndexError> {
        let mut index = Self::default();
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            let row = line.trim();
            if row.is_empty() {
                continue;
            }
            let line_no = n + 1;
            let fields: Vec<&str> = row.split(',').map(str::trim).collect();
            let [key, unit, pos] = fields.as_slice() else {
                return Err(IndexError::Csv {
                    line: line_no,
                    reason: format!("expected 3 fields, found {}", fields.len()),
                });
            };
            let id = parse_key(key)?;
            let unit_id = parse_field(unit, "unit id", line_no)?;
            let position = parse_field(pos, "position", line_no)?;
            index.insert(id, IndexEntry { unit_id, position });
        }
        Ok(index)
    }

    /// Parse the JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Json`] for malformed documents and
    /// [`IndexError::InvalidKey`] for non-numeric keys.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, IndexError> {
        let raw: HashMap<String, IndexEntry> = serde_json::from_reader(reader)?;
        let mut index = Self::default();
        for (key, entry) in raw {
            index.insert(parse_key(&key)?, entry);
        }
        Ok(index)
    }

    /// Load from disk; `.json` files are parsed as JSON, anything else as CSV.
    ///
    /// # Errors
    ///
    /// See [`Self::from_csv_reader`] and [`Self::from_json_reader`].
    #[instrument]
    pub fn from_path(path: &Path) -> Result<Self, IndexError> {
        let file = std::fs::File::open(path)?;
        let reader = io::BufReader::new(file);
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let index = if is_json {
            Self::from_json_reader(reader)?
        } else {
            Self::from_csv_reader(reader)?
        };
        tracing::info!(entries = index.len(), "loaded translation index");
        Ok(index)
    }
}

fn parse_key(key: &str) -> Result<StringId, IndexError> {
    key.parse::<StringId>()
        .map_err(|_| IndexError::InvalidKey {
            key: key.to_string(),
        })
}

fn parse_field(raw: &str, what: &str, line: usize) -> Result<u64, IndexError> {
    raw.parse::<u64>().map_err(|_| IndexError::Csv {
        line,
        reason: format!("{what} '{raw}' is not a number"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sid(n: u32) -> StringId {
        StringId::from_raw(n).unwrap()
    }

    #[test]
    fn parses_csv_rows() {
        let csv = "12,301,7\n13,302,8\n\n";
        let index = WeblateIndex::from_csv_reader(Cursor::new(csv)).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.get(sid(12)),
            Some(IndexEntry {
                unit_id: 301,
                position: 7
            })
        );
    }

    #[test]
    fn csv_reports_line_numbers() {
        let csv = "12,301,7\n13,302\n";
        let err = WeblateIndex::from_csv_reader(Cursor::new(csv)).unwrap_err();
        match err {
            IndexError::Csv { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn csv_rejects_non_numeric_position() {
        let err = WeblateIndex::from_csv_reader(Cursor::new("1,2,x\n")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IndexParseError);
    }

    #[test]
    fn parses_json_form() {
        let json = r#"{"12": {"id": 301, "pos": 7}}"#;
        let index = WeblateIndex::from_json_reader(json.as_bytes()).unwrap();
        assert_eq!(index.get(sid(12)).map(|e| e.unit_id), Some(301));
    }

    #[test]
    fn json_rejects_bad_key() {
        let json = r#"{"abc": {"id": 1, "pos": 1}}"#;
        assert!(matches!(
            WeblateIndex::from_json_reader(json.as_bytes()),
            Err(IndexError::InvalidKey { .. })
        ));
    }

    #[test]
    fn from_path_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("index.json");
        std::fs::write(&json_path, r#"{"5": {"id": 9, "pos": 2}}"#).unwrap();
        let csv_path = dir.path().join("index.csv");
        std::fs::write(&csv_path, "5,9,2\n").unwrap();

        let from_json = WeblateIndex::from_path(&json_path).unwrap();
        let from_csv = WeblateIndex::from_path(&csv_path).unwrap();
        assert_eq!(from_json, from_csv);
    }
}
