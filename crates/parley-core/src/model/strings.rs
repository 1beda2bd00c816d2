use std::collections::HashMap;

use super::node::StringId;

/// Immutable mapping from [`StringId`] to source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    entries: HashMap<StringId, String>,
}

impl StringTable {
    #[must_use]
    pub const fn new(entries: HashMap<StringId, String>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn get(&self, id: StringId) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, id: StringId) -> bool {
        self.entries.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
