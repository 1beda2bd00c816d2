//! Dialogue nodes and their identifiers.
//!
//! A node is immutable once the graph is built. Its outgoing edges are
//! modelled by [`Edges`], which makes the children/link split a type-level
//! fact instead of a convention.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// 128-bit globally unique node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Build an id from a raw 128-bit value. Mostly useful in tests.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Convert an optional raw reference, treating the nil GUID as "no node".
    #[must_use]
    pub fn from_reference(raw: Option<Uuid>) -> Option<Self> {
        raw.filter(|uuid| !uuid.is_nil()).map(Self)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// The 8-hex-character prefix used for compact user-facing references.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn short(&self) -> ShortId {
        ShortId((self.0.as_u128() >> 96) as u32)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for NodeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// First 8 hex characters of a [`NodeId`].
///
/// Stored as the top 32 bits of the GUID, which is exactly what the first
/// hyphen-delimited group encodes. Not guaranteed unique across a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShortId(u32);

impl ShortId {
    pub const LEN: usize = 8;
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl Serialize for ShortId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Error returned when a short reference is not exactly 8 hex characters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("short id must be {} hex characters, got '{0}'", ShortId::LEN)]
pub struct ParseShortIdError(pub String);

impl FromStr for ShortId {
    type Err = ParseShortIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() != Self::LEN || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseShortIdError(s.to_string()));
        }
        u32::from_str_radix(trimmed, 16)
            .map(Self)
            .map_err(|_| ParseShortIdError(s.to_string()))
    }
}

/// Index into the global string table. The raw value `0` means "unset" and
/// is represented as `None` wherever a `StringId` is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StringId(NonZeroU32);

impl StringId {
    /// Interpret a raw slot value, mapping the `0` sentinel to `None`.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for StringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StringId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<NonZeroU32>().map(Self)
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// The three node kinds found in a conversation database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Root of a conversation.
    Conversation,
    /// A spoken line.
    #[serde(rename = "ConversationLine")]
    Line,
    /// A redirect to another node; has no text of its own.
    #[serde(rename = "ConversationLink")]
    Link,
}

impl NodeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::Line => "line",
            Self::Link => "link",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outgoing edges of a node. Conversations and lines own an ordered child
/// list; links point at a single target (or nowhere).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edges {
    Children(Vec<NodeId>),
    Link(Option<NodeId>),
}

/// The three text slots a node may carry, in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSlot {
    Paraphrase,
    HoverText,
    Body,
}

impl TextSlot {
    pub const ALL: [Self; 3] = [Self::Paraphrase, Self::HoverText, Self::Body];

    /// Label printed in front of the slot's text. Body text has none.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Paraphrase => "Paraphrase: ",
            Self::HoverText => "Hovertext: ",
            Self::Body => "",
        }
    }
}

/// A single dialogue node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub edges: Edges,
    pub parent: Option<NodeId>,
    pub speaker: String,
    pub paraphrase: Option<StringId>,
    pub hover_text: Option<StringId>,
    pub body_text: Option<StringId>,
}

impl Node {
    #[must_use]
    pub const fn short_id(&self) -> ShortId {
        self.id.short()
    }

    /// String id stored in `slot`, if any.
    #[must_use]
    pub const fn slot(&self, slot: TextSlot) -> Option<StringId> {
        match slot {
            TextSlot::Paraphrase => self.paraphrase,
            TextSlot::HoverText => self.hover_text,
            TextSlot::Body => self.body_text,
        }
    }

    /// Present text slots in presentation order.
    pub fn text_slots(&self) -> impl Iterator<Item = (TextSlot, StringId)> + '_ {
        TextSlot::ALL
            .into_iter()
            .filter_map(|slot| self.slot(slot).map(|id| (slot, id)))
    }

    #[must_use]
    pub const fn has_text(&self) -> bool {
        self.paraphrase.is_some() || self.hover_text.is_some() || self.body_text.is_some()
    }

    /// True when the node declares a child or a link target.
    #[must_use]
    pub fn has_any_child(&self) -> bool {
        match &self.edges {
            Edges::Children(children) => !children.is_empty(),
            Edges::Link(target) => target.is_some(),
        }
    }

    /// Obsolete nodes carry no text and lead nowhere; navigation skips them.
    #[must_use]
    pub fn is_obsolete(&self) -> bool {
        !self.has_any_child() && !self.has_text()
    }

    /// Ordered children; empty for links.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        match &self.edges {
            Edges::Children(children) => children,
            Edges::Link(_) => &[],
        }
    }

    #[must_use]
    pub fn linked_target(&self) -> Option<NodeId> {
        match self.edges {
            Edges::Link(target) => target,
            Edges::Children(_) => None,
        }
    }

    /// Every node this one references as a child or link target, in order.
    pub fn outgoing(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children().iter().copied().chain(self.linked_target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: u128) -> Node {
        Node {
            id: NodeId::from_u128(id),
            kind: NodeKind::Line,
            edges: Edges::Children(vec![]),
            parent: None,
            speaker: String::new(),
            paraphrase: None,
            hover_text: None,
            body_text: None,
        }
    }

    #[test]
    fn short_id_is_first_eight_hex_chars() {
        let id: NodeId = "1A2B3C4D-0000-0000-0000-00000000000F".parse().unwrap();
        assert_eq!(id.short().to_string(), "1a2b3c4d");
        assert!(id.to_string().starts_with(&id.short().to_string()));
    }

    #[test]
    fn short_id_parse_is_case_insensitive() {
        let a: ShortId = "DEADBEEF".parse().unwrap();
        let b: ShortId = "deadbeef".parse().unwrap();
        assert_eq!(a, b);
        assert!("deadbee".parse::<ShortId>().is_err());
        assert!("deadbeeg".parse::<ShortId>().is_err());
    }

    #[test]
    fn nil_reference_is_none() {
        assert_eq!(NodeId::from_reference(Some(Uuid::nil())), None);
        assert_eq!(NodeId::from_reference(None), None);
        let real = Uuid::from_u128(7);
        assert_eq!(NodeId::from_reference(Some(real)), Some(NodeId::from_uuid(real)));
    }

    #[test]
    fn zero_string_id_is_unset() {
        assert_eq!(StringId::from_raw(0), None);
        assert_eq!(StringId::from_raw(5).map(StringId::get), Some(5));
    }

    #[test]
    fn textless_leaf_is_obsolete() {
        let node = line(1);
        assert!(!node.has_text());
        assert!(node.is_obsolete());
    }

    #[test]
    fn link_without_target_and_text_is_obsolete() {
        let mut node = line(1);
        node.kind = NodeKind::Link;
        node.edges = Edges::Link(None);
        assert!(node.is_obsolete());

        node.edges = Edges::Link(Some(NodeId::from_u128(2)));
        assert!(!node.is_obsolete());
        assert!(node.children().is_empty());
    }

    #[test]
    fn text_slots_follow_presentation_order() {
        let mut node = line(1);
        node.body_text = StringId::from_raw(3);
        node.paraphrase = StringId::from_raw(1);
        let slots: Vec<TextSlot> = node.text_slots().map(|(slot, _)| slot).collect();
        assert_eq!(slots, vec![TextSlot::Paraphrase, TextSlot::Body]);
        assert!(!node.is_obsolete());
    }
}
