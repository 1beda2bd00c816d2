//! Text resolution: what a node shows, in which language.
//!
//! Each of a node's text slots (paraphrase, hover text, body) is resolved
//! independently against the string table and, when translation is enabled,
//! the overlay provider:
//!
//! | translation | overlay entry        | shown                              |
//! |-------------|----------------------|------------------------------------|
//! | off         | any                  | source                             |
//! | on          | none / error         | source                             |
//! | on          | not translated/fuzzy | source                             |
//! | on          | translated or fuzzy  | translation (source first if asked)|
//!
//! Fuzzy translations are prefixed with [`NEEDS_REVISION_MARKER`]. Review
//! state is passed through as an [`Emphasis`] hint for the renderer.

use serde::Serialize;

use crate::config::DisplayConfig;
use crate::graph::{DialogueGraph, GraphError};
use crate::model::{NodeId, NodeKind, ShortId, StringId, TextSlot};
use crate::overlay::{OverlayProvider, TranslationUnit};

/// Shown once before a conversation root's own text.
pub const CONVERSATION_BANNER: &str = "[Beginning  of conversation]";

/// Shown when descent reaches a node with no valid children.
pub const END_MARKER: &str = "[End of conversation]";

/// Prefix for translations still awaiting review.
pub const NEEDS_REVISION_MARKER: &str = "[수정 필요] ";

/// Visual weight hint for a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    #[default]
    Normal,
    /// Fuzzy translation.
    Attention,
    /// Approved translation.
    Approved,
}

impl Emphasis {
    /// Approved wins over fuzzy when a unit carries both flags.
    #[must_use]
    pub const fn for_unit(unit: &TranslationUnit) -> Self {
        if unit.approved {
            Self::Approved
        } else if unit.fuzzy {
            Self::Attention
        } else {
            Self::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineRole {
    Source,
    Translation,
}

/// One printable line of a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextLine {
    pub role: LineRole,
    pub label: &'static str,
    /// The label occupies space but is not drawn (translation printed under
    /// its source).
    pub label_hidden: bool,
    pub text: String,
    pub emphasis: Emphasis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSlot {
    pub slot: TextSlot,
    pub string_id: StringId,
    pub lines: Vec<TextLine>,
    /// Editor URL for this string, when the overlay knows one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Speaker plus resolved text for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NarrativeBlock {
    pub node: NodeId,
    pub short_id: ShortId,
    pub kind: NodeKind,
    /// `None` for a text-less conversation root, which shows only the banner.
    pub speaker: Option<String>,
    pub conversation_start: bool,
    /// Identifier tag, present when `show_dialogue_id` is on.
    pub tag: Option<ShortId>,
    pub slots: Vec<ResolvedSlot>,
}

/// One offered choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceEntry {
    /// 1-based.
    pub display_index: usize,
    pub speaker: String,
    pub text: String,
    pub target: NodeId,
    pub short_id: ShortId,
    pub emphasis: Emphasis,
}

/// Resolves node text against a graph, an overlay and display settings.
#[derive(Clone, Copy)]
pub struct TextResolver<'a> {
    graph: &'a DialogueGraph,
    overlay: &'a dyn OverlayProvider,
    display: DisplayConfig,
}

impl std::fmt::Debug for TextResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextResolver")
            .field("nodes", &self.graph.len())
            .field("display", &self.display)
            .finish_non_exhaustive()
    }
}

impl<'a> TextResolver<'a> {
    #[must_use]
    pub const fn new(
        graph: &'a DialogueGraph,
        overlay: &'a dyn OverlayProvider,
        display: DisplayConfig,
    ) -> Self {
        Self {
            graph,
            overlay,
            display,
        }
    }

    #[must_use]
    pub const fn graph(&self) -> &'a DialogueGraph {
        self.graph
    }

    #[must_use]
    pub const fn display(&self) -> DisplayConfig {
        self.display
    }

    /// The block shown for `id`, or `None` for a text-less non-conversation
    /// node.
    ///
    /// # Errors
    ///
    /// Returns an unresolved-reference error when the node or one of its
    /// string ids is missing.
    pub fn narrative_block(&self, id: NodeId) -> Result<Option<NarrativeBlock>, GraphError> {
        let node = self.graph.node(id)?;
        let conversation_start = node.kind == NodeKind::Conversation;
        if !node.has_text() && !conversation_start {
            return Ok(None);
        }

        let mut block = NarrativeBlock {
            node: id,
            short_id: node.short_id(),
            kind: node.kind,
            speaker: None,
            conversation_start,
            tag: None,
            slots: Vec::new(),
        };
        if !node.has_text() {
            return Ok(Some(block));
        }

        block.speaker = Some(node.speaker.clone());
        if self.display.show_dialogue_id {
            block.tag = Some(node.short_id());
        }
        for (slot, string_id) in node.text_slots() {
            block.slots.push(self.resolve_slot(slot, string_id)?);
        }
        Ok(Some(block))
    }

    /// Resolve one slot to its printable lines.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnresolvedString`] if `string_id` is missing.
    pub fn resolve_slot(
        &self,
        slot: TextSlot,
        string_id: StringId,
    ) -> Result<ResolvedSlot, GraphError> {
        let source = self.graph.text(string_id)?;
        let label = slot.label();
        let translation = self.translation_for(string_id);

        let mut lines = Vec::with_capacity(2);
        let alongside = self.display.show_source_alongside_translation;
        if translation.is_none() || alongside {
            lines.push(TextLine {
                role: LineRole::Source,
                label,
                label_hidden: false,
                text: source.to_string(),
                emphasis: Emphasis::Normal,
            });
        }
        if let Some(unit) = translation {
            lines.push(TextLine {
                role: LineRole::Translation,
                label,
                label_hidden: alongside,
                text: translated_text(&unit),
                emphasis: Emphasis::for_unit(&unit),
            });
        }

        Ok(ResolvedSlot {
            slot,
            string_id,
            lines,
            link: self.overlay.editor_link(string_id),
        })
    }

    /// The entry for `id` in a choice list.
    ///
    /// Uses the paraphrase, falling back to body text and then hover text.
    /// A choice never shows its source next to the translation.
    ///
    /// # Errors
    ///
    /// Returns an unresolved-reference error when the node or its string is
    /// missing.
    pub fn choice_entry(&self, display_index: usize, id: NodeId) -> Result<ChoiceEntry, GraphError> {
        let node = self.graph.node(id)?;
        let string_id = node
            .paraphrase
            .or(node.body_text)
            .or(node.hover_text);

        let (text, emphasis) = match string_id {
            None => (String::new(), Emphasis::Normal),
            Some(string_id) => {
                let source = self.graph.text(string_id)?;
                match self.translation_for(string_id) {
                    Some(unit) => (translated_text(&unit), Emphasis::for_unit(&unit)),
                    None => (source.to_string(), Emphasis::Normal),
                }
            }
        };

        Ok(ChoiceEntry {
            display_index,
            speaker: node.speaker.clone(),
            text,
            target: id,
            short_id: node.short_id(),
            emphasis,
        })
    }

    /// A usable translation for `id`, or `None` when translation is off, the
    /// overlay has nothing, the unit is untranslated, or the lookup failed.
    fn translation_for(&self, id: StringId) -> Option<TranslationUnit> {
        if !self.display.enable_translation {
            return None;
        }
        match self.overlay.lookup(id) {
            Ok(Some(unit)) if unit.has_translation() => Some(unit),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(string = %id, error = %err, "overlay lookup failed; showing source");
                None
            }
        }
    }
}

fn translated_text(unit: &TranslationUnit) -> String {
    if unit.fuzzy {
        format!("{NEEDS_REVISION_MARKER}{}", unit.target)
    } else {
        unit.target.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::model::{RawDatabase, RawNode};
    use crate::overlay::{NoOverlay, OverlayError, StaticOverlay};
    use std::cell::Cell;
    use uuid::Uuid;

    const X: u128 = 0x0000_0010_u128 << 96;
    const ROOT: u128 = 0x0000_0001_u128 << 96;
    const EMPTY_ROOT: u128 = 0x0000_0002_u128 << 96;

    fn graph() -> DialogueGraph {
        let mut x = RawNode::new(Uuid::from_u128(X), NodeKind::Line);
        x.text = 5;
        x.speaker = "Varric".into();
        let mut root = RawNode::new(Uuid::from_u128(ROOT), NodeKind::Conversation);
        root.paraphrase = 6;
        root.text = 5;
        let empty_root = RawNode::new(Uuid::from_u128(EMPTY_ROOT), NodeKind::Conversation);

        GraphBuilder::new()
            .build(RawDatabase {
                conversations: vec![x, root, empty_root],
                string_table: [
                    ("5".to_string(), "Hello".to_string()),
                    ("6".to_string(), "Greet".to_string()),
                ]
                .into(),
            })
            .unwrap()
    }

    fn sid(n: u32) -> StringId {
        StringId::from_raw(n).unwrap()
    }

    fn texts(block: &NarrativeBlock) -> Vec<String> {
        block
            .slots
            .iter()
            .flat_map(|s| s.lines.iter().map(|l| format!("{}{}", l.label, l.text)))
            .collect()
    }

    fn fuzzy_hello() -> StaticOverlay {
        StaticOverlay::new().with(
            sid(5),
            TranslationUnit {
                source: "Hello".into(),
                target: "안녕".into(),
                fuzzy: true,
                translated: false,
                approved: false,
            },
        )
    }

    struct Failing {
        calls: Cell<usize>,
    }

    impl OverlayProvider for Failing {
        fn lookup(&self, _id: StringId) -> Result<Option<TranslationUnit>, OverlayError> {
            self.calls.set(self.calls.get() + 1);
            Err(OverlayError::Transport("connection refused".into()))
        }
    }

    #[test]
    fn translation_disabled_shows_source_only() {
        let g = graph();
        let overlay = fuzzy_hello();
        let resolver = TextResolver::new(&g, &overlay, DisplayConfig::default());
        let block = resolver
            .narrative_block(NodeId::from_u128(X))
            .unwrap()
            .unwrap();
        assert_eq!(texts(&block), vec!["Hello"]);
        assert_eq!(block.speaker.as_deref(), Some("Varric"));
        assert!(block.tag.is_none());
    }

    #[test]
    fn fuzzy_translation_replaces_source() {
        let g = graph();
        let overlay = fuzzy_hello();
        let display = DisplayConfig {
            enable_translation: true,
            ..DisplayConfig::default()
        };
        let block = TextResolver::new(&g, &overlay, display)
            .narrative_block(NodeId::from_u128(X))
            .unwrap()
            .unwrap();
        assert_eq!(texts(&block), vec!["[수정 필요] 안녕"]);
        assert_eq!(block.slots[0].lines[0].emphasis, Emphasis::Attention);
    }

    #[test]
    fn source_alongside_comes_first() {
        let g = graph();
        let overlay = fuzzy_hello();
        let display = DisplayConfig {
            enable_translation: true,
            show_source_alongside_translation: true,
            ..DisplayConfig::default()
        };
        let block = TextResolver::new(&g, &overlay, display)
            .narrative_block(NodeId::from_u128(X))
            .unwrap()
            .unwrap();
        let lines = &block.slots[0].lines;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].role, LineRole::Source);
        assert_eq!(lines[0].text, "Hello");
        assert_eq!(lines[1].role, LineRole::Translation);
        assert!(lines[1].label_hidden);
    }

    #[test]
    fn untranslated_unit_falls_back_to_source() {
        let g = graph();
        let overlay = StaticOverlay::new().with(
            sid(5),
            TranslationUnit {
                target: String::new(),
                ..TranslationUnit::default()
            },
        );
        let display = DisplayConfig {
            enable_translation: true,
            show_source_alongside_translation: true,
            ..DisplayConfig::default()
        };
        let block = TextResolver::new(&g, &overlay, display)
            .narrative_block(NodeId::from_u128(X))
            .unwrap()
            .unwrap();
        assert_eq!(texts(&block), vec!["Hello"]);
    }

    #[test]
    fn overlay_failure_falls_back_to_source() {
        let g = graph();
        let overlay = Failing {
            calls: Cell::new(0),
        };
        let display = DisplayConfig {
            enable_translation: true,
            ..DisplayConfig::default()
        };
        let block = TextResolver::new(&g, &overlay, display)
            .narrative_block(NodeId::from_u128(X))
            .unwrap()
            .unwrap();
        assert_eq!(texts(&block), vec!["Hello"]);
        assert_eq!(overlay.calls.get(), 1);
    }

    #[test]
    fn approved_wins_over_fuzzy() {
        let unit = TranslationUnit {
            fuzzy: true,
            approved: true,
            ..TranslationUnit::default()
        };
        assert_eq!(Emphasis::for_unit(&unit), Emphasis::Approved);
    }

    #[test]
    fn approved_translation_replaces_source_without_marker() {
        let g = graph();
        let overlay = StaticOverlay::new().with(
            sid(6),
            TranslationUnit {
                source: "Greet".into(),
                target: "인사".into(),
                fuzzy: false,
                translated: true,
                approved: true,
            },
        );
        let display = DisplayConfig {
            enable_translation: true,
            ..DisplayConfig::default()
        };
        let resolver = TextResolver::new(&g, &overlay, display);

        let slot = resolver.resolve_slot(TextSlot::Paraphrase, sid(6)).unwrap();
        assert_eq!(slot.lines.len(), 1);
        assert_eq!(slot.lines[0].role, LineRole::Translation);
        assert_eq!(slot.lines[0].text, "인사");
        assert_eq!(slot.lines[0].label, "Paraphrase: ");
        assert!(!slot.lines[0].label_hidden);
        assert_eq!(slot.lines[0].emphasis, Emphasis::Approved);

        let block = resolver
            .narrative_block(NodeId::from_u128(ROOT))
            .unwrap()
            .unwrap();
        assert_eq!(texts(&block), vec!["Paraphrase: 인사", "Hello"]);
        assert_eq!(block.slots[0].lines[0].emphasis, Emphasis::Approved);
        assert_eq!(block.slots[1].lines[0].emphasis, Emphasis::Normal);
    }

    #[test]
    fn conversation_root_with_text_has_banner_and_slots() {
        let g = graph();
        let display = DisplayConfig {
            show_dialogue_id: true,
            ..DisplayConfig::default()
        };
        let block = TextResolver::new(&g, &NoOverlay, display)
            .narrative_block(NodeId::from_u128(ROOT))
            .unwrap()
            .unwrap();
        assert!(block.conversation_start);
        assert_eq!(texts(&block), vec!["Paraphrase: Greet", "Hello"]);
        assert_eq!(block.tag.map(|t| t.to_string()).as_deref(), Some("00000001"));
    }

    #[test]
    fn textless_conversation_shows_only_banner() {
        let g = graph();
        let display = DisplayConfig {
            show_dialogue_id: true,
            ..DisplayConfig::default()
        };
        let block = TextResolver::new(&g, &NoOverlay, display)
            .narrative_block(NodeId::from_u128(EMPTY_ROOT))
            .unwrap()
            .unwrap();
        assert!(block.conversation_start);
        assert!(block.speaker.is_none());
        assert!(block.tag.is_none());
        assert!(block.slots.is_empty());
    }

    #[test]
    fn choice_prefers_paraphrase() {
        let g = graph();
        let resolver = TextResolver::new(&g, &NoOverlay, DisplayConfig::default());
        let entry = resolver.choice_entry(2, NodeId::from_u128(ROOT)).unwrap();
        assert_eq!(entry.text, "Greet");
        assert_eq!(entry.display_index, 2);

        let entry = resolver.choice_entry(1, NodeId::from_u128(X)).unwrap();
        assert_eq!(entry.text, "Hello");
        assert_eq!(entry.speaker, "Varric");
    }

    #[test]
    fn choice_uses_translation_without_source() {
        let g = graph();
        let overlay = fuzzy_hello();
        let display = DisplayConfig {
            enable_translation: true,
            show_source_alongside_translation: true,
            ..DisplayConfig::default()
        };
        let entry = TextResolver::new(&g, &overlay, display)
            .choice_entry(1, NodeId::from_u128(X))
            .unwrap();
        assert_eq!(entry.text, "[수정 필요] 안녕");
        assert_eq!(entry.emphasis, Emphasis::Attention);
    }

    #[test]
    fn resolution_is_idempotent() {
        let g = graph();
        let overlay = fuzzy_hello();
        let display = DisplayConfig {
            enable_translation: true,
            ..DisplayConfig::default()
        };
        let resolver = TextResolver::new(&g, &overlay, display);
        let first = resolver.narrative_block(NodeId::from_u128(X)).unwrap();
        let second = resolver.narrative_block(NodeId::from_u128(X)).unwrap();
        assert_eq!(first, second);
    }
}
