//! Terminal rendering of transcript blocks.
//!
//! Pretty mode mirrors a reading layout: a blank line between blocks, the
//! speaker on its own line, slot labels aligned so a translation sits
//! directly under its source. Text mode drops the spacing and prefixes each
//! narrative with its short id so lines can be grepped.

use std::io::{self, Write};

use parley_core::session::{Block, TranscriptEntry};
use parley_core::text::{
    CONVERSATION_BANNER, ChoiceEntry, END_MARKER, Emphasis, NarrativeBlock, TextLine,
};

use crate::output::OutputMode;

pub fn write_entries<'e>(
    w: &mut dyn Write,
    mode: OutputMode,
    entries: impl IntoIterator<Item = &'e TranscriptEntry>,
) -> io::Result<()> {
    for (i, entry) in entries.into_iter().enumerate() {
        if mode.is_pretty() && i > 0 {
            writeln!(w)?;
        }
        write_block(w, mode, &entry.block)?;
    }
    Ok(())
}

pub fn write_block(w: &mut dyn Write, mode: OutputMode, block: &Block) -> io::Result<()> {
    match block {
        Block::Narrative(narrative) => write_narrative(w, mode, narrative),
        Block::Choices { entries } => write_choices(w, entries),
        Block::End => writeln!(w, "{END_MARKER}"),
    }
}

pub fn write_narrative(
    w: &mut dyn Write,
    mode: OutputMode,
    block: &NarrativeBlock,
) -> io::Result<()> {
    if block.conversation_start {
        writeln!(w, "{CONVERSATION_BANNER}")?;
        if block.speaker.is_none() {
            return Ok(());
        }
        if mode.is_pretty() {
            writeln!(w)?;
        }
    }

    let speaker = block.speaker.as_deref().unwrap_or_default();
    match (mode, block.tag) {
        (OutputMode::Text, _) => writeln!(w, "{} {speaker}", block.short_id)?,
        (_, Some(tag)) => writeln!(w, "{speaker} {tag}")?,
        (_, None) => writeln!(w, "{speaker}")?,
    }

    for slot in &block.slots {
        for line in &slot.lines {
            write_line(w, mode, line)?;
        }
        if mode.is_pretty()
            && let Some(link) = &slot.link
        {
            writeln!(w, "  <{link}>")?;
        }
    }
    Ok(())
}

fn write_line(w: &mut dyn Write, mode: OutputMode, line: &TextLine) -> io::Result<()> {
    let label = if line.label_hidden && mode.is_pretty() {
        " ".repeat(line.label.chars().count())
    } else {
        line.label.to_string()
    };
    let indent = if mode.is_pretty() { "" } else { "  " };
    writeln!(w, "{indent}{label}{}{}", line.text, emphasis_suffix(mode, line.emphasis))
}

fn write_choices(w: &mut dyn Write, entries: &[ChoiceEntry]) -> io::Result<()> {
    for entry in entries {
        writeln!(w, "[{}] {} : {}", entry.display_index, entry.speaker, entry.text)?;
    }
    Ok(())
}

/// Text mode has no color, so review state is spelled out.
const fn emphasis_suffix(mode: OutputMode, emphasis: Emphasis) -> &'static str {
    match (mode, emphasis) {
        (OutputMode::Text, Emphasis::Approved) => "  (approved)",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::model::{NodeId, NodeKind, StringId, TextSlot};
    use parley_core::text::{LineRole, ResolvedSlot};

    fn render(mode: OutputMode, block: &Block) -> String {
        let mut buf = Vec::new();
        write_block(&mut buf, mode, block).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn line(role: LineRole, label: &'static str, hidden: bool, text: &str) -> TextLine {
        TextLine {
            role,
            label,
            label_hidden: hidden,
            text: text.to_string(),
            emphasis: Emphasis::Normal,
        }
    }

    fn narrative(slots: Vec<ResolvedSlot>, tag: bool) -> Block {
        let node = NodeId::from_u128(0x1a2b_3c4d << 96);
        Block::Narrative(NarrativeBlock {
            node,
            short_id: node.short(),
            kind: NodeKind::Line,
            speaker: Some("Varric".into()),
            conversation_start: false,
            tag: tag.then(|| node.short()),
            slots,
        })
    }

    fn paraphrase_with_translation() -> ResolvedSlot {
        ResolvedSlot {
            slot: TextSlot::Paraphrase,
            string_id: StringId::from_raw(3).unwrap(),
            lines: vec![
                line(LineRole::Source, "Paraphrase: ", false, "Sure."),
                line(LineRole::Translation, "Paraphrase: ", true, "그래."),
            ],
            link: None,
        }
    }

    #[test]
    fn hidden_label_aligns_translation_under_source() {
        let out = render(OutputMode::Pretty, &narrative(vec![paraphrase_with_translation()], false));
        assert_eq!(out, "Varric\nParaphrase: Sure.\n            그래.\n");
    }

    #[test]
    fn tag_follows_speaker() {
        let out = render(OutputMode::Pretty, &narrative(Vec::new(), true));
        assert_eq!(out, "Varric 1a2b3c4d\n");
    }

    #[test]
    fn text_mode_prefixes_short_id_and_keeps_labels() {
        let out = render(OutputMode::Text, &narrative(vec![paraphrase_with_translation()], false));
        assert_eq!(
            out,
            "1a2b3c4d Varric\n  Paraphrase: Sure.\n  Paraphrase: 그래.\n"
        );
    }

    #[test]
    fn textless_root_shows_only_banner() {
        let node = NodeId::from_u128(1 << 96);
        let block = Block::Narrative(NarrativeBlock {
            node,
            short_id: node.short(),
            kind: NodeKind::Conversation,
            speaker: None,
            conversation_start: true,
            tag: None,
            slots: Vec::new(),
        });
        assert_eq!(render(OutputMode::Pretty, &block), format!("{CONVERSATION_BANNER}\n"));
    }

    #[test]
    fn choices_are_numbered() {
        let node = NodeId::from_u128(2 << 96);
        let block = Block::Choices {
            entries: vec![ChoiceEntry {
                display_index: 1,
                speaker: "Sera".into(),
                text: "Nope.".into(),
                target: node,
                short_id: node.short(),
                emphasis: Emphasis::Normal,
            }],
        };
        assert_eq!(render(OutputMode::Text, &block), "[1] Sera : Nope.\n");
    }

    #[test]
    fn end_marker() {
        assert_eq!(render(OutputMode::Pretty, &Block::End), format!("{END_MARKER}\n"));
    }
}
