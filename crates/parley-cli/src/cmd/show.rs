//! `parley show`: everything known about one node.

use std::io::Write;

use clap::Args;
use parley_core::graph::valid_children;
use parley_core::model::{NodeId, NodeKind, ShortId};
use parley_core::text::{ChoiceEntry, NarrativeBlock};
use serde::Serialize;

use super::{find_node, surface};
use crate::output::{OutputMode, pretty_kv, pretty_section, render};
use crate::project::Project;
use crate::render::write_narrative;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Node to inspect: full GUID or its first 8 hex characters.
    pub node: String,
}

#[derive(Debug, Serialize)]
pub struct NodeDetail {
    pub id: NodeId,
    pub short_id: ShortId,
    pub kind: NodeKind,
    pub speaker: String,
    pub parent: Option<NodeId>,
    pub obsolete: bool,
    /// Raw outgoing edges as stored, before pruning.
    pub edges: Vec<NodeId>,
    pub block: Option<NarrativeBlock>,
    pub valid_children: Vec<ChoiceEntry>,
    pub referrers: Vec<NodeId>,
}

/// # Errors
///
/// Database load failures, an unknown node, or unresolved references.
pub fn run_show(args: &ShowArgs, project: &Project) -> anyhow::Result<()> {
    let output = project.output;
    let graph = project.load_graph()?;
    let overlay = project.overlay()?;
    let resolver = project.resolver(&graph, &*overlay);
    let node = find_node(&graph, &args.node, output)?;

    let block = surface(output, resolver.narrative_block(node.id))?;
    let children = surface(output, valid_children(&graph, node.id))?;
    let valid_children = surface(
        output,
        children
            .iter()
            .enumerate()
            .map(|(i, id)| resolver.choice_entry(i + 1, *id))
            .collect::<Result<Vec<_>, _>>(),
    )?;

    let detail = NodeDetail {
        id: node.id,
        short_id: node.short_id(),
        kind: node.kind,
        speaker: node.speaker.clone(),
        parent: node.parent,
        obsolete: node.is_obsolete(),
        edges: node.outgoing().collect(),
        block,
        valid_children,
        referrers: graph.referrers(node.id).to_vec(),
    };

    render(output, &detail, |d, w| match output {
        OutputMode::Pretty => write_pretty(d, w),
        _ => write_text(d, w),
    })
}

fn write_pretty(d: &NodeDetail, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("Node {}", d.short_id))?;
    pretty_kv(w, "id", d.id.to_string())?;
    pretty_kv(w, "kind", d.kind.as_str())?;
    pretty_kv(w, "speaker", &d.speaker)?;
    pretty_kv(w, "parent", optional(d.parent))?;
    if d.obsolete {
        pretty_kv(w, "status", "obsolete")?;
    }
    writeln!(w)?;

    if let Some(block) = &d.block {
        write_narrative(w, OutputMode::Pretty, block)?;
        writeln!(w)?;
    }

    pretty_section(w, &format!("Valid children ({})", d.valid_children.len()))?;
    for child in &d.valid_children {
        writeln!(
            w,
            "[{}] {} {} : {}",
            child.display_index, child.short_id, child.speaker, child.text
        )?;
    }
    writeln!(w)?;

    pretty_section(w, &format!("Referrers ({})", d.referrers.len()))?;
    for referrer in &d.referrers {
        writeln!(w, "{}", referrer.short())?;
    }
    Ok(())
}

fn write_text(d: &NodeDetail, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "id={}", d.id)?;
    writeln!(w, "kind={}", d.kind.as_str())?;
    writeln!(w, "speaker={}", d.speaker)?;
    writeln!(w, "parent={}", optional(d.parent))?;
    writeln!(w, "obsolete={}", d.obsolete)?;
    for child in &d.valid_children {
        writeln!(w, "child={} {}", child.target, child.text)?;
    }
    for referrer in &d.referrers {
        writeln!(w, "referrer={referrer}")?;
    }
    Ok(())
}

fn optional(id: Option<NodeId>) -> String {
    id.map_or_else(|| "-".to_string(), |id| id.to_string())
}
