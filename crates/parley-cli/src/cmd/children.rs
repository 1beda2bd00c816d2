use std::io::Write;

use clap::Args;
use parley_core::graph::valid_children;
use parley_core::text::ChoiceEntry;

use super::{find_node, surface};
use crate::output::{OutputMode, render};
use crate::project::Project;

#[derive(Args, Debug)]
pub struct ChildrenArgs {
    /// Node whose presentable children to list.
    pub node: String,
}

/// List the valid children of a node, with text resolved as choices.
///
/// # Errors
///
/// Database load failures, an unknown node, a cycle of text-less nodes, or
/// unresolved references.
pub fn run_children(args: &ChildrenArgs, project: &Project) -> anyhow::Result<()> {
    let output = project.output;
    let graph = project.load_graph()?;
    let overlay = project.overlay()?;
    let resolver = project.resolver(&graph, &*overlay);
    let node = find_node(&graph, &args.node, output)?;

    let ids = surface(output, valid_children(&graph, node.id))?;
    let entries: Vec<ChoiceEntry> = surface(
        output,
        ids.iter()
            .enumerate()
            .map(|(i, id)| resolver.choice_entry(i + 1, *id))
            .collect::<Result<_, _>>(),
    )?;

    render(output, &entries, |entries, w| {
        if entries.is_empty() && output == OutputMode::Pretty {
            writeln!(w, "(no valid children)")?;
        }
        for entry in entries {
            match output {
                OutputMode::Pretty => writeln!(
                    w,
                    "[{}] {} : {}  ({})",
                    entry.display_index, entry.speaker, entry.text, entry.short_id
                )?,
                _ => writeln!(w, "{}\t{}\t{}", entry.target, entry.speaker, entry.text)?,
            }
        }
        Ok(())
    })
}
