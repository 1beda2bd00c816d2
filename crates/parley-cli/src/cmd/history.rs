use std::io::Write;

use clap::Args;
use parley_core::model::NodeId;
use parley_core::session::history_page;
use parley_core::text::NarrativeBlock;
use serde::Serialize;

use super::{find_node, surface};
use crate::output::render;
use crate::project::Project;
use crate::render::write_narrative;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Node whose ancestors to show.
    pub node: String,

    /// How many pages of ten parent hops to walk.
    #[arg(long, default_value_t = 1)]
    pub pages: usize,
}

#[derive(Debug, Serialize)]
struct HistoryReport {
    node: NodeId,
    /// Earliest node reached.
    reached: NodeId,
    at_root: bool,
    pages: usize,
    blocks: Vec<NarrativeBlock>,
}

/// Show ancestor blocks of a node, furthest first. Stops early at the root.
///
/// # Errors
///
/// Database load failures, an unknown node, or unresolved references.
pub fn run_history(args: &HistoryArgs, project: &Project) -> anyhow::Result<()> {
    let output = project.output;
    let graph = project.load_graph()?;
    let overlay = project.overlay()?;
    let resolver = project.resolver(&graph, &*overlay);
    let node = find_node(&graph, &args.node, output)?;

    let mut blocks: Vec<NarrativeBlock> = Vec::new();
    let mut reached = node.id;
    let mut pages = 0;
    while pages < args.pages {
        let page = surface(output, history_page(&resolver, reached))?;
        if page.reached == reached {
            break;
        }
        pages += 1;
        reached = page.reached;
        blocks.splice(0..0, page.blocks);
    }

    let report = HistoryReport {
        node: node.id,
        reached,
        at_root: graph.get(reached).is_some_and(|n| n.parent.is_none()),
        pages,
        blocks,
    };
    render(output, &report, |report, w| {
        for (i, block) in report.blocks.iter().enumerate() {
            if output.is_pretty() && i > 0 {
                writeln!(w)?;
            }
            write_narrative(w, output, block)?;
        }
        Ok(())
    })
}
