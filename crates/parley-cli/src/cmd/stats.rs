use std::io::Write;

use parley_core::graph::diagnostics::analyze;
use parley_core::model::NodeId;
use serde::Serialize;

use crate::output::{OutputMode, pretty_kv, pretty_section, render};
use crate::project::Project;

#[derive(Debug, Serialize)]
struct Stats {
    nodes: usize,
    conversations: usize,
    lines: usize,
    links: usize,
    strings: usize,
    roots: usize,
    obsolete: usize,
    collisions: usize,
    busiest_node: Option<NodeId>,
    busiest_referrers: usize,
}

/// Counts per node kind plus a few graph-wide figures.
///
/// # Errors
///
/// Database load failures.
pub fn run_stats(project: &Project) -> anyhow::Result<()> {
    let output = project.output;
    let graph = project.load_graph()?;
    let report = analyze(&graph);

    let stats = Stats {
        nodes: report.nodes,
        conversations: report.conversations,
        lines: report.lines,
        links: report.links,
        strings: report.strings,
        roots: report.roots.len(),
        obsolete: report.obsolete.len(),
        collisions: report.collisions.len(),
        busiest_node: report.max_fan_in.as_ref().map(|f| f.node),
        busiest_referrers: report.max_fan_in.as_ref().map_or(0, |f| f.referrers),
    };

    render(output, &stats, |s, w| {
        if output == OutputMode::Pretty {
            pretty_section(w, "Database")?;
            pretty_kv(w, "nodes", s.nodes.to_string())?;
            pretty_kv(w, "conversations", s.conversations.to_string())?;
            pretty_kv(w, "lines", s.lines.to_string())?;
            pretty_kv(w, "links", s.links.to_string())?;
            pretty_kv(w, "strings", s.strings.to_string())?;
            pretty_kv(w, "obsolete", s.obsolete.to_string())?;
            pretty_kv(w, "collisions", s.collisions.to_string())?;
            if let Some(node) = s.busiest_node {
                pretty_kv(
                    w,
                    "most linked",
                    format!("{} ({} referrers)", node.short(), s.busiest_referrers),
                )?;
            }
            Ok(())
        } else {
            writeln!(
                w,
                "nodes={} conversations={} lines={} links={} strings={} roots={} obsolete={} collisions={}",
                s.nodes, s.conversations, s.lines, s.links, s.strings, s.roots, s.obsolete, s.collisions
            )
        }
    })
}
