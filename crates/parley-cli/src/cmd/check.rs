//! `parley check`: whole-database health report.
//!
//! Exits non-zero when a loop would trap navigation or a string id does not
//! resolve. Short-id collisions and obsolete nodes are reported but do not
//! fail the check.

use std::io::Write;

use clap::Args;
use parley_core::ErrorCode;
use parley_core::graph::diagnostics::{GraphReport, analyze};
use parley_core::model::NodeId;
use parley_core::timing;

use crate::output::{CliError, OutputMode, fail, pretty_kv, pretty_section, render};
use crate::project::Project;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Also list every obsolete node.
    #[arg(long)]
    pub obsolete: bool,
}

/// # Errors
///
/// Database load failures, or a report containing navigation errors.
pub fn run_check(args: &CheckArgs, project: &Project) -> anyhow::Result<()> {
    let output = project.output;
    let graph = project.load_graph()?;
    let report = timing::timed("graph.analyze", || analyze(&graph));

    render(output, &report, |report, w| match output {
        OutputMode::Pretty => write_pretty(report, args.obsolete, w),
        _ => write_text(report, args.obsolete, w),
    })?;

    if !report.structural_cycles.is_empty() || !report.auto_advance_cycles.is_empty() {
        let loops = report.structural_cycles.len() + report.auto_advance_cycles.len();
        return fail(
            output,
            &CliError::with_code(
                format!("{loops} loop(s) would trap navigation"),
                ErrorCode::CyclicGraph,
            )
            .suggest("break the loop by giving one node text or a second child"),
        );
    }
    if report.has_errors() {
        return fail(
            output,
            &CliError::with_code(
                format!("{} string reference(s) missing", report.missing_strings.len()),
                ErrorCode::UnresolvedReference,
            ),
        );
    }
    Ok(())
}

fn cycle_line(cycle: &[NodeId]) -> String {
    cycle
        .iter()
        .map(|id| id.short().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn write_pretty(report: &GraphReport, list_obsolete: bool, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Database check")?;
    pretty_kv(w, "nodes", report.nodes.to_string())?;
    pretty_kv(w, "roots", report.roots.len().to_string())?;
    pretty_kv(w, "obsolete", report.obsolete.len().to_string())?;
    pretty_kv(w, "collisions", report.collisions.len().to_string())?;
    pretty_kv(w, "dialogue loops", report.dialogue_loops.to_string())?;

    if !report.structural_cycles.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Cycles through text-less nodes")?;
        for cycle in &report.structural_cycles {
            writeln!(w, "{}", cycle_line(cycle))?;
        }
    }
    if !report.auto_advance_cycles.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Loops without a choice")?;
        for cycle in &report.auto_advance_cycles {
            writeln!(w, "{}", cycle_line(cycle))?;
        }
    }
    if !report.missing_strings.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Missing strings")?;
        for missing in &report.missing_strings {
            writeln!(w, "{} -> #{}", missing.node.short(), missing.string.get())?;
        }
    }
    if !report.collisions.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Short id collisions")?;
        for collision in &report.collisions {
            writeln!(
                w,
                "{}: {} shadows {}",
                collision.short, collision.kept, collision.shadowed
            )?;
        }
    }
    if list_obsolete && !report.obsolete.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Obsolete nodes")?;
        for id in &report.obsolete {
            writeln!(w, "{id}")?;
        }
    }

    writeln!(w)?;
    let verdict = if report.has_errors() { "FAILED" } else { "ok" };
    writeln!(w, "check: {verdict}")
}

fn write_text(report: &GraphReport, list_obsolete: bool, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "nodes={}", report.nodes)?;
    writeln!(w, "roots={}", report.roots.len())?;
    writeln!(w, "obsolete={}", report.obsolete.len())?;
    writeln!(w, "collisions={}", report.collisions.len())?;
    writeln!(w, "structural_cycles={}", report.structural_cycles.len())?;
    writeln!(w, "auto_advance_cycles={}", report.auto_advance_cycles.len())?;
    writeln!(w, "dialogue_loops={}", report.dialogue_loops)?;
    writeln!(w, "missing_strings={}", report.missing_strings.len())?;
    for cycle in report
        .structural_cycles
        .iter()
        .chain(&report.auto_advance_cycles)
    {
        writeln!(w, "cycle {}", cycle_line(cycle))?;
    }
    if list_obsolete {
        for id in &report.obsolete {
            writeln!(w, "obsolete {id}")?;
        }
    }
    writeln!(w, "ok={}", !report.has_errors())
}
