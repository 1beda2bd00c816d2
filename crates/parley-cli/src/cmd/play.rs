//! `parley play`: run a conversation non-interactively.
//!
//! Starts at a node, optionally loads extra history pages, then applies the
//! `--choose` picks in order. Stops early (with an error) if a pick is not
//! among the choices on screen at that point.

use std::io::Write;

use clap::Args;
use parley_core::model::NodeId;
use parley_core::session::{NavigationSession, Outcome, TranscriptEntry};
use serde::Serialize;

use super::surface;
use crate::output::{OutputMode, render};
use crate::project::Project;
use crate::render::write_entries;

#[derive(Args, Debug)]
pub struct PlayArgs {
    /// Start node: full GUID or its first 8 hex characters.
    pub node: String,

    /// Take the N-th offered choice (1-based). Repeat to keep walking.
    #[arg(long = "choose", value_name = "N")]
    pub choices: Vec<usize>,

    /// Additional history pages to load above the start node.
    #[arg(long, value_name = "PAGES", default_value_t = 0)]
    pub history: usize,
}

#[derive(Debug, Serialize)]
struct PlayReport<'a> {
    outcome: Outcome,
    current: Option<NodeId>,
    oldest: Option<NodeId>,
    transcript: &'a [TranscriptEntry],
}

/// # Errors
///
/// Database load failures, an unknown start node, an invalid pick, or a
/// cycle hit during descent.
pub fn run_play(args: &PlayArgs, project: &Project) -> anyhow::Result<()> {
    let output = project.output;
    let graph = project.load_graph()?;
    let overlay = project.overlay()?;
    let mut session = NavigationSession::new(project.resolver(&graph, &*overlay));

    let mut outcome = surface(output, session.start_by_ref(&args.node))?;
    for _ in 0..args.history {
        if surface(output, session.load_more_history())? == 0 {
            break;
        }
    }
    for pick in &args.choices {
        outcome = surface(output, session.choose_index(*pick))?;
    }

    if outcome == Outcome::Stalled {
        tracing::warn!(node = %args.node, "start node has no text and no children");
    }

    let report = PlayReport {
        outcome,
        current: session.current(),
        oldest: session.oldest(),
        transcript: session.transcript(),
    };
    render(output, &report, |report, w| {
        if report.outcome == Outcome::Stalled && output == OutputMode::Pretty {
            writeln!(w, "(nothing to show: the node has no text and leads nowhere)")?;
        }
        write_entries(w, output, report.transcript)
    })
}
