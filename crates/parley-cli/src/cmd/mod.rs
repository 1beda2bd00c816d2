pub mod auth;
pub mod check;
pub mod children;
pub mod completions;
pub mod config;
pub mod history;
pub mod play;
pub mod repl;
pub mod show;
pub mod stats;

use parley_core::graph::DialogueGraph;
use parley_core::model::Node;
use parley_core::session::SessionError;

use crate::output::{CliError, OutputMode, fail};

/// Render a library error and turn it into the command's failure.
pub fn surface<T, E>(output: OutputMode, result: Result<T, E>) -> anyhow::Result<T>
where
    for<'e> CliError: From<&'e E>,
{
    result.or_else(|err| fail(output, &CliError::from(&err)))
}

/// Look up a user-typed node reference (full GUID or 8-hex short id).
pub fn find_node<'g>(
    graph: &'g DialogueGraph,
    reference: &str,
    output: OutputMode,
) -> anyhow::Result<&'g Node> {
    match graph.find(reference) {
        Some(node) => Ok(node),
        None => {
            let err = SessionError::NotFound(reference.trim().to_string());
            fail(output, &CliError::from(&err))
        }
    }
}
