//! `parley repl`: interactive session on stdin.
//!
//! ```text
//! <n>       take choice n
//! h         load ten more hops of history
//! s <node>  restart at another node
//! q         quit
//! ```
//!
//! After every command only the blocks that were not on screen yet are
//! printed. In JSON mode each block is one line of JSON.

use std::collections::HashSet;
use std::io::{self, BufRead, Write};

use clap::Args;
use parley_core::session::{BlockId, NavigationSession, Outcome, SessionError};

use crate::output::{CliError, OutputMode, render_error};
use crate::project::Project;
use crate::render::write_block;

#[derive(Args, Debug)]
pub struct ReplArgs {
    /// Node to start at. Without it, wait for `s <node>`.
    pub node: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Choose(usize),
    History,
    Start(String),
    Quit,
    Help,
    Empty,
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    if let Ok(index) = line.parse::<usize>() {
        return Input::Choose(index);
    }
    match line.split_once(char::is_whitespace) {
        Some(("s" | "start", node)) if !node.trim().is_empty() => {
            Input::Start(node.trim().to_string())
        }
        _ => match line {
            "h" | "history" => Input::History,
            "q" | "quit" | "exit" => Input::Quit,
            _ => Input::Help,
        },
    }
}

const HELP: &str = "commands: <n> choose, h history, s <node> start, q quit";

/// # Errors
///
/// Database load failures or I/O errors on stdin/stdout. Navigation errors
/// are reported and the loop continues.
pub fn run_repl(args: &ReplArgs, project: &Project) -> anyhow::Result<()> {
    let graph = project.load_graph()?;
    let overlay = project.overlay()?;
    let session = NavigationSession::new(project.resolver(&graph, &*overlay));

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut repl = Repl {
        session,
        output: project.output,
        shown: HashSet::new(),
    };
    repl.drive(args.node.as_deref(), stdin.lock(), &mut stdout.lock())
}

struct Repl<'a> {
    session: NavigationSession<'a>,
    output: OutputMode,
    shown: HashSet<BlockId>,
}

impl Repl<'_> {
    fn drive(
        &mut self,
        start: Option<&str>,
        input: impl BufRead,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        if let Some(node) = start {
            self.apply(Input::Start(node.to_string()), out)?;
        } else if self.output != OutputMode::Json {
            writeln!(out, "{HELP}")?;
        }

        for line in input.lines() {
            match parse_input(&line?) {
                Input::Quit => break,
                Input::Empty => {}
                Input::Help => {
                    if self.output != OutputMode::Json {
                        writeln!(out, "{HELP}")?;
                    }
                }
                command => self.apply(command, out)?,
            }
            out.flush()?;
        }
        Ok(())
    }

    fn apply(&mut self, command: Input, out: &mut dyn Write) -> anyhow::Result<()> {
        let result = match command {
            Input::Choose(index) => self.session.choose_index(index).map(Some),
            Input::Start(node) => self.session.start_by_ref(&node).map(Some),
            Input::History => self.session.load_more_history().map(|_| None),
            Input::Quit | Input::Help | Input::Empty => return Ok(()),
        };

        match result {
            Ok(outcome) => {
                self.print_new(out)?;
                if outcome == Some(Outcome::Stalled) && self.output != OutputMode::Json {
                    writeln!(out, "(nothing to show: the node has no text and leads nowhere)")?;
                }
            }
            Err(err) => self.report(&err)?,
        }
        Ok(())
    }

    fn print_new(&mut self, out: &mut dyn Write) -> anyhow::Result<()> {
        let fresh: Vec<_> = self
            .session
            .transcript()
            .iter()
            .filter(|entry| !self.shown.contains(&entry.id))
            .collect();

        for entry in &fresh {
            match self.output {
                OutputMode::Json => {
                    serde_json::to_writer(&mut *out, entry)?;
                    writeln!(out)?;
                }
                mode => {
                    if mode.is_pretty() {
                        writeln!(out)?;
                    }
                    write_block(out, mode, &entry.block)?;
                }
            }
        }
        self.shown.extend(fresh.iter().map(|entry| entry.id));
        Ok(())
    }

    fn report(&self, err: &SessionError) -> anyhow::Result<()> {
        tracing::debug!(error = %err, "repl command failed");
        render_error(self.output, &CliError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(parse_input(" 2 "), Input::Choose(2));
        assert_eq!(parse_input("h"), Input::History);
        assert_eq!(parse_input("s 1a2b3c4d"), Input::Start("1a2b3c4d".into()));
        assert_eq!(parse_input("start  1a2b3c4d "), Input::Start("1a2b3c4d".into()));
        assert_eq!(parse_input("quit"), Input::Quit);
        assert_eq!(parse_input(""), Input::Empty);
        assert_eq!(parse_input("s"), Input::Help);
        assert_eq!(parse_input("dance"), Input::Help);
    }
}
