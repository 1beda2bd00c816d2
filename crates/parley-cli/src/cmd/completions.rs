//! `parley completions <shell>`.

use clap::Args;
use clap_complete::{Shell, generate};

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate the completion script for.
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Write the completion script for `command` to stdout, named after the
/// binary clap reports.
pub fn run_completions(args: &CompletionsArgs, command: &mut clap::Command) -> anyhow::Result<()> {
    let bin = command.get_name().to_string();
    generate(args.shell, command, bin, &mut std::io::stdout());
    Ok(())
}
