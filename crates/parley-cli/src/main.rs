#![forbid(unsafe_code)]

mod cmd;
mod output;
mod project;
mod render;
mod weblate;

use clap::{CommandFactory, Parser, Subcommand};
use output::OutputMode;
use parley_core::timing;
use project::{PathOverrides, Project};
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "parley: walk branching dialogue databases from the terminal",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit command timing report to stderr.
    #[arg(long, global = true)]
    timing: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for --format json.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Dialogue database (JSON). Defaults to data.database, else data/database.json.
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Weblate string index (CSV or JSON, chosen by extension).
    #[arg(long, global = true, value_name = "PATH")]
    index: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// The explicitly requested output mode, if any.
    fn format_flag(&self) -> Option<OutputMode> {
        self.format.or_else(|| self.json.then_some(OutputMode::Json))
    }

    fn overrides(&self) -> PathOverrides {
        PathOverrides {
            database: self.db.clone(),
            index: self.index.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Navigate",
        about = "Play a conversation from a node",
        long_about = "Start at a node, show one page of history above it, then descend until a choice or the end. Repeated --choose flags keep walking.",
        after_help = "EXAMPLES:\n    # Start at a conversation root\n    parley play 1a2b3c4d\n\n    # Take the second choice, then the first\n    parley play 1a2b3c4d --choose 2 --choose 1\n\n    # Emit machine-readable output\n    parley play 1a2b3c4d --format json"
    )]
    Play(cmd::play::PlayArgs),

    #[command(
        next_help_heading = "Navigate",
        about = "Interactive session",
        long_about = "Read commands from stdin: a number takes that choice, `h` loads more history, `s <node>` restarts, `q` quits.",
        after_help = "EXAMPLES:\n    # Start interactively\n    parley repl 1a2b3c4d\n\n    # Script a session\n    printf '2\\nh\\nq\\n' | parley repl 1a2b3c4d"
    )]
    Repl(cmd::repl::ReplArgs),

    #[command(
        next_help_heading = "Inspect",
        about = "Show one node",
        long_about = "Show a node's resolved text, its valid children and every node that points at it.",
        after_help = "EXAMPLES:\n    # Show a node by short id\n    parley show 1a2b3c4d\n\n    # Emit machine-readable output\n    parley show 1a2b3c4d --format json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Inspect",
        about = "List a node's valid children",
        long_about = "List the nodes that would be offered after a node, with text-less nodes flattened and obsolete ones pruned.",
        after_help = "EXAMPLES:\n    # List children\n    parley children 1a2b3c4d"
    )]
    Children(cmd::children::ChildrenArgs),

    #[command(
        next_help_heading = "Inspect",
        about = "Show what led to a node",
        long_about = "Walk parent pointers from a node, ten hops per page, and show the ancestors that have text.",
        after_help = "EXAMPLES:\n    # One page of history\n    parley history 1a2b3c4d\n\n    # Up to three pages\n    parley history 1a2b3c4d --pages 3"
    )]
    History(cmd::history::HistoryArgs),

    #[command(
        next_help_heading = "Database",
        about = "Check the database for navigation hazards",
        long_about = "Report obsolete nodes, short id collisions, loops and missing strings. Exits non-zero when a loop would trap navigation or a string is missing.",
        after_help = "EXAMPLES:\n    # Check the default database\n    parley check\n\n    # Check another file and list obsolete nodes\n    parley --db other.json check --obsolete"
    )]
    Check(cmd::check::CheckArgs),

    #[command(
        next_help_heading = "Database",
        about = "Database statistics",
        long_about = "Count nodes per kind, strings, roots, obsolete nodes and collisions.",
        after_help = "EXAMPLES:\n    # Print counts\n    parley stats\n\n    # Emit machine-readable output\n    parley stats --format json"
    )]
    Stats,

    #[command(
        next_help_heading = "Translation",
        about = "Test the Weblate API token",
        long_about = "Call the Weblate project endpoint with the configured token and report whether it was accepted.",
        after_help = "EXAMPLES:\n    # Check the token from config or PARLEY_WEBLATE_TOKEN\n    parley auth"
    )]
    Auth,

    #[command(
        next_help_heading = "Settings",
        about = "Show or edit configuration",
        long_about = "Show the effective configuration, or set and unset keys in the project (.parley/config.toml) or user config file. Changes are written immediately.",
        after_help = "EXAMPLES:\n    # Show effective config\n    parley config show\n\n    # Turn on translation for this project\n    parley config set display.enable_translation true\n\n    # Store the API token for this user\n    parley config set --scope user weblate.token <TOKEN>"
    )]
    Config(cmd::config::ConfigArgs),

    #[command(
        next_help_heading = "Settings",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    parley completions bash\n\n    # Generate zsh completions\n    parley completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("PARLEY_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "parley=debug,info"
        } else {
            "parley=info,warn"
        })
    });

    let format = env::var("PARLEY_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let timing_enabled = cli.timing || timing::timing_enabled_from_env();
    timing::set_timing_enabled(timing_enabled);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let project = Project::open(&project_root, cli.format_flag(), cli.overrides())?;

    let command_result = match &cli.command {
        Commands::Play(args) => timing::timed("cmd.play", || cmd::play::run_play(args, &project)),
        Commands::Repl(args) => timing::timed("cmd.repl", || cmd::repl::run_repl(args, &project)),
        Commands::Show(args) => timing::timed("cmd.show", || cmd::show::run_show(args, &project)),
        Commands::Children(args) => timing::timed("cmd.children", || {
            cmd::children::run_children(args, &project)
        }),
        Commands::History(args) => timing::timed("cmd.history", || {
            cmd::history::run_history(args, &project)
        }),
        Commands::Check(args) => {
            timing::timed("cmd.check", || cmd::check::run_check(args, &project))
        }
        Commands::Stats => timing::timed("cmd.stats", || cmd::stats::run_stats(&project)),
        Commands::Auth => timing::timed("cmd.auth", || cmd::auth::run_auth(&project)),
        Commands::Config(args) => {
            timing::timed("cmd.config", || cmd::config::run_config(args, &project))
        }
        Commands::Completions(args) => timing::timed("cmd.completions", || {
            let mut command = Cli::command();
            cmd::completions::run_completions(args, &mut command)
        }),
    };

    if timing_enabled {
        let report = timing::collect_report();
        if report.is_empty() {
            eprintln!("timing report: no samples recorded");
        } else {
            eprintln!("timing report:");
            eprintln!("{}", report.display_table());
        }
    }

    command_result
}
