//! `parley config`: inspect and edit the project and user config files.
//!
//! Every `set`/`unset` writes the file immediately. Keys are whitelisted per
//! scope: the API token may only live in the user file, database paths only
//! in the project file.

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Subcommand, ValueEnum};
use parley_core::config::{
    EffectiveConfig, load_toml_table, normalize_output_mode, project_config_path, resolve_config,
    user_config_path,
};
use std::path::{Path, PathBuf};
use toml::Value;

use crate::output::OutputMode;
use crate::project::Project;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Show resolved or raw configuration
    Show(ShowArgs),
    /// Set a configuration key in project or user scope
    Set(SetArgs),
    /// Unset a configuration key in project or user scope
    Unset(UnsetArgs),
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// Show raw project config only
    #[arg(long, conflicts_with = "user")]
    project: bool,

    /// Show raw user config only
    #[arg(long)]
    user: bool,
}

#[derive(Args, Debug)]
struct SetArgs {
    /// Scope to mutate
    #[arg(long, default_value = "project")]
    scope: ConfigScope,

    /// Dot path key (e.g. display.enable_translation, weblate.base_url)
    key: String,

    /// New value
    value: String,
}

#[derive(Args, Debug)]
struct UnsetArgs {
    /// Scope to mutate
    #[arg(long, default_value = "project")]
    scope: ConfigScope,

    /// Dot path key (e.g. display.enable_translation, weblate.base_url)
    key: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum ConfigScope {
    Project,
    User,
}

/// Kind of value a key accepts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum KeyType {
    Bool,
    Text,
    Path,
    OutputMode,
}

/// # Errors
///
/// Unknown keys, unparsable values, or config files that cannot be read or
/// written.
pub fn run_config(args: &ConfigArgs, project: &Project) -> Result<()> {
    let root = project.root.as_path();
    let output = project.output;
    match &args.command {
        ConfigCommand::Show(show) => run_show(show, project, output),
        ConfigCommand::Set(set) => run_set(set, root, output),
        ConfigCommand::Unset(unset) => run_unset(unset, root, output),
    }
}

fn run_show(args: &ShowArgs, project: &Project, output: OutputMode) -> Result<()> {
    if args.project {
        let value = load_toml_table(&project_config_path(&project.root))?;
        return print_toml_or_json(&redact(value), output);
    }

    if args.user {
        let value = load_toml_table(&user_path()?)?;
        return print_toml_or_json(&redact(value), output);
    }

    // Re-resolve so a config edited earlier in this process is picked up.
    let mut effective = resolve_config(&project.root, Some(output.as_str()))?;
    if effective.config.weblate.token.is_some() {
        effective.config.weblate.token = Some(REDACTED.to_string());
    }
    print_effective(&effective, output)
}

fn run_set(args: &SetArgs, root: &Path, output: OutputMode) -> Result<()> {
    let path = scope_path(args.scope, root)?;
    let mut value = load_toml_table(&path)?;
    apply_set(&mut value, args.scope, &args.key, &args.value)?;
    write_toml_table(&path, &value)?;
    tracing::info!(key = %args.key, path = %path.display(), "config key set");
    render_mutation(output, "set", scope_label(args.scope), &args.key)
}

fn run_unset(args: &UnsetArgs, root: &Path, output: OutputMode) -> Result<()> {
    let path = scope_path(args.scope, root)?;
    let mut value = load_toml_table(&path)?;
    apply_unset(&mut value, args.scope, &args.key)?;
    write_toml_table(&path, &value)?;
    tracing::info!(key = %args.key, path = %path.display(), "config key unset");
    render_mutation(output, "unset", scope_label(args.scope), &args.key)
}

fn scope_path(scope: ConfigScope, root: &Path) -> Result<PathBuf> {
    match scope {
        ConfigScope::Project => Ok(project_config_path(root)),
        ConfigScope::User => user_path(),
    }
}

fn user_path() -> Result<PathBuf> {
    user_config_path().ok_or_else(|| anyhow!("Unable to resolve user config directory"))
}

fn apply_set(root: &mut Value, scope: ConfigScope, key: &str, raw: &str) -> Result<()> {
    let (section, leaf, kind) = split_known_key(scope, key)?;
    let parsed = parse_value(kind, key, raw)?;

    let table = root
        .as_table_mut()
        .ok_or_else(|| anyhow!("Config root must be a TOML table"))?;

    let section_entry = table
        .entry(section.to_string())
        .or_insert_with(|| Value::Table(toml::map::Map::new()));

    let section_table = section_entry
        .as_table_mut()
        .ok_or_else(|| anyhow!("Section {section} must be a TOML table"))?;

    section_table.insert(leaf.to_string(), parsed);
    Ok(())
}

fn apply_unset(root: &mut Value, scope: ConfigScope, key: &str) -> Result<()> {
    let (section, leaf, _) = split_known_key(scope, key)?;
    let table = root
        .as_table_mut()
        .ok_or_else(|| anyhow!("Config root must be a TOML table"))?;

    if let Some(section_entry) = table.get_mut(section)
        && let Some(section_table) = section_entry.as_table_mut()
    {
        section_table.remove(leaf);
        if section_table.is_empty() {
            table.remove(section);
        }
    }

    Ok(())
}

fn split_known_key(scope: ConfigScope, key: &str) -> Result<(&str, &str, KeyType)> {
    let (section, leaf) = key
        .split_once('.')
        .ok_or_else(|| anyhow!("Key must use section.key format"))?;

    let shared = match (section, leaf) {
        (
            "display",
            "show_dialogue_id" | "enable_translation" | "show_source_alongside_translation"
            | "show_condition",
        ) => Some(KeyType::Bool),
        ("weblate", "base_url" | "project" | "component" | "language") => Some(KeyType::Text),
        _ => None,
    };

    let kind = shared.or(match (scope, section, leaf) {
        (ConfigScope::Project, "data", "database" | "weblate_index") => Some(KeyType::Path),
        (ConfigScope::User, "weblate", "token") => Some(KeyType::Text),
        (ConfigScope::User, "user", "output") => Some(KeyType::OutputMode),
        _ => None,
    });

    match kind {
        Some(kind) => Ok((section, leaf, kind)),
        None => bail!("Unsupported key `{key}` for {} scope", scope_label(scope)),
    }
}

fn parse_value(kind: KeyType, key: &str, raw: &str) -> Result<Value> {
    match kind {
        KeyType::Bool => {
            let value: bool = raw
                .parse()
                .with_context(|| format!("{key} expects true or false"))?;
            Ok(Value::Boolean(value))
        }
        KeyType::Text | KeyType::Path => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                bail!("{key} cannot be empty; use `parley config unset {key}`");
            }
            Ok(Value::String(trimmed.to_string()))
        }
        KeyType::OutputMode => normalize_output_mode(raw)
            .map(|mode| Value::String(mode.to_string()))
            .ok_or_else(|| anyhow!("{key} expects pretty, text or json")),
    }
}

fn write_toml_table(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let serialized = toml::to_string_pretty(value)?;
    std::fs::write(path, serialized).with_context(|| format!("Failed to write {}", path.display()))
}

const REDACTED: &str = "********";

fn redact(mut value: Value) -> Value {
    if let Some(token) = value
        .get_mut("weblate")
        .and_then(|weblate| weblate.get_mut("token"))
    {
        *token = Value::String(REDACTED.to_string());
    }
    value
}

fn print_toml_or_json(value: &Value, output: OutputMode) -> Result<()> {
    match output {
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputMode::Text | OutputMode::Pretty => print!("{}", toml::to_string_pretty(value)?),
    }
    Ok(())
}

fn print_effective(value: &EffectiveConfig, output: OutputMode) -> Result<()> {
    let config = &value.config;
    match output {
        OutputMode::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputMode::Text => {
            println!("resolved_output={}", value.resolved_output);
            println!("display.show_dialogue_id={}", config.display.show_dialogue_id);
            println!("display.enable_translation={}", config.display.enable_translation);
            println!(
                "display.show_source_alongside_translation={}",
                config.display.show_source_alongside_translation
            );
            println!("display.show_condition={}", config.display.show_condition);
            if let Some(db) = &config.data.database {
                println!("data.database={}", db.display());
            }
            if let Some(index) = &config.data.weblate_index {
                println!("data.weblate_index={}", index.display());
            }
            if let Some(url) = &config.weblate.base_url {
                println!("weblate.base_url={url}");
            }
            println!("weblate.project={}", config.weblate.project);
            println!("weblate.component={}", config.weblate.component);
            println!("weblate.language={}", config.weblate.language);
            if let Some(token) = &config.weblate.token {
                println!("weblate.token={token}");
            }
            if let Some(out) = &config.user.output {
                println!("user.output={out}");
            }
        }
        OutputMode::Pretty => {
            println!("resolved_output = \"{}\"", value.resolved_output);
            for source in &value.sources {
                println!("# from {}", source.display());
            }
            println!();
            print!("{}", toml::to_string_pretty(config)?);
        }
    }

    Ok(())
}

fn render_mutation(output: OutputMode, action: &str, scope: &str, key: &str) -> Result<()> {
    match output {
        OutputMode::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "ok": true,
                    "action": action,
                    "scope": scope,
                    "key": key,
                }))?
            );
        }
        OutputMode::Text => {
            println!("ok=true action={action} scope={scope} key={key}");
        }
        OutputMode::Pretty => {
            let title = if action == "set" { "Set" } else { "Unset" };
            println!("{title} {key} in {scope} config");
        }
    }
    Ok(())
}

const fn scope_label(scope: ConfigScope) -> &'static str {
    match scope {
        ConfigScope::Project => "project",
        ConfigScope::User => "user",
    }
}
