use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use toml::Value;

/// Project-relative location of the project config file.
pub const PROJECT_CONFIG: &str = ".parley/config.toml";

/// Environment variable that overrides `weblate.token`.
pub const TOKEN_ENV: &str = "PARLEY_WEBLATE_TOKEN";

const DEFAULT_DATABASE: &str = "data/database.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub weblate: WeblateConfig,
    #[serde(default)]
    pub user: UserConfig,
}

/// Presentation switches consumed by the text resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default)]
    pub show_dialogue_id: bool,
    #[serde(default)]
    pub enable_translation: bool,
    #[serde(default, alias = "show_source")]
    pub show_source_alongside_translation: bool,
    /// Reserved; nothing reads it yet.
    #[serde(default)]
    pub show_condition: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default)]
    pub weblate_index: Option<PathBuf>,
}

impl DataConfig {
    /// Database path, relative paths resolved against `root`.
    #[must_use]
    pub fn database_path(&self, root: &Path) -> PathBuf {
        let path = self
            .database
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));
        if path.is_absolute() {
            path
        } else {
            root.join(path)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeblateConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_project")]
    pub project: String,
    #[serde(default = "default_component")]
    pub component: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for WeblateConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            project: default_project(),
            component: default_component(),
            language: default_language(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    #[serde(flatten)]
    pub config: ParleyConfig,
    pub resolved_output: String,
    /// Files that contributed, lowest precedence first.
    pub sources: Vec<PathBuf>,
}

#[must_use]
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_CONFIG)
}

#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("parley/config.toml"))
}

/// Read a TOML file into a table. A missing file is an empty table.
///
/// # Errors
///
/// Fails if the file cannot be read or is not a TOML table.
pub fn load_toml_table(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(Value::Table(toml::map::Map::new()));
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let value: Value =
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;

    if !value.is_table() {
        bail!("{} must contain a top-level TOML table", path.display());
    }

    Ok(value)
}

/// Merge user and project config, apply env overrides and resolve the
/// output mode.
///
/// # Errors
///
/// Fails if either file exists but cannot be parsed.
pub fn resolve_config(project_root: &Path, cli_format: Option<&str>) -> Result<EffectiveConfig> {
    resolve_from(
        user_config_path().as_deref(),
        &project_config_path(project_root),
        cli_format,
        env::var("FORMAT").ok(),
        env::var(TOKEN_ENV).ok(),
    )
}

fn resolve_from(
    user_path: Option<&Path>,
    project_path: &Path,
    cli_format: Option<&str>,
    env_format: Option<String>,
    env_token: Option<String>,
) -> Result<EffectiveConfig> {
    let mut merged = Value::Table(toml::map::Map::new());
    let mut sources = Vec::new();

    for path in user_path.into_iter().chain(std::iter::once(project_path)) {
        if !path.exists() {
            continue;
        }
        merge_tables(&mut merged, load_toml_table(path)?);
        sources.push(path.to_path_buf());
    }

    let mut config: ParleyConfig = merged
        .try_into()
        .context("Failed to interpret merged configuration")?;

    if let Some(token) = env_token.filter(|t| !t.trim().is_empty()) {
        config.weblate.token = Some(token);
    }

    let resolved_output = resolve_output(cli_format, config.user.output.clone(), env_format);

    tracing::debug!(sources = sources.len(), output = %resolved_output, "resolved configuration");
    Ok(EffectiveConfig {
        config,
        resolved_output,
        sources,
    })
}

/// Recursively overlay `top` onto `base`. Tables merge key by key; any other
/// value in `top` replaces the one in `base`.
pub fn merge_tables(base: &mut Value, top: Value) {
    match (base, top) {
        (Value::Table(base), Value::Table(top)) => {
            for (key, value) in top {
                match base.get_mut(&key) {
                    Some(existing) => merge_tables(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Normalize an output mode name. Unknown names yield `None`.
#[must_use]
pub fn normalize_output_mode(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "human" => Some("pretty"),
        "text" | "plain" => Some("text"),
        "json" => Some("json"),
        _ => None,
    }
}

fn resolve_output(
    cli_format: Option<&str>,
    user_output: Option<String>,
    env_format: Option<String>,
) -> String {
    if let Some(mode) = cli_format.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

fn default_project() -> String {
    "dai".to_string()
}

fn default_component() -> String {
    "dialogue".to_string()
}

fn default_language() -> String {
    "ko".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(&path, content).expect("write config");
        path
    }

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("tempdir");
        let eff = resolve_from(None, &project_config_path(root.path()), None, None, None)
            .expect("load should succeed");
        assert!(eff.sources.is_empty());
        let cfg = eff.config;
        assert_eq!(cfg.display, DisplayConfig::default());
        assert_eq!(cfg.weblate.project, "dai");
        assert_eq!(cfg.weblate.component, "dialogue");
        assert_eq!(cfg.weblate.language, "ko");
        assert_eq!(
            cfg.data.database_path(root.path()),
            root.path().join("data/database.json")
        );
    }

    #[test]
    fn project_overrides_user_key_by_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let user = write(
            dir.path(),
            "user/config.toml",
            "[display]\nshow_dialogue_id = true\nenable_translation = true\n[user]\noutput = \"json\"\n",
        );
        let project = write(
            dir.path(),
            "proj/.parley/config.toml",
            "[display]\nenable_translation = false\n",
        );

        let eff = resolve_from(Some(user.as_path()), &project, None, None, None).expect("resolve");
        assert!(eff.config.display.show_dialogue_id);
        assert!(!eff.config.display.enable_translation);
        assert_eq!(eff.resolved_output, "json");
        assert_eq!(eff.sources, vec![user, project]);
    }

    #[test]
    fn show_source_alias_is_accepted() {
        let cfg: ParleyConfig = toml::from_str("[display]\nshow_source = true\n").expect("parse");
        assert!(cfg.display.show_source_alongside_translation);
    }

    #[test]
    fn env_token_overrides_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let project = write(
            dir.path(),
            ".parley/config.toml",
            "[weblate]\ntoken = \"from-file\"\n",
        );
        let eff = resolve_from(None, &project, None, None, Some("from-env".into())).expect("resolve");
        assert_eq!(eff.config.weblate.token.as_deref(), Some("from-env"));

        let eff = resolve_from(None, &project, None, None, Some("  ".into())).expect("resolve");
        assert_eq!(eff.config.weblate.token.as_deref(), Some("from-file"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let project = write(dir.path(), ".parley/config.toml", "[display\n");
        assert!(resolve_from(None, &project, None, None, None).is_err());
    }

    #[test]
    fn cli_format_overrides_env_and_config() {
        let output = resolve_output(Some("json"), Some("pretty".into()), Some("text".into()));
        assert_eq!(output, "json");
        let output = resolve_output(None, Some("pretty".into()), Some("text".into()));
        assert_eq!(output, "text");
        let output = resolve_output(None, Some("human".into()), Some("bogus".into()));
        assert_eq!(output, "pretty");
    }

    #[test]
    fn merge_replaces_scalars_and_merges_tables() {
        let mut base: Value = toml::from_str("a = 1\n[t]\nx = 1\ny = 2\n").unwrap();
        let top: Value = toml::from_str("a = 2\n[t]\ny = 3\n").unwrap();
        merge_tables(&mut base, top);
        assert_eq!(base["a"].as_integer(), Some(2));
        assert_eq!(base["t"]["x"].as_integer(), Some(1));
        assert_eq!(base["t"]["y"].as_integer(), Some(3));
    }
}
