//! Per-invocation project context: resolved configuration, the database on
//! disk and the translation overlay it should be read through.

use std::path::{Path, PathBuf};

use parley_core::config::{EffectiveConfig, resolve_config};
use parley_core::graph::DialogueGraph;
use parley_core::model::RawDatabase;
use parley_core::overlay::{NoOverlay, OverlayProvider, WeblateIndex};
use parley_core::text::TextResolver;
use parley_core::timing;
use tracing::{info, instrument, warn};

use crate::output::{CliError, OutputMode, fail};
use crate::weblate::WeblateClient;

/// Global path overrides taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub database: Option<PathBuf>,
    pub index: Option<PathBuf>,
}

#[derive(Debug)]
pub struct Project {
    pub root: PathBuf,
    pub effective: EffectiveConfig,
    pub output: OutputMode,
    overrides: PathOverrides,
}

impl Project {
    /// Resolve configuration for `root`. `cli_format` is the explicit
    /// `--format`/`--json` choice, if any.
    ///
    /// # Errors
    ///
    /// Fails if a config file exists but cannot be parsed.
    pub fn open(
        root: &Path,
        cli_format: Option<OutputMode>,
        overrides: PathOverrides,
    ) -> anyhow::Result<Self> {
        let effective = resolve_config(root, cli_format.map(OutputMode::as_str))?;
        let output = OutputMode::from_name(&effective.resolved_output).unwrap_or(OutputMode::Text);
        Ok(Self {
            root: root.to_path_buf(),
            effective,
            output,
            overrides,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        match &self.overrides.database {
            Some(path) => self.root.join(path),
            None => self.effective.config.data.database_path(&self.root),
        }
    }

    pub fn index_path(&self) -> Option<PathBuf> {
        self.overrides
            .index
            .as_ref()
            .or(self.effective.config.data.weblate_index.as_ref())
            .map(|path| self.root.join(path))
    }

    /// Load and build the dialogue graph, rendering any failure.
    ///
    /// # Errors
    ///
    /// Missing file, malformed JSON or a structurally invalid database.
    #[instrument(skip(self), fields(path = %self.database_path().display()))]
    pub fn load_graph(&self) -> anyhow::Result<DialogueGraph> {
        let path = self.database_path();
        let built = timing::timed("load.database", || {
            RawDatabase::from_path(&path).and_then(DialogueGraph::from_raw)
        });
        match built {
            Ok(graph) => {
                info!(nodes = graph.len(), strings = graph.strings().len(), "database loaded");
                Ok(graph)
            }
            Err(err) => {
                let error = CliError::from(&err);
                let error = if err.code() == parley_core::ErrorCode::DatabaseMissing {
                    error.suggest(format!(
                        "no database at {}; pass --db <path> or set data.database",
                        path.display()
                    ))
                } else {
                    error
                };
                fail(self.output, &error)
            }
        }
    }

    /// The overlay configured for this project.
    ///
    /// Translation needs `display.enable_translation`, `weblate.base_url`
    /// and an index file; anything missing degrades to no translation with
    /// a warning.
    ///
    /// # Errors
    ///
    /// Fails if the index file exists but cannot be parsed.
    pub fn overlay(&self) -> anyhow::Result<Box<dyn OverlayProvider>> {
        let config = &self.effective.config;
        if !config.display.enable_translation {
            return Ok(Box::new(NoOverlay));
        }
        let Some(base_url) = config.weblate.base_url.as_deref() else {
            warn!("translation enabled but weblate.base_url is not set; showing source text");
            return Ok(Box::new(NoOverlay));
        };
        let Some(index) = self.load_index()? else {
            warn!("translation enabled but no Weblate index is configured; showing source text");
            return Ok(Box::new(NoOverlay));
        };
        Ok(Box::new(WeblateClient::new(base_url, &config.weblate, index)))
    }

    /// Load the index file, if one is configured.
    ///
    /// # Errors
    ///
    /// Fails (after rendering) if the file is missing or malformed.
    pub fn load_index(&self) -> anyhow::Result<Option<WeblateIndex>> {
        let Some(path) = self.index_path() else {
            return Ok(None);
        };
        match timing::timed("load.index", || WeblateIndex::from_path(&path)) {
            Ok(index) => Ok(Some(index)),
            Err(err) => fail(self.output, &CliError::from(&err)),
        }
    }

    pub fn resolver<'a>(
        &self,
        graph: &'a DialogueGraph,
        overlay: &'a dyn OverlayProvider,
    ) -> TextResolver<'a> {
        TextResolver::new(graph, overlay, self.effective.config.display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project(dir: &TempDir, overrides: PathOverrides) -> Project {
        Project::open(dir.path(), Some(OutputMode::Json), overrides).unwrap()
    }

    #[test]
    fn cli_format_wins() {
        let dir = TempDir::new().unwrap();
        assert_eq!(project(&dir, PathOverrides::default()).output, OutputMode::Json);
    }

    #[test]
    fn default_database_lives_under_data() {
        let dir = TempDir::new().unwrap();
        let project = project(&dir, PathOverrides::default());
        assert_eq!(project.database_path(), dir.path().join("data/database.json"));
        assert_eq!(project.index_path(), None);
    }

    #[test]
    fn overrides_are_relative_to_root() {
        let dir = TempDir::new().unwrap();
        let project = project(
            &dir,
            PathOverrides {
                database: Some(PathBuf::from("db.json")),
                index: Some(PathBuf::from("idx.csv")),
            },
        );
        assert_eq!(project.database_path(), dir.path().join("db.json"));
        assert_eq!(project.index_path(), Some(dir.path().join("idx.csv")));
    }

    #[test]
    fn translation_disabled_uses_no_overlay() {
        let dir = TempDir::new().unwrap();
        let project = project(&dir, PathOverrides::default());
        let overlay = project.overlay().unwrap();
        let id = parley_core::model::StringId::from_raw(1).unwrap();
        assert_eq!(overlay.lookup(id).unwrap(), None);
        assert_eq!(overlay.editor_link(id), None);
    }
}
