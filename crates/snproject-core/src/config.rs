//! Project configuration
//!
//! A project is described by a small document loaded with
//! [`ConfigStore`](snproject_fs::ConfigStore), so `.toml`, `.json` and
//! `.yaml` files all work. Entity rules live in a separate document, a map
//! from class name to [`EntityRule`].

use crate::entity::EntityRule;
use crate::render::RenderOptions;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use snproject_fs::{ConfigStore, NormalizedPath};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Settings for one project directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project root; files and the index live below it
    pub dir: PathBuf,
    pub app_name: String,
    pub db_name: String,
    /// First path segment of every written file
    pub namespace: String,
    /// Active branch
    pub branch: String,
    pub include_unknown_entities: bool,
    pub all_entities_as_json: bool,
    /// Entity rule document, relative to `dir` unless absolute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities_file: Option<PathBuf>,
    /// Index file override, relative to `dir` unless absolute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_file: Option<PathBuf>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            app_name: "noname".to_string(),
            db_name: "snproject".to_string(),
            namespace: "sn".to_string(),
            branch: "master".to_string(),
            include_unknown_entities: false,
            all_entities_as_json: false,
            entities_file: None,
            db_file: None,
        }
    }
}

impl ProjectConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    /// Load a config file. A relative `dir` is taken relative to the
    /// file's own directory.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: Self = ConfigStore::new().load(&NormalizedPath::new(path))?;
        if config.dir.is_relative()
            && let Some(parent) = path.parent()
        {
            config.dir = parent.join(&config.dir);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_entities_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.entities_file = Some(path.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("namespace", &self.namespace),
            ("branch", &self.branch),
            ("db_name", &self.db_name),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Config {
                    message: format!("{} must not be empty", name),
                });
            }
        }
        Ok(())
    }

    pub fn root(&self) -> NormalizedPath {
        NormalizedPath::new(&self.dir)
    }

    fn resolve(&self, path: &Path) -> NormalizedPath {
        if path.is_absolute() {
            NormalizedPath::new(path)
        } else {
            NormalizedPath::new(self.dir.join(path))
        }
    }

    /// Directory holding the index and other project metadata.
    pub fn config_dir(&self) -> NormalizedPath {
        self.root().join("config")
    }

    /// Index file: `db_file` if set, else `<dir>/config/<db_name>.db`.
    pub fn db_path(&self) -> NormalizedPath {
        match &self.db_file {
            Some(path) => self.resolve(path),
            None => self.config_dir().join(&format!("{}.db", self.db_name)),
        }
    }

    /// Entity rules from `entities_file`, or none if it is unset.
    pub fn load_entities(&self) -> Result<BTreeMap<String, EntityRule>> {
        let Some(path) = &self.entities_file else {
            return Ok(BTreeMap::new());
        };
        let rules: BTreeMap<String, EntityRule> = ConfigStore::new().load(&self.resolve(path))?;
        tracing::debug!(count = rules.len(), "Loaded entity rules");
        Ok(rules)
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            namespace: self.namespace.clone(),
            app_name: self.app_name.clone(),
            include_unknown: self.include_unknown_entities,
            all_as_json: self.all_entities_as_json,
        }
    }
}
