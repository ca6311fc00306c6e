//! The project: entry point tying classification, rendering, allocation,
//! the record store and the filesystem together

use super::hooks::DeleteHook;
use super::report::{SaveReport, SyncReport, UnitFailure};
use super::synchronizer::Synchronizer;
use crate::Result;
use crate::allocator::PathCache;
use crate::config::ProjectConfig;
use crate::entity::{Classification, EntityRegistry, RequestArguments};
use crate::record::Record;
use crate::render::{RenderOptions, app_name, render};
use crate::store::{BranchEntry, RecordEntry, RecordStore};
use snproject_fs::NormalizedPath;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Class of automated test records
pub const TEST_CLASS: &str = "sys_atf_test";
/// Class of automated test suite records
pub const TEST_SUITE_CLASS: &str = "sys_atf_test_suite";

/// A project directory with its entity rules and record store.
///
/// Every mutating operation takes `&mut self`: allocation, writing and
/// cache updates for one branch run as a single sequential pipeline.
#[derive(Debug)]
pub struct Project {
    config: ProjectConfig,
    root: NormalizedPath,
    registry: EntityRegistry,
    render_options: RenderOptions,
    store: RecordStore,
    cache: Option<PathCache>,
    branch: String,
}

impl Project {
    /// Open a project: load its entity rules and its record store.
    pub fn open(config: ProjectConfig) -> Result<Self> {
        config.validate()?;
        let rules = config.load_entities()?;
        let registry = EntityRegistry::new(&rules)
            .with_unknown_entities(config.include_unknown_entities)
            .with_all_as_json(config.all_entities_as_json);
        let store = RecordStore::open(&config.db_path())?;
        Ok(Self::with_parts(config, registry, store))
    }

    /// Assemble a project from an already built registry and store.
    pub fn with_parts(config: ProjectConfig, registry: EntityRegistry, store: RecordStore) -> Self {
        let render_options = RenderOptions {
            include_unknown: registry.includes_unknown(),
            all_as_json: registry.all_as_json(),
            ..config.render_options()
        };
        Self {
            root: config.root(),
            branch: config.branch.clone(),
            config,
            registry,
            render_options,
            store,
            cache: None,
        }
    }

    /// Create the `config/` directory and write an empty index if none exists.
    pub fn setup(&self) -> Result<()> {
        let config_dir = self.config.config_dir().to_native();
        std::fs::create_dir_all(&config_dir)
            .map_err(|e| snproject_fs::Error::io(&config_dir, e))?;
        if let Some(path) = self.store.path()
            && !path.exists()
        {
            self.store.persist()?;
            tracing::info!(path = %path, "Created record store");
        }
        Ok(())
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Active branch.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Make `branch` active. The path cache is rebuilt on next use.
    pub fn switch_branch(&mut self, branch: impl Into<String>) {
        let branch = branch.into();
        if branch != self.branch {
            tracing::debug!(from = %self.branch, to = %branch, "Switching branch");
            self.branch = branch;
            self.cache = None;
        }
    }

    pub fn classify(&self, record: &Record) -> Classification {
        self.registry.classify(record)
    }

    /// Fields to request from upstream for `class_name`.
    pub fn request_arguments(&self, class_name: &str) -> Arc<RequestArguments> {
        self.registry.request_arguments(class_name)
    }

    fn cache(&mut self) -> &mut PathCache {
        let branch = &self.branch;
        let store = &self.store;
        self.cache
            .get_or_insert_with(|| PathCache::build(store, branch))
    }

    /// Materialize one record in the active branch.
    ///
    /// Units that cannot be placed or written are reported in
    /// [`SaveReport::failures`] and keep their previous metadata; the other
    /// units of the record are still saved. Records no rule matches are
    /// skipped unless unknown classes are included.
    ///
    /// # Errors
    ///
    /// Returns an error only if the record store cannot be written.
    pub fn save(&mut self, record: &Record) -> Result<SaveReport> {
        let report = self.save_record(record);
        self.store.flush()?;
        Ok(report)
    }

    fn save_record(&mut self, record: &Record) -> SaveReport {
        let classification = self.registry.classify(record);
        let units = render(record, &classification, &self.render_options);
        let sys_id = record.sys_id();
        let mut report = SaveReport::default();

        let previous = self.store.branch_entry(sys_id, &self.branch).cloned();
        if units.is_empty() && previous.is_none() {
            tracing::debug!(sys_id = %sys_id, class = %record.class_name(), "No rule for record, skipping");
            return report;
        }

        let mut entry = previous
            .clone()
            .unwrap_or_else(|| BranchEntry::new(None));
        entry.touch(record.updated_by().map(str::to_string));

        let root = self.root.clone();
        let mut sync = Synchronizer::new(&root, self.cache());
        let mut placed_paths: HashMap<String, String> = HashMap::new();
        let mut claimed: HashSet<String> = HashSet::new();
        let mut produced: HashSet<String> = HashSet::new();

        for mut unit in units {
            produced.insert(unit.id.clone());
            if unit.is_json() {
                unit.resolve_references(&placed_paths);
            }
            let previous_unit = previous.as_ref().and_then(|p| p.unit(&unit.id));
            match sync.place(&unit, previous_unit, &claimed) {
                Ok(placed) => {
                    claimed.insert(placed.entry.path.clone());
                    placed_paths.insert(unit.id.clone(), placed.entry.path.clone());
                    entry.upsert_unit(placed.entry);
                    report.files.push(placed.file);
                }
                Err(error) => {
                    tracing::warn!(sys_id = %sys_id, unit = %unit.id, error = %error, "Failed to save unit");
                    report.failures.push(UnitFailure {
                        unit_id: unit.id.clone(),
                        error,
                    });
                }
            }
        }

        if let Some(previous) = &previous {
            for stale in previous.fields.iter().filter(|u| !produced.contains(&u.id)) {
                if claimed.contains(&stale.path) {
                    entry.remove_unit(&stale.id);
                    continue;
                }
                match sync.discard(stale, sys_id) {
                    Ok(path) => {
                        entry.remove_unit(&stale.id);
                        report.removed.extend(path);
                    }
                    Err(error) => {
                        tracing::warn!(sys_id = %sys_id, unit = %stale.id, error = %error, "Failed to remove stale unit");
                        report.failures.push(UnitFailure {
                            unit_id: stale.id.clone(),
                            error,
                        });
                    }
                }
            }
        }

        if entry.fields.is_empty() {
            self.store.delete_branch_entry(sys_id, &self.branch);
        } else {
            self.store.upsert_branch_entry(
                sys_id,
                record.class_name(),
                app_name(record, &self.render_options),
                &self.branch,
                entry,
            );
        }
        report
    }

    /// Save records one at a time, collecting failures instead of stopping.
    ///
    /// The record store is written once, after the last record.
    pub fn save_all<'r, I>(&mut self, records: I) -> SyncReport
    where
        I: IntoIterator<Item = &'r Record>,
    {
        let mut report = SyncReport::success();
        for record in records {
            let saved = self.save_record(record);
            report.absorb(record.sys_id(), saved);
        }
        if let Err(e) = self.store.flush() {
            tracing::warn!(error = %e, "Failed to write record store");
            report = report.with_error(format!("record store: {}", e));
        }
        report
    }

    /// Delete the files of the given records in the active branch.
    ///
    /// Returns the paths `hook` actually deleted. A unit whose delete fails
    /// is logged and stays in the record store.
    pub fn remove<S: AsRef<str>>(
        &mut self,
        sys_ids: &[S],
        hook: &mut dyn DeleteHook,
    ) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for sys_id in sys_ids {
            let sys_id = sys_id.as_ref();
            let Some(entry) = self.store.branch_entry(sys_id, &self.branch).cloned() else {
                continue;
            };

            let mut remaining = entry.clone();
            let root = self.root.clone();
            let mut sync = Synchronizer::new(&root, self.cache());
            for unit in &entry.fields {
                match sync.delete_with(hook, unit, sys_id) {
                    Ok(path) => {
                        remaining.remove_unit(&unit.id);
                        removed.extend(path);
                    }
                    Err(e) => {
                        tracing::warn!(sys_id = %sys_id, path = %unit.path, error = %e, "Failed to delete file, keeping metadata");
                    }
                }
            }

            if remaining.fields.is_empty() {
                self.store.delete_branch_entry(sys_id, &self.branch);
            } else if remaining != entry {
                let Some(record) = self.store.find_by_identity(sys_id) else {
                    continue;
                };
                let (class_name, app) = (record.class_name.clone(), record.app_name.clone());
                self.store
                    .upsert_branch_entry(sys_id, &class_name, &app, &self.branch, remaining);
            }
        }
        self.store.flush()?;
        Ok(removed)
    }

    /// Delete the files of every record in the active branch that is not in
    /// `surviving`.
    pub fn remove_missing<S: AsRef<str>>(
        &mut self,
        surviving: &[S],
        hook: &mut dyn DeleteHook,
    ) -> Result<Vec<PathBuf>> {
        let keep: HashSet<&str> = surviving.iter().map(|s| s.as_ref()).collect();
        let missing: Vec<String> = self
            .store
            .list_by_branch(&self.branch)
            .map(|(record, _)| record.sys_id.clone())
            .filter(|id| !keep.contains(id.as_str()))
            .collect();
        if !missing.is_empty() {
            tracing::info!(branch = %self.branch, count = missing.len(), "Removing records missing upstream");
        }
        self.remove(&missing, hook)
    }

    /// Forget a record in the active branch without touching its files.
    pub fn delete_file_by_id(&mut self, sys_id: &str) -> Result<bool> {
        let Some(entry) = self.store.delete_branch_entry(sys_id, &self.branch) else {
            return Ok(false);
        };
        let cache = self.cache();
        for path in entry.paths() {
            cache.release(path, sys_id);
        }
        self.store.flush()?;
        Ok(true)
    }

    /// Drop a branch from the record store. Files are untouched.
    pub fn delete_branch(&mut self, branch: &str) -> Result<()> {
        self.store.delete_branch(branch);
        self.store.flush()?;
        if branch == self.branch {
            self.cache = None;
        }
        Ok(())
    }

    /// Copy a branch's record associations to another branch.
    pub fn clone_branch(&mut self, source: &str, target: &str) -> Result<()> {
        self.store.clone_branch(source, target)?;
        self.store.flush()?;
        if target == self.branch {
            self.cache = None;
        }
        Ok(())
    }

    /// A record known to the active branch.
    pub fn get_file_by_id(&self, sys_id: &str) -> Option<&RecordEntry> {
        self.store
            .find_by_identity(sys_id)
            .filter(|r| r.in_branch(&self.branch))
    }

    /// Records of `class_name` in the active branch.
    pub fn list_by_class(&self, class_name: &str) -> Vec<&RecordEntry> {
        self.store
            .list_by_class_and_branch(class_name, &[self.branch.as_str()])
    }

    pub fn get_tests(&self) -> Vec<&RecordEntry> {
        self.list_by_class(TEST_CLASS)
    }

    pub fn get_test_suites(&self) -> Vec<&RecordEntry> {
        self.list_by_class(TEST_SUITE_CLASS)
    }
}
