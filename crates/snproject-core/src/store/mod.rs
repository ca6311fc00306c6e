//! Branch-scoped record store
//!
//! A persistent index keyed by record identity. Each record holds one
//! [`BranchEntry`] per branch that references it; a record left without
//! branches is dropped. A secondary index by branch name keeps
//! branch-scoped scans from walking every record.
//!
//! Mutations only change the in-memory index and mark it dirty. The
//! orchestrator calls [`RecordStore::flush`] once per save or remove batch,
//! which writes the JSON document atomically under an exclusive lock, so a
//! crash leaves the state of the last completed batch on disk.

mod entry;

pub use entry::{BranchEntry, RecordEntry, UnitEntry};

use crate::{Error, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use snproject_fs::NormalizedPath;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;

/// Index format version
pub const STORE_VERSION: &str = "1.0";

#[derive(Deserialize)]
struct StoreDocument {
    #[serde(default)]
    version: String,
    #[serde(default)]
    records: BTreeMap<String, RecordEntry>,
}

#[derive(Serialize)]
struct StoreDocumentRef<'a> {
    version: &'a str,
    records: &'a BTreeMap<String, RecordEntry>,
}

/// Persistent index of record entries.
#[derive(Debug, Default)]
pub struct RecordStore {
    path: Option<NormalizedPath>,
    records: BTreeMap<String, RecordEntry>,
    by_branch: BTreeMap<String, BTreeSet<String>>,
    dirty: bool,
}

impl RecordStore {
    /// Store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the index at `path`, starting empty if the file does not exist.
    ///
    /// Entries written without an identity take it from their index key and
    /// entries without branches are dropped; the index is rewritten once when
    /// either happens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreCorrupt`] if the file cannot be parsed.
    pub fn open(path: &NormalizedPath) -> Result<Self> {
        let mut store = Self {
            path: Some(path.clone()),
            ..Self::default()
        };
        if !path.is_file() {
            return Ok(store);
        }

        let native = path.to_native();
        let file = File::open(&native).map_err(|e| snproject_fs::Error::io(&native, e))?;
        file.lock_shared().map_err(|_| snproject_fs::Error::LockFailed {
            path: native.clone(),
        })?;
        let mut content = String::new();
        (&file)
            .read_to_string(&mut content)
            .map_err(|e| snproject_fs::Error::io(&native, e))?;
        drop(file);

        let document: StoreDocument = if content.trim().is_empty() {
            StoreDocument {
                version: STORE_VERSION.to_string(),
                records: BTreeMap::new(),
            }
        } else {
            serde_json::from_str(&content).map_err(|e| Error::StoreCorrupt {
                path: native.clone(),
                message: e.to_string(),
            })?
        };
        if !document.version.is_empty() && document.version != STORE_VERSION {
            tracing::debug!(path = %path, version = %document.version, "Opening record store with different version");
        }

        store.records = document.records;
        let migrated = store.fix_missing_identities();
        store.rebuild_index();
        if migrated > 0 {
            tracing::warn!(path = %path, count = migrated, "Repaired legacy record store entries");
            store.persist()?;
        }
        Ok(store)
    }

    fn fix_missing_identities(&mut self) -> usize {
        let before = self.records.len();
        self.records.retain(|_, entry| !entry.branches.is_empty());
        let mut migrated = before - self.records.len();
        for (key, entry) in self.records.iter_mut() {
            if entry.sys_id.is_empty() {
                entry.sys_id = key.clone();
                migrated += 1;
            }
        }
        migrated
    }

    fn rebuild_index(&mut self) {
        self.by_branch.clear();
        for (sys_id, entry) in &self.records {
            for branch in entry.branches.keys() {
                self.by_branch
                    .entry(branch.clone())
                    .or_default()
                    .insert(sys_id.clone());
            }
        }
    }

    /// Location of the index file, if persistent.
    pub fn path(&self) -> Option<&NormalizedPath> {
        self.path.as_ref()
    }

    /// Whether the index holds changes not yet written to disk.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write pending changes, if any. Returns whether anything was written.
    pub fn flush(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        self.persist()?;
        self.dirty = false;
        Ok(true)
    }

    /// Write the index to disk unconditionally.
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let document = StoreDocumentRef {
            version: STORE_VERSION,
            records: &self.records,
        };
        let content = serde_json::to_string_pretty(&document)?;
        snproject_fs::io::write_atomic(path, content.as_bytes())?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find_by_identity(&self, sys_id: &str) -> Option<&RecordEntry> {
        self.records.get(sys_id)
    }

    /// A record's entry for one branch.
    pub fn branch_entry(&self, sys_id: &str, branch: &str) -> Option<&BranchEntry> {
        self.records.get(sys_id)?.branch(branch)
    }

    /// Insert or replace a record's contribution to `branch`.
    ///
    /// Class and application are refreshed from the caller.
    pub fn upsert_branch_entry(
        &mut self,
        sys_id: &str,
        class_name: &str,
        app_name: &str,
        branch: &str,
        entry: BranchEntry,
    ) {
        let record = self
            .records
            .entry(sys_id.to_string())
            .or_insert_with(|| RecordEntry::new(sys_id, class_name, app_name));
        record.class_name = class_name.to_string();
        record.app_name = app_name.to_string();
        record.branches.insert(branch.to_string(), entry);
        self.by_branch
            .entry(branch.to_string())
            .or_default()
            .insert(sys_id.to_string());
        self.dirty = true;
    }

    /// Remove a record's contribution to `branch`, dropping the record when
    /// no branch references it anymore.
    pub fn delete_branch_entry(&mut self, sys_id: &str, branch: &str) -> Option<BranchEntry> {
        let record = self.records.get_mut(sys_id)?;
        let removed = record.branches.remove(branch);
        if record.branches.is_empty() {
            self.records.remove(sys_id);
        }
        if let Some(ids) = self.by_branch.get_mut(branch) {
            ids.remove(sys_id);
            if ids.is_empty() {
                self.by_branch.remove(branch);
            }
        }
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Records of `class_name` referenced by any of `branches`.
    pub fn list_by_class_and_branch(&self, class_name: &str, branches: &[&str]) -> Vec<&RecordEntry> {
        let ids: BTreeSet<&String> = branches
            .iter()
            .filter_map(|b| self.by_branch.get(*b))
            .flatten()
            .collect();
        ids.into_iter()
            .filter_map(|id| self.records.get(id))
            .filter(|r| r.class_name == class_name)
            .collect()
    }

    /// Records referenced by `branch`, with that branch's entry.
    pub fn list_by_branch<'a>(
        &'a self,
        branch: &'a str,
    ) -> impl Iterator<Item = (&'a RecordEntry, &'a BranchEntry)> + 'a {
        self.by_branch
            .get(branch)
            .into_iter()
            .flatten()
            .filter_map(move |id| {
                let record = self.records.get(id)?;
                Some((record, record.branch(branch)?))
            })
    }

    pub fn branch_names(&self) -> impl Iterator<Item = &str> {
        self.by_branch.keys().map(String::as_str)
    }

    pub fn has_branch(&self, branch: &str) -> bool {
        self.by_branch.contains_key(branch)
    }

    /// Drop every record's contribution to `branch`. Files are untouched.
    ///
    /// Returns the number of records that referenced the branch.
    pub fn delete_branch(&mut self, branch: &str) -> usize {
        let Some(ids) = self.by_branch.remove(branch) else {
            return 0;
        };
        for id in &ids {
            if let Some(record) = self.records.get_mut(id) {
                record.branches.remove(branch);
                if record.branches.is_empty() {
                    self.records.remove(id);
                }
            }
        }
        tracing::info!(branch = %branch, records = ids.len(), "Deleted branch from record store");
        self.dirty = true;
        ids.len()
    }

    /// Copy every record association of `source` to `target`, replacing
    /// whatever `target` held for those records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BranchNotFound`] if nothing references `source`.
    pub fn clone_branch(&mut self, source: &str, target: &str) -> Result<usize> {
        let ids = self
            .by_branch
            .get(source)
            .cloned()
            .ok_or_else(|| Error::BranchNotFound {
                name: source.to_string(),
            })?;
        if source == target {
            return Ok(ids.len());
        }
        for id in &ids {
            if let Some(record) = self.records.get_mut(id)
                && let Some(entry) = record.branches.get(source).cloned()
            {
                record.branches.insert(target.to_string(), entry);
            }
        }
        self.by_branch
            .entry(target.to_string())
            .or_default()
            .extend(ids.iter().cloned());
        tracing::info!(source = %source, target = %target, records = ids.len(), "Cloned branch in record store");
        self.dirty = true;
        Ok(ids.len())
    }
}
