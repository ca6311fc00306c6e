//! Path allocation
//!
//! [`PathCache`] maps relative paths to the record that owns them in one
//! branch. It is built from the record store with a single scan and then
//! kept current by every write, move and delete, so allocation never has to
//! query the store.

use crate::store::RecordStore;
use crate::{Error, Result};
use snproject_fs::relative_key;
use std::collections::{HashMap, HashSet};

/// Highest numeric suffix tried before giving up on a path
pub const MAX_SUFFIX_ATTEMPTS: usize = 500;

/// Live `relative path -> owning identity` map for the active branch.
#[derive(Debug, Clone, Default)]
pub struct PathCache {
    branch: String,
    owners: HashMap<String, String>,
}

impl PathCache {
    /// Empty cache for `branch`.
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            owners: HashMap::new(),
        }
    }

    /// Cache holding every unit path `branch` references in `store`.
    pub fn build(store: &RecordStore, branch: &str) -> Self {
        let mut cache = Self::new(branch);
        for (record, entry) in store.list_by_branch(branch) {
            for path in entry.paths() {
                cache.owners.insert(path.to_string(), record.sys_id.clone());
            }
        }
        tracing::debug!(branch = %branch, paths = cache.len(), "Built path cache");
        cache
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn owner(&self, path: &str) -> Option<&str> {
        self.owners.get(path).map(String::as_str)
    }

    pub fn claim(&mut self, path: impl Into<String>, sys_id: &str) {
        self.owners.insert(path.into(), sys_id.to_string());
    }

    /// Drop `path` if `sys_id` owns it. Returns whether it was dropped.
    pub fn release(&mut self, path: &str, sys_id: &str) -> bool {
        if self.owner(path) == Some(sys_id) {
            self.owners.remove(path);
            true
        } else {
            false
        }
    }

    /// Claim a path for `sys_id`, suffixing the last segment while the
    /// candidate belongs to another record.
    ///
    /// `name.ext` becomes `name_1.ext`, `name_2.ext` and so on. The accepted
    /// path is claimed before returning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationExhausted`] if every suffix up to
    /// [`MAX_SUFFIX_ATTEMPTS`] is taken.
    pub fn allocate(&mut self, candidate: &[String], sys_id: &str) -> Result<Vec<String>> {
        self.allocate_avoiding(candidate, sys_id, &HashSet::new())
    }

    /// Like [`allocate`](Self::allocate), but paths in `reserved` count as
    /// taken even when `sys_id` owns them. Used to keep two units of one
    /// record off the same path.
    pub fn allocate_avoiding(
        &mut self,
        candidate: &[String],
        sys_id: &str,
        reserved: &HashSet<String>,
    ) -> Result<Vec<String>> {
        let mut segments = candidate.to_vec();
        let Some(file_name) = segments.pop() else {
            return Err(Error::AllocationExhausted {
                path: String::new(),
                attempts: 0,
            });
        };

        let mut attempt = 0;
        loop {
            let name = if attempt == 0 {
                file_name.clone()
            } else {
                with_suffix(&file_name, attempt)
            };
            segments.push(name);
            let key = relative_key(&segments);
            let taken =
                reserved.contains(&key) || self.owner(&key).is_some_and(|owner| owner != sys_id);
            if !taken {
                self.claim(key, sys_id);
                return Ok(segments);
            }
            segments.pop();
            if attempt == MAX_SUFFIX_ATTEMPTS {
                return Err(Error::AllocationExhausted {
                    path: relative_key(candidate),
                    attempts: attempt,
                });
            }
            attempt += 1;
        }
    }
}

/// Insert `_<n>` before the last extension.
fn with_suffix(file_name: &str, n: usize) -> String {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}_{}{}", &file_name[..dot], n, &file_name[dot..]),
        _ => format!("{}_{}", file_name, n),
    }
}
