//! Reconciles rendered units with the filesystem
//!
//! Every operation keeps the path cache in step with what it did on disk;
//! the caller records the returned entries in the store.

use super::hooks::DeleteHook;
use super::report::SavedFile;
use crate::Result;
use crate::allocator::PathCache;
use crate::render::FileUnit;
use crate::store::UnitEntry;
use snproject_fs::io::{move_file, prune_empty_dirs, remove_file, write_text};
use snproject_fs::{NormalizedPath, relative_key};
use std::collections::HashSet;
use std::path::PathBuf;

/// A unit as placed on disk.
#[derive(Debug)]
pub(crate) struct Placed {
    pub entry: UnitEntry,
    pub file: SavedFile,
}

pub(crate) struct Synchronizer<'a> {
    root: &'a NormalizedPath,
    cache: &'a mut PathCache,
}

impl<'a> Synchronizer<'a> {
    pub fn new(root: &'a NormalizedPath, cache: &'a mut PathCache) -> Self {
        Self { root, cache }
    }

    fn absolute(&self, relative: &str) -> NormalizedPath {
        self.root.join(relative)
    }

    /// Allocate a path for `unit`, move the file it had before if the path
    /// changed, and write the body unless the stored hash still matches.
    ///
    /// `claimed` holds the paths other units of the same record took in this
    /// save; they are neither reused nor moved away.
    pub fn place(
        &mut self,
        unit: &FileUnit,
        previous: Option<&UnitEntry>,
        claimed: &HashSet<String>,
    ) -> Result<Placed> {
        let segments = self
            .cache
            .allocate_avoiding(&unit.path, &unit.sys_id, claimed)?;
        let relative = relative_key(&segments);
        let target = self.root.join_all(&segments);

        match self.write(unit, previous, &relative, &target, claimed) {
            Ok(modified) => Ok(Placed {
                entry: UnitEntry {
                    id: unit.id.clone(),
                    hash: unit.hash.clone(),
                    path: relative,
                    name: unit.name.clone(),
                },
                file: SavedFile {
                    path: target.to_native(),
                    sys_id: unit.sys_id.clone(),
                    updated_by: unit.updated_by.clone(),
                    modified,
                },
            }),
            Err(e) => {
                let claimed_before = previous.is_some_and(|p| p.path == relative);
                if !claimed_before && !target.exists() {
                    self.cache.release(&relative, &unit.sys_id);
                }
                Err(e)
            }
        }
    }

    fn write(
        &mut self,
        unit: &FileUnit,
        previous: Option<&UnitEntry>,
        relative: &str,
        target: &NormalizedPath,
        claimed: &HashSet<String>,
    ) -> Result<bool> {
        let mut moved = false;
        if let Some(previous) = previous
            && previous.path != relative
        {
            // A sibling unit already took over the old path
            if !claimed.contains(&previous.path) {
                let old = self.absolute(&previous.path);
                if old.is_file() {
                    move_file(&old, target)?;
                    tracing::info!(from = %old, to = %target, sys_id = %unit.sys_id, "Moved file");
                }
                self.cache.release(&previous.path, &unit.sys_id);
                self.prune_parent(&old)?;
            }
            moved = true;
        }

        let unchanged = !moved && target.is_file() && previous.is_some_and(|p| p.hash == unit.hash);
        if unchanged {
            tracing::debug!(path = %target, "File has not changed, skipping");
            return Ok(false);
        }

        write_text(target, &unit.body)?;
        tracing::info!(path = %target, sys_id = %unit.sys_id, "Wrote file");
        Ok(true)
    }

    /// Delete the file of a unit the record no longer produces.
    pub fn discard(&mut self, unit: &UnitEntry, sys_id: &str) -> Result<Option<PathBuf>> {
        let path = self.absolute(&unit.path);
        let deleted = remove_file(&path)?;
        self.cache.release(&unit.path, sys_id);
        self.prune_parent(&path)?;
        if deleted {
            tracing::info!(path = %path, sys_id = %sys_id, "Removed stale file");
            Ok(Some(path.to_native()))
        } else {
            Ok(None)
        }
    }

    /// Delete a unit's file through `hook`.
    ///
    /// Returns the path if the hook deleted a file and `None` if there was
    /// nothing to delete. On error the cache keeps the path.
    pub fn delete_with(
        &mut self,
        hook: &mut dyn DeleteHook,
        unit: &UnitEntry,
        sys_id: &str,
    ) -> Result<Option<PathBuf>> {
        let path = self.absolute(&unit.path);
        let native = path.to_native();
        let deleted = hook.delete(&native)?;
        self.cache.release(&unit.path, sys_id);
        if let Err(e) = self.prune_parent(&path) {
            tracing::warn!(path = %path, error = %e, "Failed to prune empty directories");
        }
        if deleted {
            tracing::info!(path = %path, sys_id = %sys_id, "Deleted file");
            Ok(Some(native))
        } else {
            tracing::debug!(path = %path, "Nothing to delete");
            Ok(None)
        }
    }

    fn prune_parent(&self, path: &NormalizedPath) -> Result<()> {
        if let Some(parent) = path.parent() {
            prune_empty_dirs(&parent, self.root)?;
        }
        Ok(())
    }
}
