//! Seams to the outside world: file deletion and version control

use crate::Result;
use snproject_fs::NormalizedPath;
use std::path::Path;

/// Deletes one file on behalf of `remove`/`remove_missing`.
///
/// `Ok(true)` means the file was deleted and `Ok(false)` that there was
/// nothing to delete; in both cases the record store forgets the unit. An
/// error leaves the store untouched so a later run finds the unit again.
pub trait DeleteHook {
    fn delete(&mut self, path: &Path) -> Result<bool>;
}

/// Plain filesystem delete.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDelete;

impl DeleteHook for FsDelete {
    fn delete(&mut self, path: &Path) -> Result<bool> {
        Ok(snproject_fs::io::remove_file(&NormalizedPath::new(path))?)
    }
}

impl<F> DeleteHook for F
where
    F: FnMut(&Path) -> Result<bool>,
{
    fn delete(&mut self, path: &Path) -> Result<bool> {
        self(path)
    }
}

/// Version control primitives the project hands its output to.
pub trait VersionControl {
    /// Stage files, given relative to the working tree root or absolute.
    fn add(&self, paths: &[&Path]) -> Result<()>;

    /// Stage the removal of files.
    fn remove(&self, paths: &[&Path]) -> Result<()>;

    /// Commit staged changes. Returns the commit id.
    fn commit(&self, message: &str) -> Result<String>;

    /// Push the current branch to `remote`.
    fn push(&self, remote: &str) -> Result<()>;

    fn current_branch(&self) -> Result<String>;
}
