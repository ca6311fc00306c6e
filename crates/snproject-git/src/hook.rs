//! Delete hook that records deletions in the git index

use std::path::Path;

use snproject_core::DeleteHook;
use snproject_fs::NormalizedPath;

use crate::GitRepository;

/// Deletes a file and stages its removal, so the next commit carries it.
///
/// Reports a deletion when either the file existed on disk or it was still
/// tracked by the index.
#[derive(Debug)]
pub struct GitDeleteHook<'a> {
    repo: &'a GitRepository,
    deleted: Vec<std::path::PathBuf>,
}

impl<'a> GitDeleteHook<'a> {
    pub fn new(repo: &'a GitRepository) -> Self {
        Self {
            repo,
            deleted: Vec::new(),
        }
    }

    /// Paths staged for removal so far, relative to the working tree.
    pub fn staged(&self) -> &[std::path::PathBuf] {
        &self.deleted
    }
}

impl DeleteHook for GitDeleteHook<'_> {
    fn delete(&mut self, path: &Path) -> snproject_core::Result<bool> {
        let relative = self.repo.relative_path(path)?;
        let existed = snproject_fs::io::remove_file(&NormalizedPath::new(path))?;
        let tracked = self.repo.stage_removal(&[relative.as_path()])? > 0;
        if tracked {
            self.deleted.push(relative);
        }
        Ok(existed || tracked)
    }
}
