//! git2-backed version control primitives

use std::path::{Path, PathBuf};

use git2::{IndexAddOption, Repository};
use snproject_fs::NormalizedPath;

use crate::{Error, Result};

/// A git working tree the project writes into.
pub struct GitRepository {
    repo: Repository,
    workdir: NormalizedPath,
}

impl std::fmt::Debug for GitRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepository")
            .field("workdir", &self.workdir)
            .finish()
    }
}

impl GitRepository {
    /// Open the repository whose working tree contains `path`.
    pub fn discover(path: &Path) -> Result<Self> {
        Self::from_repository(Repository::discover(path)?)
    }

    pub fn from_repository(repo: Repository) -> Result<Self> {
        let workdir = repo
            .workdir()
            .map(NormalizedPath::new)
            .ok_or(Error::BareRepository)?;
        Ok(Self { repo, workdir })
    }

    pub fn workdir(&self) -> &NormalizedPath {
        &self.workdir
    }

    pub fn inner(&self) -> &Repository {
        &self.repo
    }

    /// Path relative to the working tree. Relative input is taken as is.
    pub fn relative_path(&self, path: &Path) -> Result<PathBuf> {
        if path.is_relative() {
            return Ok(path.to_path_buf());
        }
        let normalized = NormalizedPath::new(path);
        let root = self.workdir.as_str().trim_end_matches('/');
        if !normalized.starts_with(&self.workdir) || normalized.as_str().len() <= root.len() {
            return Err(Error::PathOutsideRepository {
                path: path.to_path_buf(),
            });
        }
        Ok(PathBuf::from(&normalized.as_str()[root.len() + 1..]))
    }

    /// Stage files. Directories are staged recursively.
    pub fn stage(&self, paths: &[&Path]) -> Result<()> {
        let mut index = self.repo.index()?;
        for path in paths {
            let relative = self.relative_path(path)?;
            if self.workdir.join(&relative.to_string_lossy()).is_dir() {
                index.add_all([relative.as_path()], IndexAddOption::DEFAULT, None)?;
            } else {
                index.add_path(&relative)?;
            }
            tracing::debug!(path = %relative.display(), "Staged");
        }
        index.write()?;
        Ok(())
    }

    /// Stage the removal of files. Untracked paths are ignored.
    ///
    /// Returns how many tracked paths were removed from the index.
    pub fn stage_removal(&self, paths: &[&Path]) -> Result<usize> {
        let mut index = self.repo.index()?;
        let mut removed = 0;
        for path in paths {
            let relative = self.relative_path(path)?;
            if index.get_path(&relative, 0).is_some() {
                index.remove_path(&relative)?;
                removed += 1;
                tracing::debug!(path = %relative.display(), "Staged removal");
            }
        }
        index.write()?;
        Ok(removed)
    }

    /// Commit the index on top of HEAD.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NothingToCommit`] if the index matches HEAD.
    pub fn commit_index(&self, message: &str) -> Result<git2::Oid> {
        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
            Err(e) if e.code() == git2::ErrorCode::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        match &parent {
            Some(parent) if parent.tree_id() == tree_id => return Err(Error::NothingToCommit),
            None if tree.is_empty() => return Err(Error::NothingToCommit),
            _ => {}
        }

        let signature = self.repo.signature()?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?;
        tracing::info!(commit = %oid, "Committed");
        Ok(oid)
    }

    /// Name of the branch HEAD points at, also before the first commit.
    pub fn branch_name(&self) -> Result<String> {
        let head = self.repo.find_reference("HEAD")?;
        if let Some(target) = head.symbolic_target() {
            return Ok(target.trim_start_matches("refs/heads/").to_string());
        }
        Ok(head.shorthand().unwrap_or("HEAD").to_string())
    }

    /// Push `branch` (default: the current branch) to `remote`.
    pub fn push_branch(&self, remote: &str, branch: Option<&str>) -> Result<()> {
        let branch_name = match branch {
            Some(b) => b.to_string(),
            None => self.branch_name()?,
        };

        let mut remote_handle =
            self.repo
                .find_remote(remote)
                .map_err(|_| Error::RemoteNotFound {
                    name: remote.to_string(),
                })?;

        let refspec = format!("refs/heads/{}:refs/heads/{}", branch_name, branch_name);
        remote_handle
            .push(&[&refspec], None)
            .map_err(|e| Error::PushFailed {
                message: e.message().to_string(),
            })?;
        tracing::info!(remote = %remote, branch = %branch_name, "Pushed");
        Ok(())
    }
}

impl snproject_core::VersionControl for GitRepository {
    fn add(&self, paths: &[&Path]) -> snproject_core::Result<()> {
        Ok(self.stage(paths)?)
    }

    fn remove(&self, paths: &[&Path]) -> snproject_core::Result<()> {
        self.stage_removal(paths)?;
        Ok(())
    }

    fn commit(&self, message: &str) -> snproject_core::Result<String> {
        Ok(self.commit_index(message)?.to_string())
    }

    fn push(&self, remote: &str) -> snproject_core::Result<()> {
        Ok(self.push_branch(remote, None)?)
    }

    fn current_branch(&self) -> snproject_core::Result<String> {
        Ok(self.branch_name()?)
    }
}
