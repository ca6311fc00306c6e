//! Git repository fixtures.

use std::fs;
use std::path::Path;

/// Initialises a real git repository using `git2`, with no commits.
///
/// # Panics
/// Panics if `git2::Repository::init` fails.
pub fn real_git_repo(path: &Path) -> git2::Repository {
    git2::Repository::init(path).unwrap_or_else(|e| {
        panic!(
            "real_git_repo: failed to init repository at {}: {e}",
            path.display()
        )
    })
}

/// Initialises a git repository with a committer identity and one commit
/// containing `README.md`, using `git2` only.
///
/// # Panics
/// Panics if any git operation fails.
pub fn real_git_repo_with_commit(path: &Path) -> git2::Repository {
    let repo = real_git_repo(path);
    {
        let mut config = repo
            .config()
            .unwrap_or_else(|e| panic!("real_git_repo_with_commit: config: {e}"));
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@test.com").unwrap();
        config.set_bool("commit.gpgsign", false).unwrap();
    }

    fs::write(path.join("README.md"), "# Test\n")
        .unwrap_or_else(|e| panic!("real_git_repo_with_commit: failed to write README.md: {e}"));

    let tree_id = {
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("README.md")).unwrap();
        index.write().unwrap();
        index.write_tree().unwrap()
    };
    {
        let tree = repo.find_tree(tree_id).unwrap();
        let signature = repo.signature().unwrap();
        repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            "Initial commit",
            &tree,
            &[],
        )
        .unwrap_or_else(|e| panic!("real_git_repo_with_commit: commit failed: {e}"));
    }
    repo
}

/// Creates a bare repository to act as a push target and registers it as
/// remote `name` of `repo`.
///
/// # Panics
/// Panics if the repository or remote cannot be created.
pub fn bare_remote(repo: &git2::Repository, name: &str, path: &Path) -> git2::Repository {
    let bare = git2::Repository::init_bare(path)
        .unwrap_or_else(|e| panic!("bare_remote: failed to init {}: {e}", path.display()));
    let url = path.to_string_lossy();
    repo.remote(name, &url)
        .unwrap_or_else(|e| panic!("bare_remote: failed to add remote {name}: {e}"));
    bare
}
