//! Error types for snproject-git

use std::path::PathBuf;

/// Result type for snproject-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in snproject-git operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Filesystem error: {0}")]
    Fs(#[from] snproject_fs::Error),

    #[error("Remote '{name}' not found")]
    RemoteNotFound { name: String },

    #[error("Push failed: {message}")]
    PushFailed { message: String },

    #[error("Path {path} is outside the repository")]
    PathOutsideRepository { path: PathBuf },

    #[error("Nothing to commit")]
    NothingToCommit,

    #[error("Repository has no working directory")]
    BareRepository,
}

impl From<Error> for snproject_core::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::Fs(e) => snproject_core::Error::Fs(e),
            other => snproject_core::Error::VersionControl {
                message: other.to_string(),
            },
        }
    }
}
