//! Error types for snproject-core

use std::path::PathBuf;

/// Result type for snproject-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in snproject-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No free path within the suffix bound
    #[error("No free path for {path} after {attempts} attempts")]
    AllocationExhausted { path: String, attempts: usize },

    /// Error in record store operations
    #[error("Record store error: {message}")]
    Store { message: String },

    /// The record store index could not be read
    #[error("Record store at {path} is corrupt: {message}")]
    StoreCorrupt { path: PathBuf, message: String },

    /// Upstream record is missing required fields
    #[error("Invalid record: {message}")]
    InvalidRecord { message: String },

    /// Project configuration is invalid
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Branch has no entries in the record store
    #[error("Branch not found: {name}")]
    BranchNotFound { name: String },

    /// A delete hook refused or failed
    #[error("Failed to delete {path}: {message}")]
    DeleteFailed { path: PathBuf, message: String },

    /// Version control backend failed
    #[error("Version control error: {message}")]
    VersionControl { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from snproject-fs
    #[error(transparent)]
    Fs(#[from] snproject_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
