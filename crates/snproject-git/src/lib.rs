//! Git backend for snproject
//!
//! [`GitRepository`] implements the
//! [`VersionControl`](snproject_core::VersionControl) primitives on top of
//! git2, and [`GitDeleteHook`] lets `remove`/`remove_missing` stage the
//! deletions they make.

pub mod error;
pub mod hook;
pub mod repository;

pub use error::{Error, Result};
pub use hook::GitDeleteHook;
pub use repository::GitRepository;
