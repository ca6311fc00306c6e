//! Synchronization of records with the project directory
//!
//! - **project**: [`Project`], the entry point for saving and removing records
//! - **synchronizer**: per-unit write, move and delete against the filesystem
//! - **hooks**: [`DeleteHook`] and [`VersionControl`] seams
//! - **report**: results handed back to callers

mod hooks;
mod project;
mod report;
mod synchronizer;

pub use hooks::{DeleteHook, FsDelete, VersionControl};
pub use project::{Project, TEST_CLASS, TEST_SUITE_CLASS};
pub use report::{SaveReport, SavedFile, SyncReport, UnitFailure};
