//! Record-to-file synchronization engine
//!
//! Projects externally sourced configuration records onto a directory tree
//! and keeps a branch-scoped index of which file belongs to which record:
//!
//! - **Field patterns** (`<name|'default'>`, `<field!dv?>`) for keys and
//!   subdirectories
//! - **Entity registry** with alias propagation and memoized request arguments
//! - **Inclusion filters** in encoded-query form
//! - **Rendering** of records into per-field files or JSON
//! - **Path allocation** with collision suffixes
//! - **Record store** holding per-branch unit metadata
//! - **Project**: `save`, `remove`, `remove_missing` and branch operations
//!
//! # Architecture
//!
//! ```text
//!   Project::save(record)
//!        |
//!   EntityRegistry::classify --> render --> PathCache::allocate
//!                                               |
//!                                  Synchronizer (write / move / delete)
//!                                               |
//!                                          RecordStore
//! ```
//!
//! # Example
//!
//! ```ignore
//! use snproject_core::{FsDelete, Project, ProjectConfig, Record};
//!
//! let mut project = Project::open(ProjectConfig::load("project.toml".as_ref())?)?;
//! project.setup()?;
//! let report = project.save(&Record::from_json(&fetched)?)?;
//! project.remove_missing(&surviving_ids, &mut FsDelete)?;
//! ```

pub mod allocator;
pub mod config;
pub mod entity;
pub mod error;
pub mod pattern;
pub mod query;
pub mod record;
pub mod render;
pub mod store;
pub mod sync;

pub use allocator::{MAX_SUFFIX_ATTEMPTS, PathCache};
pub use config::ProjectConfig;
pub use entity::{
    Classification, DEFAULT_FIELDS, Entity, EntityRegistry, EntityRule, RequestArguments,
    resolve_aliases,
};
pub use error::{Error, Result};
pub use pattern::{FieldRef, NONE_PLACEHOLDER};
pub use query::{Operator, Query, Term};
pub use record::{FieldValue, Record, RecordMeta};
pub use render::{FileUnit, RenderOptions, render};
pub use store::{BranchEntry, RecordEntry, RecordStore, UnitEntry};
pub use sync::{
    DeleteHook, FsDelete, Project, SaveReport, SavedFile, SyncReport, TEST_CLASS,
    TEST_SUITE_CLASS, UnitFailure, VersionControl,
};
