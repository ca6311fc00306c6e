//! Shared test utilities for the snproject workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`git`]: git repository fixtures
//! - [`project`]: [`TestProject`](project::TestProject), a temporary project
//!   directory with config and entity documents
//! - [`records`]: upstream record payloads as the remote platform returns them

pub mod git;
pub mod project;
pub mod records;
