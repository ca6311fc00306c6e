//! Filesystem primitives for the record-to-file synchronization engine
//!
//! Provides normalized path handling, canonical checksums, atomic whole-body
//! writes and the directory housekeeping needed when artifacts move or vanish.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;

pub use checksum::{compute_body_checksum, compute_content_checksum, normalize_line_endings};
pub use config::{ConfigFormat, ConfigStore};
pub use error::{Error, Result};
pub use path::{NormalizedPath, relative_key, sanitize_segment};
