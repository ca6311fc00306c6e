//! Entity registry: per-class rules describing how records become files

mod registry;
mod rule;

pub use registry::{Classification, EntityRegistry, RequestArguments, DEFAULT_FIELDS, resolve_aliases};
pub use rule::{Entity, EntityRule};
