//! Schema Registry
//!
//! One compiled schema per published manifest version. Schema documents ship inside the
//! binary and are compiled once when the registry is built; after that the registry is
//! read-only and can be shared freely across threads.

mod catalog;
mod node;
mod registry;
mod version;

pub use catalog::BUILTIN_SCHEMAS;
pub use node::{Additional, SchemaNode, ValueType, Variants};
pub use registry::SchemaRegistry;
pub use version::{compatibility_series, FieldChanges, SchemaVersion, VersionSelector};
