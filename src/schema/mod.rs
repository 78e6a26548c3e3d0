//! Schema subsystem: declarations, compilation, and the field table
//!
//! Schemas are declared as dotted-path -> declaration mappings and compiled
//! once at model-registration time into an immutable [`SchemaTable`].
//!
//! # Design Principles
//!
//! - Compilation is fatal on inconsistency; no malformed schema processes a
//!   document
//! - Tables are immutable after compilation and shared read-only
//! - An `_id` entry with an identity-format validator is always present
//! - Array-of-objects containers are inferred from declared child paths

mod compiler;
mod errors;
mod loader;
mod table;
mod types;

pub use compiler::SchemaCompiler;
pub use errors::{SchemaConfigCode, SchemaConfigError, SchemaResult};
pub use loader::SchemaLoader;
pub use table::SchemaTable;
pub use types::{
    is_object_id, FieldDecl, FieldKind, FieldSchema, LengthDecl, TransformFn, ValidateFn,
    ValueType,
};
