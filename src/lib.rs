//! docgate - a schema preprocessing gate for document stores
//!
//! Validates and transforms structured documents against declarative
//! schemas before they are handed to a document-store driver, for whole
//! document writes and for operator-based partial updates addressing
//! fields via dotted paths, array indices, and positional placeholders.

pub mod cache;
pub mod gate;
pub mod observability;
pub mod path;
pub mod preprocess;
pub mod schema;
pub mod validate;
