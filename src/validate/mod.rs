//! Validation and transformation chains
//!
//! Ordered, composable per-field pipelines over payload entries:
//!
//! - The validator chain short-circuits within one field but accumulates
//!   across fields and documents; a call reports every independently
//!   failing field, never just the first
//! - The transform chain mutates values in a fixed order
//! - Text primitives (sanitize, XSS, dates) are an injected trait seam

mod chain;
mod errors;
mod primitives;
mod transform;

pub use chain::{check_type, ValidatorChain};
pub use errors::{ValidationError, Violation};
pub use primitives::{DefaultPrimitives, TextPrimitives};
pub use transform::TransformChain;
