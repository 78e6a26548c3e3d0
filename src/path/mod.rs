//! Path algebra: deconstruction and reconstruction of payload trees
//!
//! Pure functions over document/update payloads with no schema knowledge.
//! Deconstruction flattens a payload into addressable entries keyed by
//! canonical field path; reconstruction deep-sets each value back at its
//! original walk path. The pair round-trips exactly for operator-free
//! documents.

mod deconstruct;
mod reconstruct;
mod types;

pub use deconstruct::{deconstruct, is_opaque_leaf};
pub use reconstruct::{deep_get, deep_set, reconstruct};
pub use types::{EntrySet, Path, PayloadEntry, Segment};
