//! Structural caching of compiled preprocessors
//!
//! Schema shape analysis is the dominant preprocessing cost and is identical
//! across repeated calls with the same operation shape. The cache memoizes
//! the analyzed preprocessor by structural signature; hits rehydrate values
//! and re-run only the value-dependent validation and transformation.

mod signature;
mod store;

pub use signature::structural_signature;
pub use store::{CacheKey, PreprocessorCache};
