//! Preprocessing: operation dispatch and per-call orchestration
//!
//! The operation enum selects payload/options positions and upsert
//! detection; the preprocessor deconstructs documents, applies
//! insert/update semantics per document, and rewrites the call arguments.
//! Save dispatches to upsert-by-identifier semantics when the document
//! carries a store-native identifier, and to insert semantics otherwise;
//! findAndModify shares the update logic with its own upsert flag.

mod operation;
mod preprocessor;
mod subdoc;

pub use operation::Operation;
pub use preprocessor::Preprocessor;
