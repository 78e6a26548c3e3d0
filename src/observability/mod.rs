//! Observability: structured logging and deterministic metrics
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on preprocessing
//! 3. No async or background threads
//! 4. Deterministic output

mod logger;
mod metrics;

pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
