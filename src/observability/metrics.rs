//! Metrics registry
//!
//! - Counters only (no gauges, no histograms)
//! - Monotonic increase, reset only on process start
//! - Thread-safe, lock-free increments

use std::sync::atomic::{AtomicU64, Ordering};

/// Operational counters for the preprocessing engine
///
/// All counters use atomic operations with Relaxed ordering; eventual
/// consistency is fine for metrics.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Schemas registered
    schemas_registered: AtomicU64,
    /// Preprocessor cache hits
    cache_hits: AtomicU64,
    /// Preprocessor cache misses
    cache_misses: AtomicU64,
    /// Full shape analyses performed
    full_analyses: AtomicU64,
    /// Calls rejected with validation errors
    calls_rejected: AtomicU64,
    /// Calls that preprocessed cleanly
    calls_accepted: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment registered schemas
    pub fn increment_schemas_registered(&self) {
        self.schemas_registered.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment cache hits
    pub fn increment_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment cache misses
    pub fn increment_cache_misses(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment full shape analyses
    pub fn increment_full_analyses(&self) {
        self.full_analyses.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment rejected calls
    pub fn increment_calls_rejected(&self) {
        self.calls_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment accepted calls
    pub fn increment_calls_accepted(&self) {
        self.calls_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            schemas_registered: self.schemas_registered.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            full_analyses: self.full_analyses.load(Ordering::Relaxed),
            calls_rejected: self.calls_rejected.load(Ordering::Relaxed),
            calls_accepted: self.calls_accepted.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time counter values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Schemas registered
    pub schemas_registered: u64,
    /// Preprocessor cache hits
    pub cache_hits: u64,
    /// Preprocessor cache misses
    pub cache_misses: u64,
    /// Full shape analyses performed
    pub full_analyses: u64,
    /// Calls rejected with validation errors
    pub calls_rejected: u64,
    /// Calls that preprocessed cleanly
    pub calls_accepted: u64,
}
