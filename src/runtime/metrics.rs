use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters describing how lookups were resolved.
#[derive(Debug, Default)]
pub struct ResolverMetrics {
    lookups: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    compiles: AtomicU64,
    compile_errors: AtomicU64,
    declines: AtomicU64,
    disables: AtomicU64,
    evictions: AtomicU64,
    guard_faults: AtomicU64,
}

impl ResolverMetrics {
    /// Fresh counters, shared between the controller and its observers.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Count one call to `resolve`.
    pub fn record_lookup(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a lookup answered from the cache.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a lookup no cached guard accepted.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a specialization produced by the compiler.
    pub fn record_compile(&self) {
        self.compiles.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failed compilation.
    pub fn record_compile_error(&self) {
        self.compile_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a compiler decline.
    pub fn record_decline(&self) {
        self.declines.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a compiler disable.
    pub fn record_disable(&self) {
        self.disables.fetch_add(1, Ordering::Relaxed);
    }

    /// Add `count` evicted entries.
    pub fn record_evictions(&self, count: usize) {
        if count != 0 {
            self.evictions.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    /// Count a guard that faulted instead of answering.
    pub fn record_guard_fault(&self) {
        self.guard_faults.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current values.
    pub fn snapshot(&self) -> ResolverMetricsSnapshot {
        ResolverMetricsSnapshot {
            lookups: self.lookups.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            compiles: self.compiles.load(Ordering::Relaxed),
            compile_errors: self.compile_errors.load(Ordering::Relaxed),
            declines: self.declines.load(Ordering::Relaxed),
            disables: self.disables.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            guard_faults: self.guard_faults.load(Ordering::Relaxed),
        }
    }
}

/// Counter values at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverMetricsSnapshot {
    pub lookups: u64,
    pub hits: u64,
    pub misses: u64,
    pub compiles: u64,
    pub compile_errors: u64,
    pub declines: u64,
    pub disables: u64,
    pub evictions: u64,
    pub guard_faults: u64,
}
