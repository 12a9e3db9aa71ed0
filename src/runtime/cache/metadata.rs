use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Statistics kept for a cached specialization.
///
/// Hit counts are informational only; they never influence lookup order or
/// eviction.
#[derive(Debug)]
pub struct EntryMetadata {
    created_at: Instant,
    compile_time: Duration,
    hits: AtomicU64,
}

impl EntryMetadata {
    pub fn new(compile_time: Duration) -> Self {
        Self {
            created_at: Instant::now(),
            compile_time,
            hits: AtomicU64::new(0),
        }
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn compile_time(&self) -> Duration {
        self.compile_time
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl Default for EntryMetadata {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}
