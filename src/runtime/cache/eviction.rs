use std::sync::Arc;

use super::GuardedCode;

/// Chooses which entry leaves a call-site cache that is over its bound.
pub trait EvictionPolicy: Send + Sync {
    /// Index into `entries` (oldest first) of the entry to drop. `None` or an
    /// out-of-range index evicts the oldest entry, so the bound always holds.
    fn select_victim(&self, entries: &[Arc<GuardedCode>]) -> Option<usize>;
}

/// Evicts in insertion order: the oldest specialization goes first.
#[derive(Debug, Default, Clone, Copy)]
pub struct FifoEvictionPolicy;

impl FifoEvictionPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl EvictionPolicy for FifoEvictionPolicy {
    fn select_victim(&self, entries: &[Arc<GuardedCode>]) -> Option<usize> {
        if entries.is_empty() { None } else { Some(0) }
    }
}
