// Call-site caching of guarded specializations
pub mod call_site;
pub mod eviction;
pub mod metadata;
pub mod registry;

pub use call_site::{CallSiteCache, SiteState};
pub use eviction::{EvictionPolicy, FifoEvictionPolicy};
pub use metadata::EntryMetadata;
pub use registry::{CacheStats, CodeCacheRegistry};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::code::SpecializedCode;
use super::guard::GuardFn;

/// A specialization paired with the guard that authorizes it.
///
/// The pair never changes after construction; only the statistics in
/// [`EntryMetadata`] move.
pub struct GuardedCode {
    code: SpecializedCode,
    check_fn: Arc<dyn GuardFn>,
    metadata: EntryMetadata,
}

impl GuardedCode {
    pub fn new(code: SpecializedCode, check_fn: impl GuardFn + 'static) -> Self {
        Self::from_arc(code, Arc::new(check_fn))
    }

    pub fn from_arc(code: SpecializedCode, check_fn: Arc<dyn GuardFn>) -> Self {
        Self {
            code,
            check_fn,
            metadata: EntryMetadata::default(),
        }
    }

    #[inline]
    pub fn code(&self) -> &SpecializedCode {
        &self.code
    }

    #[inline]
    pub fn check_fn(&self) -> &dyn GuardFn {
        &*self.check_fn
    }

    pub fn metadata(&self) -> &EntryMetadata {
        &self.metadata
    }

    pub(crate) fn set_compile_time(&mut self, compile_time: Duration) {
        self.metadata = EntryMetadata::new(compile_time);
    }
}

impl fmt::Debug for GuardedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedCode")
            .field("code", &self.code.name())
            .field("code_parts", &self.check_fn.code_parts())
            .field("metadata", &self.metadata)
            .finish()
    }
}
