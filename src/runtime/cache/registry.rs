use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::Serialize;

use super::call_site::{CallSiteCache, SiteState};
use crate::runtime::code::{CodeId, OriginalCode};

/// Call-site caches keyed by the identity of their original code.
#[derive(Debug, Default)]
pub struct CodeCacheRegistry {
    sites: RwLock<AHashMap<CodeId, Arc<CallSiteCache>>>,
}

impl CodeCacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache for `id`, if the code was ever compiled.
    #[inline]
    pub fn get(&self, id: CodeId) -> Option<Arc<CallSiteCache>> {
        self.sites.read().get(&id).cloned()
    }

    pub fn get_or_create(&self, code: &OriginalCode) -> Arc<CallSiteCache> {
        if let Some(site) = self.get(code.id()) {
            return site;
        }
        let mut sites = self.sites.write();
        Arc::clone(
            sites
                .entry(code.id())
                .or_insert_with(|| Arc::new(CallSiteCache::new(code.clone()))),
        )
    }

    /// Drops the cache of a code object the host destroyed.
    pub fn forget(&self, id: CodeId) -> Option<Arc<CallSiteCache>> {
        let site = self.sites.write().remove(&id);
        if let Some(site) = &site {
            site.retire();
        }
        site
    }

    pub fn len(&self) -> usize {
        self.sites.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.read().is_empty()
    }

    pub fn clear(&self) {
        for (_, site) in self.sites.write().drain() {
            site.retire();
        }
    }

    pub fn stats(&self) -> CacheStats {
        let sites = self.sites.read();
        let mut stats = CacheStats {
            call_sites: sites.len(),
            ..CacheStats::default()
        };
        for site in sites.values() {
            let len = site.len();
            stats.total_entries += len;
            stats.largest_site = stats.largest_site.max(len);
            if site.state() == SiteState::Skip {
                stats.skipped_sites += 1;
            }
        }
        stats
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub call_sites: usize,
    pub total_entries: usize,
    pub largest_site: usize,
    pub skipped_sites: usize,
}
