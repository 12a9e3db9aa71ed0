use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use super::GuardedCode;
use super::eviction::EvictionPolicy;
use crate::runtime::code::OriginalCode;

/// How a call site reacts to a lookup.
///
/// States only ever become more restrictive until the site is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum SiteState {
    /// Entries are consulted; a miss invokes the compiler.
    Active = 0,
    /// The compiler declined or disabled this code: nothing is consulted
    /// and the original code always runs.
    Skip = 1,
}

impl SiteState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Active,
            _ => Self::Skip,
        }
    }
}

/// Ordered specializations of one original code object, oldest first.
///
/// The entry list is copy-on-write: lookups clone an `Arc` of the current
/// list and evaluate guards without holding any lock, while insertions are
/// serialized by a per-site mutation lock and publish a new list. An entry
/// evicted while a lookup is scanning stays alive until that lookup drops
/// its list.
pub struct CallSiteCache {
    code: OriginalCode,
    entries: RwLock<Arc<[Arc<GuardedCode>]>>,
    mutation: Mutex<()>,
    state: AtomicU8,
    evicting: AtomicBool,
    generation: AtomicU64,
}

impl CallSiteCache {
    pub fn new(code: OriginalCode) -> Self {
        Self {
            code,
            entries: RwLock::new(Arc::from(Vec::new())),
            mutation: Mutex::new(()),
            state: AtomicU8::new(SiteState::Active as u8),
            evicting: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    pub fn code(&self) -> &OriginalCode {
        &self.code
    }

    /// The current entry list, oldest first.
    #[inline]
    pub fn entries(&self) -> Arc<[Arc<GuardedCode>]> {
        Arc::clone(&*self.entries.read())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn state(&self) -> SiteState {
        SiteState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Moves the site to `state` unless it is already at least as
    /// restrictive; returns the previous state.
    pub fn restrict(&self, state: SiteState) -> SiteState {
        SiteState::from_u8(self.state.fetch_max(state as u8, Ordering::AcqRel))
    }

    /// Like [`restrict`](Self::restrict), but only while the site is still at
    /// `generation`. Returns whether the state was applied.
    pub fn restrict_at(&self, state: SiteState, generation: u64) -> bool {
        let _mutation = self.mutation.lock();
        if self.generation.load(Ordering::Acquire) != generation {
            return false;
        }
        self.restrict(state);
        true
    }

    /// Bumped whenever the site is reset or dropped from its registry.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Appends `entry` and evicts until the site holds at most
    /// `max_entries`. Returns the evicted entries, oldest first.
    pub fn insert(
        &self,
        entry: Arc<GuardedCode>,
        max_entries: usize,
        policy: &dyn EvictionPolicy,
    ) -> Vec<Arc<GuardedCode>> {
        let _mutation = self.mutation.lock();
        self.insert_locked(entry, max_entries, policy)
    }

    /// Like [`insert`](Self::insert), but only while the site is still at
    /// `generation`. Returns `None` when it was reset or retired since.
    pub fn insert_at(
        &self,
        entry: Arc<GuardedCode>,
        max_entries: usize,
        policy: &dyn EvictionPolicy,
        generation: u64,
    ) -> Option<Vec<Arc<GuardedCode>>> {
        let _mutation = self.mutation.lock();
        if self.generation.load(Ordering::Acquire) != generation {
            return None;
        }
        Some(self.insert_locked(entry, max_entries, policy))
    }

    fn insert_locked(
        &self,
        entry: Arc<GuardedCode>,
        max_entries: usize,
        policy: &dyn EvictionPolicy,
    ) -> Vec<Arc<GuardedCode>> {
        let current = self.entries();
        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(entry);

        let mut evicted = Vec::new();
        while next.len() > max_entries {
            // An unusable choice from the policy falls back to the oldest entry.
            let index = policy
                .select_victim(&next)
                .filter(|&index| index < next.len())
                .unwrap_or(0);
            evicted.push(next.remove(index));
        }

        *self.entries.write() = Arc::from(next);
        evicted
    }

    /// Returns true the first time this site evicts an entry.
    pub(crate) fn note_eviction(&self) -> bool {
        !self.evicting.swap(true, Ordering::Relaxed)
    }

    /// Drops every entry and reactivates the site. Returns how many entries
    /// were dropped.
    pub fn reset(&self) -> usize {
        let _mutation = self.mutation.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        let dropped = std::mem::replace(&mut *self.entries.write(), Arc::from(Vec::new()));
        self.state.store(SiteState::Active as u8, Ordering::Release);
        self.evicting.store(false, Ordering::Relaxed);
        dropped.len()
    }

    /// Marks the site as detached from its registry so in-flight
    /// compilations no longer publish into it.
    pub(crate) fn retire(&self) {
        let _mutation = self.mutation.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

impl fmt::Debug for CallSiteCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSiteCache")
            .field("code", &self.code)
            .field("entries", &self.len())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::bindings::GlobalScope;
    use crate::runtime::cache::FifoEvictionPolicy;
    use crate::runtime::code::SpecializedCode;
    use crate::runtime::guard::GuardBuilder;

    fn entry(name: &str) -> Arc<GuardedCode> {
        let guard = GuardBuilder::new(&GlobalScope::new()).build();
        Arc::new(GuardedCode::new(SpecializedCode::new(name, Vec::new()), guard))
    }

    fn names(site: &CallSiteCache) -> Vec<String> {
        site.entries()
            .iter()
            .map(|entry| entry.code().name().to_string())
            .collect()
    }

    #[test]
    fn insert_evicts_oldest_at_bound() {
        let site = CallSiteCache::new(OriginalCode::new("f", "f.py", 1));
        let policy = FifoEvictionPolicy::new();

        assert!(site.insert(entry("e1"), 2, &policy).is_empty());
        assert!(site.insert(entry("e2"), 2, &policy).is_empty());
        let evicted = site.insert(entry("e3"), 2, &policy);

        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].code().name(), "e1");
        assert_eq!(names(&site), ["e2", "e3"]);
    }

    #[test]
    fn readers_keep_evicted_entries_alive() {
        let site = CallSiteCache::new(OriginalCode::new("f", "f.py", 1));
        let policy = FifoEvictionPolicy::new();
        site.insert(entry("e1"), 1, &policy);

        let held = site.entries();
        let evicted = site.insert(entry("e2"), 1, &policy);
        drop(evicted);

        assert_eq!(held[0].code().name(), "e1");
        assert_eq!(names(&site), ["e2"]);
    }

    #[test]
    fn restrict_never_relaxes() {
        let site = CallSiteCache::new(OriginalCode::new("f", "f.py", 1));
        assert_eq!(site.restrict(SiteState::Skip), SiteState::Active);
        assert_eq!(site.restrict(SiteState::Active), SiteState::Skip);
        assert_eq!(site.state(), SiteState::Skip);

        site.insert(entry("e1"), 4, &FifoEvictionPolicy::new());
        assert_eq!(site.reset(), 1);
        assert_eq!(site.state(), SiteState::Active);
        assert!(site.is_empty());
    }

    #[test]
    fn eviction_is_noted_once() {
        let site = CallSiteCache::new(OriginalCode::new("f", "f.py", 1));
        assert!(site.note_eviction());
        assert!(!site.note_eviction());
    }

    struct NoVictim;

    impl EvictionPolicy for NoVictim {
        fn select_victim(&self, _: &[Arc<GuardedCode>]) -> Option<usize> {
            None
        }
    }

    struct OutOfRange;

    impl EvictionPolicy for OutOfRange {
        fn select_victim(&self, entries: &[Arc<GuardedCode>]) -> Option<usize> {
            Some(entries.len() + 3)
        }
    }

    #[test]
    fn unusable_victim_falls_back_to_oldest() {
        for policy in [&NoVictim as &dyn EvictionPolicy, &OutOfRange] {
            let site = CallSiteCache::new(OriginalCode::new("f", "f.py", 1));
            site.insert(entry("e1"), 2, policy);
            site.insert(entry("e2"), 2, policy);
            let evicted = site.insert(entry("e3"), 2, policy);

            assert_eq!(evicted.len(), 1);
            assert_eq!(evicted[0].code().name(), "e1");
            assert_eq!(names(&site), ["e2", "e3"]);
        }
    }

    #[test]
    fn stale_generation_is_not_published() {
        let site = CallSiteCache::new(OriginalCode::new("f", "f.py", 1));
        let policy = FifoEvictionPolicy::new();
        let before = site.generation();

        site.reset();
        assert!(site.insert_at(entry("e1"), 2, &policy, before).is_none());
        assert!(site.is_empty());

        let current = site.generation();
        assert!(site.insert_at(entry("e2"), 2, &policy, current).is_some());
        site.retire();
        assert!(site.insert_at(entry("e3"), 2, &policy, current).is_none());
        assert_eq!(names(&site), ["e2"]);
    }
}
