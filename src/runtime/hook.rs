//! Observation hook: a side channel notified of every guard evaluation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use super::bindings::BindingSnapshot;
use super::code::OriginalCode;
use super::guard::GuardFn;

/// Observer called before each guard evaluation.
///
/// `last` is true for the final entry of the call site's cache. Hooks must
/// not influence resolution.
pub trait GuardHook: Send + Sync {
    fn on_guard(
        &self,
        guard: &dyn GuardFn,
        code: &OriginalCode,
        snapshot: &BindingSnapshot<'_>,
        last: bool,
    );
}

impl<F> GuardHook for F
where
    F: Fn(&dyn GuardFn, &OriginalCode, &BindingSnapshot<'_>, bool) + Send + Sync,
{
    fn on_guard(
        &self,
        guard: &dyn GuardFn,
        code: &OriginalCode,
        snapshot: &BindingSnapshot<'_>,
        last: bool,
    ) {
        self(guard, code, snapshot, last);
    }
}

/// Holds at most one installed [`GuardHook`].
///
/// When empty, a lookup costs a single relaxed load.
#[derive(Default)]
pub struct GuardHookSlot {
    installed: AtomicBool,
    hook: RwLock<Option<Arc<dyn GuardHook>>>,
}

impl GuardHookSlot {
    pub fn new(hook: Option<Arc<dyn GuardHook>>) -> Self {
        Self {
            installed: AtomicBool::new(hook.is_some()),
            hook: RwLock::new(hook),
        }
    }

    /// Installs `hook`, returning the one it replaces.
    pub fn set(&self, hook: Arc<dyn GuardHook>) -> Option<Arc<dyn GuardHook>> {
        let mut slot = self.hook.write();
        let previous = slot.replace(hook);
        self.installed.store(true, Ordering::Release);
        previous
    }

    pub fn clear(&self) -> Option<Arc<dyn GuardHook>> {
        let mut slot = self.hook.write();
        self.installed.store(false, Ordering::Release);
        slot.take()
    }

    #[inline]
    pub fn current(&self) -> Option<Arc<dyn GuardHook>> {
        if !self.installed.load(Ordering::Acquire) {
            return None;
        }
        self.hook.read().clone()
    }

    pub fn is_set(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for GuardHookSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardHookSlot")
            .field("installed", &self.is_set())
            .finish()
    }
}
