//! The compilation callback: the external compiler as seen by the cache.

use std::fmt;
use std::sync::Arc;

use super::bindings::Frame;
use super::cache::GuardedCode;
use crate::error::CompileError;

/// What the compiler produced for a frame that missed every cached guard.
#[derive(Debug)]
pub enum CompileOutcome {
    /// A new specialization to cache and run.
    Compiled(GuardedCode),
    /// Nothing worth specializing: the original code runs for this and
    /// every later call to the site.
    Decline,
    /// Never substitute code for this site again.
    Disable,
}

/// Produces a guarded specialization for a frame.
///
/// `cache_size` is the number of entries the site holds when the callback
/// runs. Errors propagate to the caller of `resolve` and leave the cache
/// untouched.
pub trait CompileCallback: Send + Sync {
    fn compile(&self, frame: &Frame<'_>, cache_size: usize) -> Result<CompileOutcome, CompileError>;
}

impl<F> CompileCallback for F
where
    F: Fn(&Frame<'_>, usize) -> Result<CompileOutcome, CompileError> + Send + Sync,
{
    fn compile(&self, frame: &Frame<'_>, cache_size: usize) -> Result<CompileOutcome, CompileError> {
        self(frame, cache_size)
    }
}

/// The callback currently installed at the interception point.
#[derive(Clone, Default)]
pub enum CallbackMode {
    /// No interception: the original code always runs.
    #[default]
    Disabled,
    /// Cached specializations are used but misses are never compiled.
    RunOnly,
    Compile(Arc<dyn CompileCallback>),
}

impl CallbackMode {
    pub fn compile<C>(callback: C) -> Self
    where
        C: CompileCallback + 'static,
    {
        Self::Compile(Arc::new(callback))
    }

    /// Like [`CallbackMode::compile`], for closures.
    pub fn compile_fn<F>(callback: F) -> Self
    where
        F: Fn(&Frame<'_>, usize) -> Result<CompileOutcome, CompileError> + Send + Sync + 'static,
    {
        Self::Compile(Arc::new(callback))
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }
}

impl fmt::Debug for CallbackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::RunOnly => f.write_str("RunOnly"),
            Self::Compile(_) => f.write_str("Compile(..)"),
        }
    }
}
