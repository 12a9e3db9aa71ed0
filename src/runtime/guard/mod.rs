//! Guard predicates: the validity check that authorizes a specialization.

mod builder;
mod check;
mod compiled;
mod failure;

pub use builder::GuardBuilder;
pub use check::{GuardCheck, Source};
pub use compiled::CompiledGuard;
pub use failure::{GuardFail, GuardFailFn};

use std::borrow::Cow;
use std::fmt;

use crate::error::GuardError;
use crate::runtime::bindings::{BindingSnapshot, GlobalScope};
use crate::runtime::code::OriginalCode;
use crate::runtime::value::Value;

/// Outcome of running a guard against one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardVerdict<'g> {
    Pass,
    /// A sub-check evaluated to false.
    Fail(Cow<'g, str>),
    /// A sub-check could not be evaluated; treated as a failure.
    Fault { check: Cow<'g, str>, error: GuardError },
}

impl GuardVerdict<'_> {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Pass)
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault { .. })
    }

    /// Terse reason for a failed verdict; `None` when it passed.
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Pass => None,
            Self::Fail(reason) => Some(reason.to_string()),
            Self::Fault { check, error } => Some(format!("{check} ({error})")),
        }
    }
}

/// A side-effect-free predicate over a binding snapshot.
///
/// Implementations must be deterministic for a fixed snapshot and safe to
/// call concurrently. A guard that cannot evaluate must return
/// [`GuardVerdict::Fault`] rather than panic.
pub trait GuardFn: Send + Sync {
    fn check<'g>(&'g self, snapshot: &BindingSnapshot<'_>) -> GuardVerdict<'g>;

    /// Closure values captured when the guard was built, in capture order.
    fn closure_vars(&self) -> &[(String, Value)] {
        &[]
    }

    /// Parameter names the guard expects to receive.
    fn args(&self) -> &[String] {
        &[]
    }

    fn code_parts(&self) -> &[String] {
        &[]
    }

    fn verbose_code_parts(&self) -> &[String] {
        &[]
    }

    fn global_scope(&self) -> Option<&GlobalScope> {
        None
    }

    fn guard_fail_fn(&self) -> Option<&GuardFailFn> {
        None
    }

    fn evaluate(&self, snapshot: &BindingSnapshot<'_>) -> bool {
        self.check(snapshot).passed()
    }

    /// Checks `snapshot` and, on failure, hands a [`GuardFail`] for `code`
    /// to the guard's failure callback.
    fn evaluate_for<'g>(
        &'g self,
        snapshot: &BindingSnapshot<'_>,
        code: &OriginalCode,
    ) -> GuardVerdict<'g> {
        let verdict = self.check(snapshot);
        if let (Some(fail_fn), Some(reason)) = (self.guard_fail_fn(), verdict.reason()) {
            (**fail_fn)(&GuardFail::new(reason, code));
        }
        verdict
    }
}

/// Adapts a plain function into a [`GuardFn`].
///
/// Useful for hosts whose compiler emits native predicates; `description`
/// is reported as the failure reason.
pub struct FnGuard<F> {
    description: String,
    code_parts: Vec<String>,
    predicate: F,
    guard_fail_fn: Option<GuardFailFn>,
}

impl<F> FnGuard<F>
where
    F: Fn(&BindingSnapshot<'_>) -> Result<bool, GuardError> + Send + Sync,
{
    pub fn new(description: impl Into<String>, predicate: F) -> Self {
        let description = description.into();
        Self {
            code_parts: vec![description.clone()],
            description,
            predicate,
            guard_fail_fn: None,
        }
    }

    pub fn on_failure(mut self, fail_fn: GuardFailFn) -> Self {
        self.guard_fail_fn = Some(fail_fn);
        self
    }
}

impl<F> GuardFn for FnGuard<F>
where
    F: Fn(&BindingSnapshot<'_>) -> Result<bool, GuardError> + Send + Sync,
{
    fn check<'g>(&'g self, snapshot: &BindingSnapshot<'_>) -> GuardVerdict<'g> {
        match (self.predicate)(snapshot) {
            Ok(true) => GuardVerdict::Pass,
            Ok(false) => GuardVerdict::Fail(Cow::Borrowed(self.description.as_str())),
            Err(error) => GuardVerdict::Fault {
                check: Cow::Borrowed(self.description.as_str()),
                error,
            },
        }
    }

    fn code_parts(&self) -> &[String] {
        &self.code_parts
    }

    fn verbose_code_parts(&self) -> &[String] {
        &self.code_parts
    }

    fn guard_fail_fn(&self) -> Option<&GuardFailFn> {
        self.guard_fail_fn.as_ref()
    }
}

impl<F> fmt::Debug for FnGuard<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnGuard")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
