use std::borrow::Cow;
use std::fmt;

use super::check::{GuardCheck, LookupScope};
use super::{GuardFailFn, GuardFn, GuardVerdict};
use crate::error::GuardError;
use crate::runtime::bindings::{BindingSnapshot, GlobalScope};
use crate::runtime::value::Value;

const GLOBAL_SCOPE_PART: &str = "___check_global_scope(G)";
const ARGS_PART: &str = "___check_args(L)";

/// A guard assembled from [`GuardCheck`]s by [`GuardBuilder`](super::GuardBuilder).
///
/// Evaluation order is fixed: the snapshot must run in the scope the guard
/// was built for, every declared argument must be bound, then each check
/// runs in insertion order and the first failing one is the reason.
pub struct CompiledGuard {
    pub(super) checks: Vec<GuardCheck>,
    pub(super) closure_vars: Vec<(String, Value)>,
    pub(super) args: Vec<String>,
    pub(super) code_parts: Vec<String>,
    pub(super) verbose_code_parts: Vec<String>,
    pub(super) global_scope: GlobalScope,
    pub(super) guard_fail_fn: Option<GuardFailFn>,
}

impl CompiledGuard {
    pub fn checks(&self) -> &[GuardCheck] {
        &self.checks
    }
}

impl GuardFn for CompiledGuard {
    fn check<'g>(&'g self, snapshot: &BindingSnapshot<'_>) -> GuardVerdict<'g> {
        if !snapshot.globals().same_scope(&self.global_scope) {
            return GuardVerdict::Fail(Cow::Borrowed(GLOBAL_SCOPE_PART));
        }

        for arg in &self.args {
            if snapshot.local(arg).is_none() {
                return GuardVerdict::Fault {
                    check: Cow::Borrowed(ARGS_PART),
                    error: GuardError::MissingLocal {
                        name: arg.clone(),
                        suggestion: guardcache_utils::suggest_name(
                            arg,
                            snapshot.locals().names(),
                        ),
                    },
                };
            }
        }

        let scope = LookupScope {
            snapshot,
            globals: &self.global_scope,
            closure_vars: &self.closure_vars,
        };
        for (check, part) in self.checks.iter().zip(&self.code_parts) {
            match check.evaluate(&scope) {
                Ok(true) => {}
                Ok(false) => return GuardVerdict::Fail(Cow::Borrowed(part.as_str())),
                Err(error) => {
                    return GuardVerdict::Fault {
                        check: Cow::Borrowed(part.as_str()),
                        error,
                    };
                }
            }
        }
        GuardVerdict::Pass
    }

    fn closure_vars(&self) -> &[(String, Value)] {
        &self.closure_vars
    }

    fn args(&self) -> &[String] {
        &self.args
    }

    fn code_parts(&self) -> &[String] {
        &self.code_parts
    }

    fn verbose_code_parts(&self) -> &[String] {
        &self.verbose_code_parts
    }

    fn global_scope(&self) -> Option<&GlobalScope> {
        Some(&self.global_scope)
    }

    fn guard_fail_fn(&self) -> Option<&GuardFailFn> {
        self.guard_fail_fn.as_ref()
    }
}

impl fmt::Debug for CompiledGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledGuard")
            .field("args", &self.args)
            .field("code_parts", &self.code_parts)
            .field("closure_vars", &self.closure_vars)
            .field("has_fail_fn", &self.guard_fail_fn.is_some())
            .finish_non_exhaustive()
    }
}
