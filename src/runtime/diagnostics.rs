//! Guard failure reporting.

use std::fmt;

use tracing::debug;

use super::code::OriginalCode;
use super::guard::GuardFail;

pub const RECOMPILES_TARGET: &str = "guardcache::recompiles";

/// Receives a [`GuardFail`] whenever a lookup misses every cached guard.
pub trait FailureSink: Send + Sync {
    fn report(&self, failure: &GuardFail);
}

impl<F> FailureSink for F
where
    F: Fn(&GuardFail) + Send + Sync,
{
    fn report(&self, failure: &GuardFail) {
        self(failure);
    }
}

/// Logs failures at `debug` on the `guardcache::recompiles` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFailureSink;

impl FailureSink for TracingFailureSink {
    fn report(&self, failure: &GuardFail) {
        debug!(
            target: RECOMPILES_TARGET,
            code = %failure.orig_code,
            reason = %failure.reason,
            "guard failure"
        );
    }
}

/// Why a call site is about to be recompiled: the failure reason of every
/// cached entry, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecompileReport {
    pub code: OriginalCode,
    pub reasons: Vec<String>,
}

impl RecompileReport {
    pub fn new(code: &OriginalCode, reasons: Vec<String>) -> Self {
        Self {
            code: code.clone(),
            reasons,
        }
    }

    pub fn to_guard_fail(&self) -> GuardFail {
        GuardFail::new(self.reasons.join("; "), &self.code)
    }
}

impl fmt::Display for RecompileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Recompiling function {} in {}:{}",
            self.code.name(),
            self.code.filename(),
            self.code.first_line()
        )?;
        if self.reasons.is_empty() {
            return Ok(());
        }
        write!(f, "\n    triggered by the following guard failure(s):")?;
        for (index, reason) in self.reasons.iter().enumerate() {
            write!(f, "\n    - {index}/{}: {reason}", self.reasons.len())?;
        }
        Ok(())
    }
}
