use std::fmt;
use std::sync::Arc;

use crate::runtime::code::OriginalCode;

/// Report produced when a guard rejects a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardFail {
    /// Terse rendering of the sub-check that failed.
    pub reason: String,
    /// The code object whose specialization was rejected.
    pub orig_code: OriginalCode,
}

impl GuardFail {
    pub fn new(reason: impl Into<String>, orig_code: &OriginalCode) -> Self {
        Self {
            reason: reason.into(),
            orig_code: orig_code.clone(),
        }
    }
}

impl fmt::Display for GuardFail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.orig_code, self.reason)
    }
}

/// Failure-reporting callback attached to a guard when it is built.
pub type GuardFailFn = Arc<dyn Fn(&GuardFail) + Send + Sync>;
