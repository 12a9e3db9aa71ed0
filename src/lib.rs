//! Guard-validated specialization cache for a runtime's function-call
//! interception point.
//!
//! A [`RecompilationController`] sits between the host interpreter and a
//! compiler. For every invocation it scans the specializations cached for
//! the callee, runs the first one whose guard accepts the current bindings,
//! and otherwise asks the compiler for a new one.

pub mod config;
pub mod error;
pub mod runtime;

pub use config::CacheConfig;
pub use error::{CompileError, ConfigError, GuardError};
pub use guardcache_utils::init_logging;
pub use runtime::bindings::{BindingSnapshot, Frame, GlobalScope, Locals};
pub use runtime::cache::{CacheStats, EvictionPolicy, FifoEvictionPolicy, GuardedCode, SiteState};
pub use runtime::callback::{CallbackMode, CompileCallback, CompileOutcome};
pub use runtime::code::{CodeId, OriginalCode, SpecializedCode};
pub use runtime::diagnostics::{FailureSink, RecompileReport, TracingFailureSink};
pub use runtime::guard::{
    CompiledGuard, FnGuard, GuardBuilder, GuardCheck, GuardFail, GuardFn, GuardVerdict, Source,
};
pub use runtime::hook::GuardHook;
pub use runtime::metrics::ResolverMetricsSnapshot;
pub use runtime::value::{ObjectRef, TypeTag, Value};
pub use runtime::{RecompilationController, Resolution};
