use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, info, trace, warn};

use super::bindings::{BindingSnapshot, Frame};
use super::cache::{
    CacheStats, CallSiteCache, CodeCacheRegistry, EvictionPolicy, FifoEvictionPolicy,
    GuardedCode, SiteState,
};
use super::callback::{CallbackMode, CompileCallback, CompileOutcome};
use super::code::{OriginalCode, SpecializedCode};
use super::diagnostics::{FailureSink, RECOMPILES_TARGET, RecompileReport, TracingFailureSink};
use super::guard::GuardVerdict;
use super::hook::{GuardHook, GuardHookSlot};
use super::metrics::{ResolverMetrics, ResolverMetricsSnapshot};
use crate::config::CacheConfig;
use crate::error::{CompileError, ConfigError};

pub const GUARDS_TARGET: &str = "guardcache::guards";

/// Which code the interception point should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A cached specialization whose guard passed.
    Cached(SpecializedCode),
    /// A specialization compiled for this call and now cached.
    Compiled(SpecializedCode),
    /// No substitution: run the original code.
    Original,
}

impl Resolution {
    /// The specialization to run, if any.
    pub fn code(&self) -> Option<&SpecializedCode> {
        match self {
            Self::Cached(code) | Self::Compiled(code) => Some(code),
            Self::Original => None,
        }
    }

    /// Consumes the resolution, yielding the specialization to run.
    pub fn into_code(self) -> Option<SpecializedCode> {
        match self {
            Self::Cached(code) | Self::Compiled(code) => Some(code),
            Self::Original => None,
        }
    }

    /// Whether the original code is replaced for this call.
    pub fn is_substituted(&self) -> bool {
        !matches!(self, Self::Original)
    }
}

/// Decides, per invocation, whether to reuse, extend or give up on the
/// specializations of a call site.
///
/// Guards are evaluated in insertion order with no lock held; only the
/// append/evict step of a new specialization is serialized, per call site.
pub struct RecompilationController {
    config: CacheConfig,
    registry: CodeCacheRegistry,
    callback: RwLock<CallbackMode>,
    hook: GuardHookSlot,
    failure_sink: Option<Arc<dyn FailureSink>>,
    eviction: Arc<dyn EvictionPolicy>,
    metrics: Arc<ResolverMetrics>,
}

impl RecompilationController {
    /// Creates a controller after validating `config`.
    pub fn new(config: CacheConfig, callback: CallbackMode) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            registry: CodeCacheRegistry::new(),
            callback: RwLock::new(callback),
            hook: GuardHookSlot::default(),
            failure_sink: Some(Arc::new(TracingFailureSink)),
            eviction: Arc::new(FifoEvictionPolicy::new()),
            metrics: ResolverMetrics::new(),
        })
    }

    /// Installs an observation hook at construction.
    pub fn with_guard_hook(self, hook: Arc<dyn GuardHook>) -> Self {
        self.hook.set(hook);
        self
    }

    /// Replaces the default sink, which logs through `tracing`.
    pub fn with_failure_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.failure_sink = Some(sink);
        self
    }

    /// Drops full-miss reports instead of handing them to a sink.
    pub fn without_failure_sink(mut self) -> Self {
        self.failure_sink = None;
        self
    }

    /// Overrides the FIFO policy used when a site reaches its bound.
    pub fn with_eviction_policy(mut self, policy: Arc<dyn EvictionPolicy>) -> Self {
        self.eviction = policy;
        self
    }

    /// The configuration the controller was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Installs a new callback, returning the previous one.
    pub fn set_callback(&self, callback: CallbackMode) -> CallbackMode {
        std::mem::replace(&mut *self.callback.write(), callback)
    }

    /// The callback currently installed.
    pub fn callback(&self) -> CallbackMode {
        self.callback.read().clone()
    }

    /// Installs the observation hook, returning the one it replaces.
    pub fn set_guard_hook(&self, hook: Arc<dyn GuardHook>) -> Option<Arc<dyn GuardHook>> {
        self.hook.set(hook)
    }

    /// Removes the observation hook, returning it.
    pub fn clear_guard_hook(&self) -> Option<Arc<dyn GuardHook>> {
        self.hook.clear()
    }

    /// Point-in-time copy of the lookup counters.
    pub fn metrics(&self) -> ResolverMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Sizes and states of every known call site.
    pub fn cache_stats(&self) -> CacheStats {
        self.registry.stats()
    }

    /// The call-site cache of `code`, if one exists.
    pub fn site(&self, code: &OriginalCode) -> Option<Arc<CallSiteCache>> {
        self.registry.get(code.id())
    }

    /// Number of specializations cached for `code`.
    pub fn cache_size(&self, code: &OriginalCode) -> usize {
        self.site(code).map_or(0, |site| site.len())
    }

    /// Drops every specialization of `code`, e.g. when the host destroys it.
    pub fn forget(&self, code: &OriginalCode) -> bool {
        self.registry.forget(code.id()).is_some()
    }

    /// Empties the cache of `code` and lets the compiler run for it again.
    pub fn reset(&self, code: &OriginalCode) -> usize {
        self.site(code).map_or(0, |site| site.reset())
    }

    /// Drops every call site.
    pub fn clear(&self) {
        self.registry.clear();
    }

    /// Caches a specialization built outside `resolve`, such as one the host
    /// restored from a previous run.
    pub fn install(&self, code: &OriginalCode, entry: GuardedCode) {
        self.store(code, entry);
    }

    fn store(&self, code: &OriginalCode, entry: GuardedCode) {
        let site = self.registry.get_or_create(code);
        let evicted = site.insert(
            Arc::new(entry),
            self.config.max_entries_per_site,
            self.eviction.as_ref(),
        );
        self.note_evictions(code, &site, evicted.len());
    }

    fn note_evictions(&self, code: &OriginalCode, site: &CallSiteCache, evicted: usize) {
        self.metrics.record_evictions(evicted);
        if evicted != 0 && site.note_eviction() {
            warn!(
                target: RECOMPILES_TARGET,
                %code,
                max_entries_per_site = self.config.max_entries_per_site,
                "call site reached its cache bound, evicting oldest specializations"
            );
        }
    }

    /// Picks the code to run for one invocation of `code`.
    ///
    /// Returns the first cached specialization whose guard accepts
    /// `snapshot`. On a full miss the failure is reported and the compiler
    /// is asked for a new specialization, which is cached (evicting the
    /// oldest entry at the bound) and returned. Compiler errors propagate
    /// with the cache unchanged.
    pub fn resolve(
        &self,
        code: &OriginalCode,
        snapshot: &BindingSnapshot<'_>,
    ) -> Result<Resolution, CompileError> {
        self.metrics.record_lookup();

        let callback = self.callback.read().clone();
        if callback.is_disabled() {
            return Ok(Resolution::Original);
        }

        let site = self.registry.get(code.id());
        if site
            .as_ref()
            .is_some_and(|site| site.state() == SiteState::Skip)
        {
            return Ok(Resolution::Original);
        }

        if let Some(site) = &site {
            let entries = site.entries();
            if !entries.is_empty() {
                match self.scan(code, &entries, snapshot) {
                    Ok(specialized) => {
                        self.metrics.record_hit();
                        return Ok(Resolution::Cached(specialized));
                    }
                    Err(failures) => self.report_miss(code, &failures),
                }
            }
        }
        self.metrics.record_miss();

        match callback {
            CallbackMode::Compile(compiler) => self.compile(code, snapshot, compiler.as_ref()),
            CallbackMode::RunOnly | CallbackMode::Disabled => Ok(Resolution::Original),
        }
    }

    fn scan<'e>(
        &self,
        code: &OriginalCode,
        entries: &'e [Arc<GuardedCode>],
        snapshot: &BindingSnapshot<'_>,
    ) -> Result<SpecializedCode, Vec<GuardVerdict<'e>>> {
        let hook = self.hook.current();
        let last = entries.len() - 1;
        let mut failures = Vec::new();

        for (index, entry) in entries.iter().enumerate() {
            let guard = entry.check_fn();
            if let Some(hook) = &hook {
                hook.on_guard(guard, code, snapshot, index == last);
            }

            let verdict = guard.evaluate_for(snapshot, code);
            if verdict.passed() {
                entry.metadata().record_hit();
                trace!(target: GUARDS_TARGET, %code, entry = index, "guard passed");
                return Ok(entry.code().clone());
            }
            if verdict.is_fault() {
                self.metrics.record_guard_fault();
            }
            failures.push(verdict);
        }

        Err(failures)
    }

    fn report_miss(&self, code: &OriginalCode, failures: &[GuardVerdict<'_>]) {
        let reasons = failures.iter().filter_map(|verdict| verdict.reason()).collect();
        let report = RecompileReport::new(code, reasons);
        debug!(target: RECOMPILES_TARGET, "{report}");

        if self.config.report_guard_failures {
            if let Some(sink) = &self.failure_sink {
                sink.report(&report.to_guard_fail());
            }
        }
    }

    /// Runs the compiler for a full miss.
    ///
    /// The outcome is only recorded on the site as it was when compilation
    /// started; a `reset` or `forget` in the meantime discards it.
    fn compile(
        &self,
        code: &OriginalCode,
        snapshot: &BindingSnapshot<'_>,
        compiler: &dyn CompileCallback,
    ) -> Result<Resolution, CompileError> {
        let site = self.registry.get_or_create(code);
        let generation = site.generation();
        let frame = Frame::new(code, *snapshot);
        let started = Instant::now();
        let outcome = compiler.compile(&frame, site.len()).inspect_err(|err| {
            self.metrics.record_compile_error();
            warn!(target: RECOMPILES_TARGET, %code, error = %err, "compilation failed");
        })?;

        match outcome {
            CompileOutcome::Compiled(mut entry) => {
                let compile_time = started.elapsed();
                entry.set_compile_time(compile_time);
                let specialized = entry.code().clone();
                self.metrics.record_compile();

                let inserted = site.insert_at(
                    Arc::new(entry),
                    self.config.max_entries_per_site,
                    self.eviction.as_ref(),
                    generation,
                );
                match inserted {
                    Some(evicted) => {
                        self.note_evictions(code, &site, evicted.len());
                        debug!(
                            target: RECOMPILES_TARGET,
                            %code,
                            specialization = specialized.name(),
                            cache_size = site.len(),
                            ?compile_time,
                            "cached new specialization"
                        );
                    }
                    None => debug!(
                        target: RECOMPILES_TARGET,
                        %code,
                        specialization = specialized.name(),
                        "call site was reset or forgotten during compilation, not caching"
                    ),
                }
                Ok(Resolution::Compiled(specialized))
            }
            CompileOutcome::Decline => {
                site.restrict_at(SiteState::Skip, generation);
                self.metrics.record_decline();
                info!(target: RECOMPILES_TARGET, %code, "compiler declined, original code runs from now on");
                Ok(Resolution::Original)
            }
            CompileOutcome::Disable => {
                site.restrict_at(SiteState::Skip, generation);
                self.metrics.record_disable();
                info!(target: RECOMPILES_TARGET, %code, "compiler disabled specialization for this code");
                Ok(Resolution::Original)
            }
        }
    }
}

impl std::fmt::Debug for RecompilationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecompilationController")
            .field("config", &self.config)
            .field("callback", &*self.callback.read())
            .field("hook", &self.hook)
            .field("sites", &self.registry.len())
            .finish_non_exhaustive()
    }
}
