mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use anyhow::Result;
use guardcache::{
    BindingSnapshot, CacheConfig, CallbackMode, CompileCallback, CompileError, CompileOutcome, Frame,
    GlobalScope, GuardBuilder, GuardedCode, Locals, OriginalCode, RecompilationController,
    Resolution, Source, SpecializedCode, Value,
};
use support::{ScriptedCompiler, entry_names};

const THREADS: i64 = 8;
const ROUNDS: usize = 200;

#[test]
fn concurrent_resolves_respect_the_bound() -> Result<()> {
    let globals = GlobalScope::new();
    let compiler = ScriptedCompiler::new(&globals);
    let controller =
        RecompilationController::new(CacheConfig::with_max_entries(3), compiler.mode())?;
    let code = OriginalCode::new("hot", "threads.py", 1);

    thread::scope(|scope| {
        for t in 0..THREADS {
            let controller = &controller;
            let code = &code;
            let globals = &globals;
            scope.spawn(move || {
                for round in 0..ROUNDS {
                    let mut locals = Locals::new();
                    locals.insert("x", (t + round as i64) % 5);
                    let snapshot = BindingSnapshot::new(&locals, globals);
                    let resolution = controller
                        .resolve(code, &snapshot)
                        .expect("integer locals always compile");
                    assert!(resolution.is_substituted());
                    assert!(controller.cache_size(code) <= 3);
                }
            });
        }
    });

    let site = controller.site(&code).expect("site");
    assert!(site.len() <= 3);
    let metrics = controller.metrics();
    assert_eq!(metrics.lookups, THREADS as u64 * ROUNDS as u64);
    assert_eq!(metrics.hits + metrics.compiles, metrics.lookups);
    assert_eq!(metrics.compiles, compiler.calls() as u64);
    Ok(())
}

#[test]
fn evicted_entry_stays_alive_for_an_in_flight_scan() -> Result<()> {
    let globals = GlobalScope::new();
    let compiler = ScriptedCompiler::new(&globals);
    let controller =
        RecompilationController::new(CacheConfig::with_max_entries(1), compiler.mode())?;
    let code = OriginalCode::new("f", "cow.py", 1);

    let one = locals_with(1);
    controller.resolve(&code, &BindingSnapshot::new(&one, &globals))?;
    let site = controller.site(&code).expect("site");
    let in_flight = site.entries();

    let two = locals_with(2);
    controller.resolve(&code, &BindingSnapshot::new(&two, &globals))?;

    assert_eq!(entry_names(&in_flight), ["E1"]);
    assert!(in_flight[0].check_fn().evaluate(&BindingSnapshot::new(&one, &globals)));
    assert_eq!(entry_names(&site.entries()), ["E2"]);
    Ok(())
}

fn locals_with(x: i64) -> Locals {
    [("x", Value::Int(x))].into_iter().collect()
}

/// Resolves a helper function from inside its own compilation.
struct ReentrantCompiler {
    controller: Arc<RecompilationController>,
    helper: OriginalCode,
    globals: GlobalScope,
    nested: AtomicUsize,
}

impl CompileCallback for ReentrantCompiler {
    fn compile(&self, frame: &Frame<'_>, _cache_size: usize) -> Result<CompileOutcome, CompileError> {
        if frame.code() != &self.helper {
            let nested = self
                .controller
                .resolve(&self.helper, frame.snapshot())?;
            assert!(nested.is_substituted());
            self.nested.fetch_add(1, Ordering::SeqCst);
        }
        let guard = GuardBuilder::new(&self.globals)
            .not_none(Source::local("x"))
            .build();
        Ok(CompileOutcome::Compiled(GuardedCode::new(
            SpecializedCode::new(format!("{}_fast", frame.code().name()), Vec::new()),
            guard,
        )))
    }
}

#[test]
fn compiler_may_reenter_resolve() -> Result<()> {
    let globals = GlobalScope::new();
    let controller = Arc::new(RecompilationController::new(
        CacheConfig::default(),
        CallbackMode::RunOnly,
    )?);
    let outer = OriginalCode::new("outer", "reentrant.py", 1);
    let helper = OriginalCode::new("helper", "reentrant.py", 9);
    let compiler = Arc::new(ReentrantCompiler {
        controller: Arc::clone(&controller),
        helper: helper.clone(),
        globals: globals.clone(),
        nested: AtomicUsize::new(0),
    });
    controller.set_callback(CallbackMode::Compile(compiler.clone()));

    let locals = locals_with(1);
    let resolution = controller.resolve(&outer, &BindingSnapshot::new(&locals, &globals))?;

    assert_eq!(
        resolution.code().map(|code| code.name().to_string()),
        Some("outer_fast".to_string())
    );
    assert_eq!(compiler.nested.load(Ordering::SeqCst), 1);
    assert_eq!(controller.cache_size(&helper), 1);

    // Break the controller -> callback -> controller cycle.
    controller.set_callback(CallbackMode::Disabled);
    assert!(matches!(
        controller.resolve(&outer, &BindingSnapshot::new(&locals, &globals))?,
        Resolution::Original
    ));
    Ok(())
}
