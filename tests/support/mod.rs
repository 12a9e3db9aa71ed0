#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use guardcache::{
    CallbackMode, CompileCallback, CompileError, CompileOutcome, Frame, GlobalScope, GuardBuilder,
    GuardedCode, SpecializedCode, Source, Value,
};
use parking_lot::Mutex;

/// Compiles one specialization per distinct value of local `x`, guarded on
/// `x == value`. Specializations are named `E1`, `E2`, ... in compile order.
///
/// String values steer the outcome: `"decline"`, `"disable"` and `"error"`.
pub struct ScriptedCompiler {
    globals: GlobalScope,
    calls: AtomicUsize,
    compiled: AtomicUsize,
    cache_sizes: Mutex<Vec<usize>>,
}

impl ScriptedCompiler {
    pub fn new(globals: &GlobalScope) -> Arc<Self> {
        Arc::new(Self {
            globals: globals.clone(),
            calls: AtomicUsize::new(0),
            compiled: AtomicUsize::new(0),
            cache_sizes: Mutex::new(Vec::new()),
        })
    }

    pub fn mode(self: &Arc<Self>) -> CallbackMode {
        CallbackMode::Compile(Arc::clone(self) as Arc<dyn CompileCallback>)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn cache_sizes(&self) -> Vec<usize> {
        self.cache_sizes.lock().clone()
    }
}

impl CompileCallback for ScriptedCompiler {
    fn compile(&self, frame: &Frame<'_>, cache_size: usize) -> Result<CompileOutcome, CompileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cache_sizes.lock().push(cache_size);

        let x = frame
            .snapshot()
            .local("x")
            .cloned()
            .ok_or_else(|| CompileError::failed(frame.code(), "no local `x`"))?;
        match &x {
            Value::Str(s) if &**s == "decline" => return Ok(CompileOutcome::Decline),
            Value::Str(s) if &**s == "disable" => return Ok(CompileOutcome::Disable),
            Value::Str(s) if &**s == "error" => {
                return Err(CompileError::failed(frame.code(), "backend exploded"));
            }
            _ => {}
        }

        let n = self.compiled.fetch_add(1, Ordering::SeqCst) + 1;
        let guard = GuardBuilder::new(&self.globals)
            .arg("x")
            .equals(Source::local("x"), x)
            .build();
        Ok(CompileOutcome::Compiled(GuardedCode::new(
            SpecializedCode::new(format!("E{n}"), Vec::new()),
            guard,
        )))
    }
}

pub fn entry_names(entries: &[Arc<GuardedCode>]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| entry.code().name().to_string())
        .collect()
}
