use std::sync::Arc;

use super::check::{GuardCheck, Source};
use super::compiled::CompiledGuard;
use super::failure::{GuardFail, GuardFailFn};
use crate::runtime::bindings::GlobalScope;
use crate::runtime::value::{ObjectRef, TypeTag, Value};

/// Collects the assumptions a compiler made and freezes them into a
/// [`CompiledGuard`].
pub struct GuardBuilder {
    global_scope: GlobalScope,
    checks: Vec<GuardCheck>,
    closure_vars: Vec<(String, Value)>,
    args: Vec<String>,
    guard_fail_fn: Option<GuardFailFn>,
}

impl GuardBuilder {
    pub fn new(global_scope: &GlobalScope) -> Self {
        Self {
            global_scope: global_scope.clone(),
            checks: Vec::new(),
            closure_vars: Vec::new(),
            args: Vec::new(),
            guard_fail_fn: None,
        }
    }

    pub fn arg(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.args.contains(&name) {
            self.args.push(name);
        }
        self
    }

    /// Captures a closure value; capturing the same name twice replaces it.
    pub fn closure_var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.closure_vars.iter_mut().find(|(captured, _)| *captured == name) {
            Some(slot) => slot.1 = value,
            None => self.closure_vars.push((name, value)),
        }
        self
    }

    /// Adds a check; an identical check already present is not repeated.
    pub fn check(mut self, check: GuardCheck) -> Self {
        if !self.checks.contains(&check) {
            self.checks.push(check);
        }
        self
    }

    pub fn type_match(self, source: Source, expected: TypeTag) -> Self {
        self.check(GuardCheck::TypeMatch { source, expected })
    }

    pub fn equals(self, source: Source, expected: impl Into<Value>) -> Self {
        self.check(GuardCheck::ValueEquals {
            source,
            expected: expected.into(),
        })
    }

    pub fn identity(self, source: Source, expected: &ObjectRef) -> Self {
        self.check(GuardCheck::Identity {
            source,
            expected: expected.clone(),
        })
    }

    pub fn is_none(self, source: Source) -> Self {
        self.check(GuardCheck::IsNone { source })
    }

    pub fn not_none(self, source: Source) -> Self {
        self.check(GuardCheck::NotNone { source })
    }

    pub fn tuple_len(self, source: Source, expected: usize) -> Self {
        self.check(GuardCheck::TupleLength { source, expected })
    }

    pub fn on_failure<F>(mut self, fail_fn: F) -> Self
    where
        F: Fn(&GuardFail) + Send + Sync + 'static,
    {
        self.guard_fail_fn = Some(Arc::new(fail_fn));
        self
    }

    pub fn build(self) -> CompiledGuard {
        let code_parts = self.checks.iter().map(GuardCheck::code_part).collect();
        let verbose_code_parts = self
            .checks
            .iter()
            .map(GuardCheck::verbose_code_part)
            .collect();
        CompiledGuard {
            checks: self.checks,
            closure_vars: self.closure_vars,
            args: self.args,
            code_parts,
            verbose_code_parts,
            global_scope: self.global_scope,
            guard_fail_fn: self.guard_fail_fn,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use parking_lot::Mutex;

    use super::*;
    use crate::error::GuardError;
    use crate::runtime::bindings::{BindingSnapshot, Locals};
    use crate::runtime::code::OriginalCode;
    use crate::runtime::guard::{GuardFn, GuardVerdict};

    #[test]
    fn build_renders_code_parts_in_order() {
        let globals = GlobalScope::new();
        let guard = GuardBuilder::new(&globals)
            .arg("x")
            .type_match(Source::local("x"), TypeTag::Int)
            .equals(Source::local("x"), 3_i64)
            .type_match(Source::local("x"), TypeTag::Int)
            .build();

        assert_eq!(guard.code_parts(), ["type(L['x']) is int", "L['x'] == 3"]);
        assert_eq!(guard.verbose_code_parts().len(), 2);
        assert_eq!(guard.args(), ["x"]);
        assert!(guard.global_scope().is_some_and(|scope| scope.same_scope(&globals)));
    }

    #[test]
    fn first_failing_check_is_the_reason() {
        let globals = GlobalScope::new();
        let guard = GuardBuilder::new(&globals)
            .type_match(Source::local("x"), TypeTag::Int)
            .equals(Source::local("x"), 3_i64)
            .build();
        let locals: Locals = [("x", 4_i64)].into_iter().collect();

        let verdict = guard.check(&BindingSnapshot::new(&locals, &globals));
        assert_eq!(verdict, GuardVerdict::Fail(Cow::Borrowed("L['x'] == 3")));
    }

    #[test]
    fn evaluation_does_not_mutate_bindings() {
        let globals = GlobalScope::new();
        globals.set("scale", 2.0);
        let guard = GuardBuilder::new(&globals)
            .equals(Source::global("scale"), 2.0)
            .not_none(Source::local("x"))
            .build();
        let locals: Locals = [("x", 1_i64)].into_iter().collect();
        let before = locals.clone();
        let snapshot = BindingSnapshot::new(&locals, &globals);

        let first = guard.evaluate(&snapshot);
        let second = guard.evaluate(&snapshot);

        assert!(first);
        assert_eq!(first, second);
        assert_eq!(locals.get("x"), before.get("x"));
        assert_eq!(globals.get("scale"), Some(Value::Float(2.0)));
        assert_eq!(globals.names(), vec!["scale".to_string()]);
    }

    #[test]
    fn foreign_global_scope_fails() {
        let globals = GlobalScope::new();
        let guard = GuardBuilder::new(&globals).build();
        let other = GlobalScope::new();
        let locals = Locals::new();
        assert!(guard.evaluate(&BindingSnapshot::new(&locals, &globals)));
        assert!(!guard.evaluate(&BindingSnapshot::new(&locals, &other)));
    }

    #[test]
    fn missing_argument_is_a_fault() {
        let globals = GlobalScope::new();
        let guard = GuardBuilder::new(&globals).arg("batch").build();
        let locals: Locals = [("batches", 1_i64)].into_iter().collect();

        match guard.check(&BindingSnapshot::new(&locals, &globals)) {
            GuardVerdict::Fault { error, .. } => assert_eq!(
                error,
                GuardError::MissingLocal {
                    name: "batch".into(),
                    suggestion: Some("batches".into()),
                }
            ),
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn closure_values_are_checked() {
        let globals = GlobalScope::new();
        let guard = GuardBuilder::new(&globals)
            .closure_var("depth", 1_i64)
            .closure_var("depth", 2_i64)
            .equals(Source::closure("depth"), 2_i64)
            .build();
        let locals = Locals::new();
        assert_eq!(guard.closure_vars().len(), 1);
        assert!(guard.evaluate(&BindingSnapshot::new(&locals, &globals)));
    }

    #[test]
    fn failure_callback_receives_report() {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reports);
        let globals = GlobalScope::new();
        let guard = GuardBuilder::new(&globals)
            .is_none(Source::positional(0))
            .on_failure(move |fail| sink.lock().push(fail.reason.clone()))
            .build();
        let code = OriginalCode::new("g", "g.py", 3);
        let locals = Locals::new();
        let positional = [Value::from(1)];
        let snapshot = BindingSnapshot::new(&locals, &globals).with_positional(&positional);

        assert!(!guard.evaluate_for(&snapshot, &code).passed());
        assert_eq!(*reports.lock(), vec!["P[0] is None".to_string()]);
    }
}
