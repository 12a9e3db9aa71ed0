//! Sub-checks a compiled guard is made of.

use std::fmt;

use guardcache_utils::suggest_name;

use crate::error::GuardError;
use crate::runtime::bindings::{BindingSnapshot, GlobalScope};
use crate::runtime::value::{ObjectRef, TypeTag, Value};

/// Where a checked value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    Local(String),
    Positional(usize),
    Global(String),
    Closure(String),
}

impl Source {
    pub fn local(name: impl Into<String>) -> Self {
        Self::Local(name.into())
    }

    pub fn global(name: impl Into<String>) -> Self {
        Self::Global(name.into())
    }

    pub fn closure(name: impl Into<String>) -> Self {
        Self::Closure(name.into())
    }

    pub fn positional(index: usize) -> Self {
        Self::Positional(index)
    }

    fn describe(&self) -> String {
        match self {
            Self::Local(name) => format!("local `{name}`"),
            Self::Positional(index) => format!("positional argument {index}"),
            Self::Global(name) => format!("global `{name}`"),
            Self::Closure(name) => format!("closure variable `{name}`"),
        }
    }

    /// Looks the source up and applies `f` to the bound value.
    pub(crate) fn with_value<R>(
        &self,
        scope: &LookupScope<'_>,
        f: impl FnOnce(&Value) -> R,
    ) -> Result<R, GuardError> {
        match self {
            Self::Local(name) => scope
                .snapshot
                .local(name)
                .map(f)
                .ok_or_else(|| GuardError::MissingLocal {
                    name: name.clone(),
                    suggestion: suggest_name(name, scope.snapshot.locals().names()),
                }),
            Self::Positional(index) => {
                let positional = scope.snapshot.positional();
                positional
                    .get(*index)
                    .map(f)
                    .ok_or(GuardError::MissingPositional {
                        index: *index,
                        available: positional.len(),
                    })
            }
            Self::Global(name) => scope.globals.with(name, f).ok_or_else(|| {
                let names = scope.globals.names();
                GuardError::MissingGlobal {
                    name: name.clone(),
                    suggestion: suggest_name(name, names.iter().map(String::as_str)),
                }
            }),
            Self::Closure(name) => scope
                .closure_vars
                .iter()
                .find(|(captured, _)| captured == name)
                .map(|(_, value)| f(value))
                .ok_or_else(|| GuardError::MissingClosure { name: name.clone() }),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(name) => write!(f, "L['{name}']"),
            Self::Positional(index) => write!(f, "P[{index}]"),
            Self::Global(name) => write!(f, "G['{name}']"),
            Self::Closure(name) => write!(f, "C['{name}']"),
        }
    }
}

/// Everything a sub-check may read while evaluating.
pub(crate) struct LookupScope<'s> {
    pub snapshot: &'s BindingSnapshot<'s>,
    pub globals: &'s GlobalScope,
    pub closure_vars: &'s [(String, Value)],
}

/// One assumption about the execution context.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardCheck {
    TypeMatch { source: Source, expected: TypeTag },
    ValueEquals { source: Source, expected: Value },
    Identity { source: Source, expected: ObjectRef },
    IsNone { source: Source },
    NotNone { source: Source },
    TupleLength { source: Source, expected: usize },
}

impl GuardCheck {
    pub fn source(&self) -> &Source {
        match self {
            Self::TypeMatch { source, .. }
            | Self::ValueEquals { source, .. }
            | Self::Identity { source, .. }
            | Self::IsNone { source }
            | Self::NotNone { source }
            | Self::TupleLength { source, .. } => source,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::TypeMatch { .. } => "TYPE_MATCH",
            Self::ValueEquals { .. } => "EQUALS_MATCH",
            Self::Identity { .. } => "ID_MATCH",
            Self::IsNone { .. } => "NONE_MATCH",
            Self::NotNone { .. } => "NOT_NONE_MATCH",
            Self::TupleLength { .. } => "TUPLE_LENGTH",
        }
    }

    pub(crate) fn evaluate(&self, scope: &LookupScope<'_>) -> Result<bool, GuardError> {
        self.source()
            .with_value(scope, |value| self.test(value))
            .and_then(|result| result)
    }

    fn test(&self, value: &Value) -> Result<bool, GuardError> {
        let passed = match self {
            Self::TypeMatch { expected, .. } => value.has_type(expected),
            Self::ValueEquals { expected, .. } => value == expected,
            Self::Identity { expected, .. } => value.as_object().is_some_and(|obj| obj.is(expected)),
            Self::IsNone { .. } => value.is_none(),
            Self::NotNone { .. } => !value.is_none(),
            Self::TupleLength { expected, .. } => match value.as_tuple() {
                Some(items) => items.len() == *expected,
                None => {
                    return Err(GuardError::ShapeMismatch {
                        check: self.code_part(),
                        expected: "tuple",
                        found: value.type_tag().to_string(),
                    });
                }
            },
        };
        Ok(passed)
    }

    /// Terse rendering, used as the failure reason.
    pub fn code_part(&self) -> String {
        match self {
            Self::TypeMatch { source, expected } => format!("type({source}) is {expected}"),
            Self::ValueEquals { source, expected } => format!("{source} == {expected}"),
            Self::Identity { source, expected } => format!("id({source}) == {:#x}", expected.id()),
            Self::IsNone { source } => format!("{source} is None"),
            Self::NotNone { source } => format!("{source} is not None"),
            Self::TupleLength { source, expected } => format!("len({source}) == {expected}"),
        }
    }

    /// Rendering with the guard kind and a readable name of the source.
    pub fn verbose_code_part(&self) -> String {
        let detail = match self {
            Self::Identity { expected, .. } => format!(", expected {expected}"),
            _ => String::new(),
        };
        format!(
            "{:<40} # {} on {}{detail}",
            self.code_part(),
            self.kind(),
            self.source().describe()
        )
    }
}
