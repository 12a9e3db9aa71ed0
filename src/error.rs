use thiserror::Error;

use crate::runtime::code::OriginalCode;

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean `{name}`?)"),
        None => String::new(),
    }
}

/// Internal fault raised while evaluating a single guard sub-check.
///
/// A fault always makes the guard fail; it is never surfaced from
/// `RecompilationController::resolve`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("local `{name}` is not bound{}", did_you_mean(.suggestion))]
    MissingLocal {
        name: String,
        suggestion: Option<String>,
    },
    #[error("global `{name}` is not bound{}", did_you_mean(.suggestion))]
    MissingGlobal {
        name: String,
        suggestion: Option<String>,
    },
    #[error("positional argument {index} is missing (only {available} passed)")]
    MissingPositional { index: usize, available: usize },
    #[error("closure variable `{name}` was not captured")]
    MissingClosure { name: String },
    #[error("`{check}` expects a {expected}, found {found}")]
    ShapeMismatch {
        check: String,
        expected: &'static str,
        found: String,
    },
    #[error("{message}")]
    Custom { message: String },
}

impl GuardError {
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom {
            message: message.into(),
        }
    }
}

/// Failure of the compilation callback. Propagated to the caller of
/// `resolve` unchanged; the call-site cache is left as it was.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("compilation of {code} failed: {message}")]
    Failed { code: OriginalCode, message: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CompileError {
    pub fn failed(code: &OriginalCode, message: impl Into<String>) -> Self {
        Self::Failed {
            code: code.clone(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_entries_per_site must be at least 1")]
    ZeroBound,
    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[cfg(feature = "toml-config")]
    #[error("failed to parse cache configuration: {0}")]
    Toml(#[from] toml::de::Error),
}
