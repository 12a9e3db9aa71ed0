//! Shared helpers for the guardcache workspace: logging setup and the
//! name suggester used when a guard references a binding that is absent.

pub mod logger;
pub mod suggest;

pub use logger::{LOG_ENV, init_logging};
pub use suggest::suggest_name;
