pub mod bindings;
pub mod cache;
pub mod callback;
pub mod code;
pub mod controller;
pub mod diagnostics;
pub mod guard;
pub mod hook;
pub mod metrics;
pub mod value;

pub use controller::{GUARDS_TARGET, RecompilationController, Resolution};
