//! Code object identities: the original function body owned by the host and
//! the specialized variants produced by the compiler.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an [`OriginalCode`]; the call-site cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodeId(u64);

impl CodeId {
    fn next() -> Self {
        Self(NEXT_CODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
struct CodeData {
    id: CodeId,
    name: String,
    filename: String,
    first_line: u32,
}

/// A static function body of the host runtime.
///
/// The handle is cheap to clone; two handles are equal when they refer to the
/// same body, regardless of name.
#[derive(Debug, Clone)]
pub struct OriginalCode(Arc<CodeData>);

impl OriginalCode {
    pub fn new(name: impl Into<String>, filename: impl Into<String>, first_line: u32) -> Self {
        Self(Arc::new(CodeData {
            id: CodeId::next(),
            name: name.into(),
            filename: filename.into(),
            first_line,
        }))
    }

    pub fn id(&self) -> CodeId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn filename(&self) -> &str {
        &self.0.filename
    }

    pub fn first_line(&self) -> u32 {
        self.0.first_line
    }
}

impl PartialEq for OriginalCode {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for OriginalCode {}

impl Hash for OriginalCode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Display for OriginalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' ({}:{})",
            self.name(),
            self.filename(),
            self.first_line()
        )
    }
}

#[derive(Debug)]
struct SpecializedData {
    name: String,
    payload: Vec<u8>,
}

/// A compiled specialization, opaque to the cache.
///
/// `payload` holds whatever the compiler emitted (machine code, bytecode);
/// equality is identity of the compiled object.
#[derive(Debug, Clone)]
pub struct SpecializedCode(Arc<SpecializedData>);

impl SpecializedCode {
    pub fn new(name: impl Into<String>, payload: Vec<u8>) -> Self {
        Self(Arc::new(SpecializedData {
            name: name.into(),
            payload,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn payload(&self) -> &[u8] {
        &self.0.payload
    }

    pub fn size(&self) -> usize {
        self.0.payload.len()
    }

    pub fn same_code(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for SpecializedCode {
    fn eq(&self, other: &Self) -> bool {
        self.same_code(other)
    }
}

impl Eq for SpecializedCode {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn original_code_identity_ignores_name() {
        let a = OriginalCode::new("forward", "model.py", 10);
        let b = OriginalCode::new("forward", "model.py", 10);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert!(a.id() < b.id());
    }

    #[test]
    fn specialized_code_equality_is_identity() {
        let a = SpecializedCode::new("forward_0", vec![0x90]);
        let b = SpecializedCode::new("forward_0", vec![0x90]);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.size(), 1);
    }

    #[test]
    fn display_names_location() {
        let code = OriginalCode::new("step", "train.py", 42);
        assert_eq!(code.to_string(), "'step' (train.py:42)");
    }
}
