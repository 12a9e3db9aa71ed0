//! Host values as seen by guards and the compilation callback.

use std::fmt;
use std::sync::Arc;

/// Runtime type of a [`Value`], the unit type guards compare against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    None,
    Bool,
    Int,
    Float,
    Str,
    Tuple,
    Object(Arc<str>),
}

impl TypeTag {
    pub fn object(type_name: impl Into<Arc<str>>) -> Self {
        Self::Object(type_name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Self::None => "NoneType",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Tuple => "tuple",
            Self::Object(name) => name,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug)]
struct ObjectData {
    type_name: Arc<str>,
}

/// Handle to a heap object owned by the host runtime.
///
/// Clones share the same object; equality is identity.
#[derive(Debug, Clone)]
pub struct ObjectRef(Arc<ObjectData>);

impl ObjectRef {
    pub fn new(type_name: impl Into<Arc<str>>) -> Self {
        Self(Arc::new(ObjectData {
            type_name: type_name.into(),
        }))
    }

    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub fn type_name(&self) -> &str {
        &self.0.type_name
    }

    pub fn is(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.is(other)
    }
}

impl Eq for ObjectRef {}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} object at {:#x}>", self.type_name(), self.id())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Tuple(Arc<[Value]>),
    Object(ObjectRef),
}

impl Value {
    pub fn tuple(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Tuple(items.into_iter().collect())
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::None => TypeTag::None,
            Self::Bool(_) => TypeTag::Bool,
            Self::Int(_) => TypeTag::Int,
            Self::Float(_) => TypeTag::Float,
            Self::Str(_) => TypeTag::Str,
            Self::Tuple(_) => TypeTag::Tuple,
            Self::Object(obj) => TypeTag::Object(Arc::clone(&obj.0.type_name)),
        }
    }

    /// Whether the value's type is `tag`, without materialising a [`TypeTag`].
    pub fn has_type(&self, tag: &TypeTag) -> bool {
        match (self, tag) {
            (Self::None, TypeTag::None)
            | (Self::Bool(_), TypeTag::Bool)
            | (Self::Int(_), TypeTag::Int)
            | (Self::Float(_), TypeTag::Float)
            | (Self::Str(_), TypeTag::Str)
            | (Self::Tuple(_), TypeTag::Tuple) => true,
            (Self::Object(obj), TypeTag::Object(name)) => *obj.0.type_name == **name,
            _ => false,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Self::Tuple(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Tuple(items) => {
                f.write_str("(")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Self::Object(obj) => write!(f, "{obj}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value.into())
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Self::Object(value)
    }
}
