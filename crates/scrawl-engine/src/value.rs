//! Interpreter-native values.
//!
//! Immediate values (nil, booleans, numbers, strings, keywords, tuples) are
//! plain Rust data; arrays, tables, and buffers live on the [`Heap`] and are
//! referenced by [`ObjRef`]. Functions are opaque references into the engine's
//! native registry.
//!
//! [`Heap`]: crate::heap::Heap

use std::rc::Rc;

use crate::heap::ObjRef;

/// Opaque reference to a registered native function.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub(crate) u32);

/// An interpreter-native value crossing the host/runtime boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Keyword(Rc<str>),
    /// Immutable fixed-arity sequence.
    Tuple(Rc<[Value]>),
    /// Mutable heap-resident sequence.
    Array(ObjRef),
    /// Mutable heap-resident record.
    Table(ObjRef),
    /// Heap-resident byte buffer.
    Buffer(ObjRef),
    Function(FuncId),
}

impl Value {
    pub fn string(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn keyword(s: &str) -> Self {
        Value::Keyword(Rc::from(s))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(items.into())
    }

    /// The value's type name, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Keyword(_) => "keyword",
            Value::Tuple(_) => "tuple",
            Value::Array(_) => "array",
            Value::Table(_) => "table",
            Value::Buffer(_) => "buffer",
            Value::Function(_) => "function",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<ObjRef> {
        match self {
            Value::Table(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<FuncId> {
        match self {
            Value::Function(f) => Some(*f),
            _ => None,
        }
    }
}

/// Key of a heap table entry.
///
/// Restricting keys to interned strings and keywords keeps table ordering
/// deterministic, which in turn keeps serialized images stable for a given
/// program state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum TableKey {
    Str(Rc<str>),
    Keyword(Rc<str>),
}

impl TableKey {
    pub fn str(s: &str) -> Self {
        TableKey::Str(Rc::from(s))
    }

    pub fn keyword(s: &str) -> Self {
        TableKey::Keyword(Rc::from(s))
    }
}
