//! Runtime values.

use crate::module::RtModule;
use std::fmt;
use std::sync::Arc;

/// A heap object. Its metaclass decides which methods it responds to.
#[derive(Debug)]
pub struct RtObject {
    metaclass: Arc<RtModule>,
}

impl RtObject {
    pub fn new(metaclass: Arc<RtModule>) -> Arc<Self> {
        Arc::new(Self { metaclass })
    }

    pub fn metaclass(&self) -> &Arc<RtModule> {
        &self.metaclass
    }
}

/// A runtime value: an immediate or a reference to a heap object.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Fixnum(i64),
    Str(Arc<str>),
    Symbol(Arc<str>),
    Object(Arc<RtObject>),
}

impl Value {
    /// The metaclass of a heap object. Immediates carry none.
    pub fn metaclass(&self) -> Option<&Arc<RtModule>> {
        match self {
            Value::Object(obj) => Some(obj.metaclass()),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Fixnum(a), Value::Fixnum(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Fixnum(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::Symbol(s) => write!(f, ":{}", s),
            Value::Object(obj) => write!(f, "#<{}>", obj.metaclass.name()),
        }
    }
}
