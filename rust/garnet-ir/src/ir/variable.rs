//! Variables: depth-tagged locals and scope-private temporaries.

use crate::ir::scope::ScopeId;
use serde::Serialize;
use std::fmt;

/// Name of the variable holding the block passed to the enclosing method.
pub const BLOCK: &str = "%block";

/// Whether a local lives in a flat scope or was declared inside a closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LocalKind {
    /// Declared in a method or script.
    Plain,
    /// Declared in (and captured through) a closure.
    Closure,
}

/// A named local. `depth` is the number of lexical scopes between the scope
/// using this view and the scope that declared it; the stored binding in the
/// declaring scope always has depth 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LocalVariable {
    pub name: String,
    pub depth: u32,
    pub slot: u32,
    pub owner: ScopeId,
    pub kind: LocalKind,
}

impl LocalVariable {
    pub fn new(name: &str, depth: u32, slot: u32, owner: ScopeId, kind: LocalKind) -> Self {
        Self {
            name: name.to_string(),
            depth,
            slot,
            owner,
            kind,
        }
    }

    /// A view of the same binding as seen from `depth` scopes away.
    pub fn clone_for_depth(&self, depth: u32) -> Self {
        Self {
            depth,
            ..self.clone()
        }
    }

    /// Same declaration, possibly seen at different depths.
    pub fn same_binding(&self, other: &LocalVariable) -> bool {
        self.owner == other.owner && self.slot == other.slot && self.name == other.name
    }
}

impl fmt::Display for LocalVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}:{})", self.name, self.depth, self.slot)
    }
}

/// How a temporary is named when printed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TempTag {
    /// Method or script temporary: `%v_N`.
    Scope,
    /// Closure temporary: `%cl_<closureId>_N`.
    Closure(u32),
    /// Caller-named temporary: `%<name>_N`.
    Named(String),
}

/// A compiler temporary. Never found by lookup; every request mints a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TemporaryVariable {
    pub owner: ScopeId,
    pub index: u32,
    pub tag: TempTag,
}

impl fmt::Display for TemporaryVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            TempTag::Scope => write!(f, "%v_{}", self.index),
            TempTag::Closure(closure_id) => write!(f, "%cl_{}_{}", closure_id, self.index),
            TempTag::Named(name) => write!(f, "%{}_{}", name, self.index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Variable {
    Local(LocalVariable),
    Temporary(TemporaryVariable),
}

impl From<LocalVariable> for Variable {
    fn from(lvar: LocalVariable) -> Self {
        Variable::Local(lvar)
    }
}

impl From<TemporaryVariable> for Variable {
    fn from(tmp: TemporaryVariable) -> Self {
        Variable::Temporary(tmp)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Local(lvar) => lvar.fmt(f),
            Variable::Temporary(tmp) => tmp.fmt(f),
        }
    }
}
