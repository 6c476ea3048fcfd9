//! Scope values stored in the [`IrManager`](crate::ir::IrManager) arena.
//!
//! There is one `Scope` type for every kind of scope. Kind-specific behavior
//! (for-loop transparency, closure ids, label prefixes) is decided by matching
//! on [`ScopeKind`]; closure-only state lives in [`ClosureData`].

use crate::ir::block_body::BlockBody;
use crate::ir::cfg::Cfg;
use crate::ir::instr::Instr;
use crate::ir::operand::{Label, Operand};
use crate::ir::variable::LocalVariable;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Stable index of a scope in its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeId(u32);

impl ScopeId {
    pub const fn new(index: u32) -> Self {
        ScopeId(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScopeKind {
    /// Top-level file body.
    Script,
    Method,
    /// An ordinary block.
    Closure,
    /// Body of a `for` loop: a closure that declares no variables of its own.
    ForLoopBody,
    /// Code evaluated in the context of another scope.
    EvalUnit,
}

impl ScopeKind {
    pub fn is_closure(self) -> bool {
        matches!(self, ScopeKind::Closure | ScopeKind::ForLoopBody | ScopeKind::EvalUnit)
    }

    pub fn scope_name(self) -> &'static str {
        match self {
            ScopeKind::Script => "Script",
            ScopeKind::Method => "Method",
            ScopeKind::Closure | ScopeKind::ForLoopBody => "Closure",
            ScopeKind::EvalUnit => "EvalScript",
        }
    }
}

/// Parser-side scope descriptor handed over when a scope is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StaticScope {
    pub variable_names: Vec<String>,
    /// The IR scope built from this descriptor, once bound.
    pub ir_scope: Option<ScopeId>,
}

impl StaticScope {
    pub fn new(variable_names: &[&str]) -> Self {
        Self {
            variable_names: variable_names.iter().map(|s| s.to_string()).collect(),
            ir_scope: None,
        }
    }
}

/// Name → binding for the locals a scope declares itself.
#[derive(Debug, Clone, Default)]
pub struct LocalVariableTable {
    vars: HashMap<String, LocalVariable>,
    next_slot: u32,
}

impl LocalVariableTable {
    pub fn get(&self, name: &str) -> Option<&LocalVariable> {
        self.vars.get(name)
    }

    pub fn next_slot(&self) -> u32 {
        self.next_slot
    }

    pub fn insert(&mut self, lvar: LocalVariable) {
        self.vars.insert(lvar.name.clone(), lvar);
        self.next_slot += 1;
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Bindings in slot order.
    pub fn sorted(&self) -> Vec<&LocalVariable> {
        let mut vars: Vec<&LocalVariable> = self.vars.values().collect();
        vars.sort_by_key(|v| v.slot);
        vars
    }

    /// Same names and slots, declared by `owner`.
    pub(crate) fn reowned(&self, owner: ScopeId) -> LocalVariableTable {
        let vars = self
            .vars
            .iter()
            .map(|(name, lvar)| {
                let mut moved = lvar.clone();
                moved.owner = owner;
                (name.clone(), moved)
            })
            .collect();
        LocalVariableTable {
            vars,
            next_slot: self.next_slot,
        }
    }
}

/// State only closure-like scopes carry.
#[derive(Debug, Clone)]
pub struct ClosureData {
    /// Unique among closures of the nearest enclosing method.
    pub closure_id: u32,
    /// Where `redo` restarts.
    pub start_label: Label,
    /// Where `retry` lands.
    pub end_label: Label,
    /// Enclosing non-for-loop scopes up to and including the first
    /// non-closure one.
    pub nesting_depth: u32,
    pub has_been_inlined: bool,
    pub block_args: Vec<Operand>,
    pub body: Option<BlockBody>,
    pub parameter_list: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub(crate) id: ScopeId,
    pub(crate) kind: ScopeKind,
    pub(crate) name: String,
    pub(crate) file_name: String,
    pub(crate) line: u32,
    pub(crate) lexical_parent: Option<ScopeId>,
    pub(crate) static_scope: Option<StaticScope>,
    pub(crate) instrs: Vec<Instr>,
    pub(crate) local_vars: LocalVariableTable,
    pub(crate) temporary_variable_index: u32,
    pub(crate) next_closure_index: u32,
    pub(crate) prefix_counters: HashMap<String, u32>,
    pub(crate) cfg: Option<Cfg>,
    pub(crate) closure: Option<ClosureData>,
}

impl Scope {
    pub(crate) fn new(
        id: ScopeId,
        kind: ScopeKind,
        name: String,
        file_name: String,
        line: u32,
        lexical_parent: Option<ScopeId>,
        static_scope: Option<StaticScope>,
    ) -> Self {
        Self {
            id,
            kind,
            name,
            file_name,
            line,
            lexical_parent,
            static_scope,
            instrs: Vec::new(),
            local_vars: LocalVariableTable::default(),
            temporary_variable_index: 0,
            next_closure_index: 0,
            prefix_counters: HashMap::new(),
            cfg: None,
            closure: None,
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn lexical_parent(&self) -> Option<ScopeId> {
        self.lexical_parent
    }

    pub fn static_scope(&self) -> Option<&StaticScope> {
        self.static_scope.as_ref()
    }

    pub fn instrs(&self) -> &[Instr] {
        &self.instrs
    }

    pub fn local_variables(&self) -> &LocalVariableTable {
        &self.local_vars
    }

    pub fn cfg(&self) -> Option<&Cfg> {
        self.cfg.as_ref()
    }

    pub fn closure(&self) -> Option<&ClosureData> {
        self.closure.as_ref()
    }

    pub fn is_closure(&self) -> bool {
        self.kind.is_closure()
    }

    pub fn is_for_loop_body(&self) -> bool {
        self.kind == ScopeKind::ForLoopBody
    }

    /// Flat scopes own their locals outright.
    pub fn is_top_local_variable_scope(&self) -> bool {
        !self.is_closure()
    }

    /// Only flat scopes may hold flip-flop state.
    pub fn is_flip_scope(&self) -> bool {
        !self.is_closure()
    }

    pub fn scope_name(&self) -> &'static str {
        self.kind.scope_name()
    }

    pub fn closure_id(&self) -> Option<u32> {
        self.closure.as_ref().map(|c| c.closure_id)
    }

    pub fn nesting_depth(&self) -> Option<u32> {
        self.closure.as_ref().map(|c| c.nesting_depth)
    }

    pub fn start_label(&self) -> Option<&Label> {
        self.closure.as_ref().map(|c| &c.start_label)
    }

    pub fn end_label(&self) -> Option<&Label> {
        self.closure.as_ref().map(|c| &c.end_label)
    }

    pub fn has_been_inlined(&self) -> bool {
        self.closure.as_ref().is_some_and(|c| c.has_been_inlined)
    }

    /// Parameters received so far, splats marking rest parameters.
    pub fn block_args(&self) -> &[Operand] {
        self.closure
            .as_ref()
            .map(|c| c.block_args.as_slice())
            .unwrap_or(&[])
    }

    pub fn block_body(&self) -> Option<&BlockBody> {
        self.closure.as_ref().and_then(|c| c.body.as_ref())
    }

    pub fn parameter_list(&self) -> &[String] {
        self.closure
            .as_ref()
            .map(|c| c.parameter_list.as_slice())
            .unwrap_or(&[])
    }

    /// `<prefix>_<n>` with a counter per prefix.
    pub(crate) fn next_prefixed_name(&mut self, prefix: &str) -> String {
        let counter = self.prefix_counters.entry(prefix.to_string()).or_insert(0);
        let name = format!("{}_{}", prefix, counter);
        *counter += 1;
        name
    }

    pub(crate) fn next_temporary_index(&mut self) -> u32 {
        let index = self.temporary_variable_index;
        self.temporary_variable_index += 1;
        index
    }

    pub(crate) fn closure_mut(&mut self) -> Option<&mut ClosureData> {
        self.closure.as_mut()
    }
}
