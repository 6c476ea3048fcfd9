//! Renaming context threaded through clone-for-inlining.
//!
//! An [`InlinerInfo`] is an immutable snapshot: once built it is only read.
//! Everything a clone will need (fresh labels, fresh temporaries) is minted up
//! front by an [`InlinerInfoBuilder`]. Recursing into a nested closure derives
//! a child builder that inherits the scope renames of its parent but none of
//! its label or temporary renames, since those never cross scope boundaries.

use crate::ir::cfg::Cfg;
use crate::ir::manager::IrManager;
use crate::ir::operand::{Label, Operand};
use crate::ir::scope::ScopeId;
use crate::ir::variable::{TempTag, Variable};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct InlinerInfo {
    /// Scope that receives renamed labels and temporaries.
    host: ScopeId,
    /// Lexical parent for closures cloned under this context.
    new_lexical_parent: ScopeId,
    scope_renames: HashMap<ScopeId, ScopeId>,
    variable_renames: HashMap<Variable, Variable>,
    label_renames: HashMap<Label, Label>,
}

impl InlinerInfo {
    /// Top-level context: clones land under `parent`.
    pub fn for_new_parent(parent: ScopeId) -> Self {
        Self {
            host: parent,
            new_lexical_parent: parent,
            scope_renames: HashMap::new(),
            variable_renames: HashMap::new(),
            label_renames: HashMap::new(),
        }
    }

    pub fn new_lexical_parent_for_closure(&self) -> ScopeId {
        self.new_lexical_parent
    }

    pub fn renamed_scope(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scope_renames.get(&scope).copied()
    }

    /// The pre-minted copy of `label`, if this context prepared one.
    pub fn prepared_label(&self, label: &Label) -> Option<&Label> {
        self.label_renames.get(label)
    }

    pub fn renamed_label(&self, label: &Label) -> Label {
        debug_assert!(
            self.label_renames.contains_key(label),
            "label {} was not prepared for cloning",
            label
        );
        self.prepared_label(label).cloned().unwrap_or_else(|| label.clone())
    }

    /// Temporaries map to their pre-minted copies; locals declared in a
    /// scope being cloned move to the clone; anything declared outside the
    /// clone keeps its identity.
    pub fn renamed_variable(&self, var: &Variable) -> Variable {
        if let Some(renamed) = self.variable_renames.get(var) {
            return renamed.clone();
        }
        match var {
            Variable::Local(lvar) => match self.renamed_scope(lvar.owner) {
                Some(owner) => {
                    let mut moved = lvar.clone();
                    moved.owner = owner;
                    Variable::Local(moved)
                }
                None => var.clone(),
            },
            Variable::Temporary(tmp) => {
                debug_assert!(
                    self.variable_renames.contains_key(var),
                    "temporary {} was not prepared for cloning",
                    tmp
                );
                var.clone()
            }
        }
    }

    /// Start a child context for cloning `source` into `clone`.
    pub fn derive_for_closure(&self, source: ScopeId, clone: ScopeId) -> InlinerInfoBuilder {
        let mut scope_renames = self.scope_renames.clone();
        scope_renames.insert(source, clone);
        InlinerInfoBuilder {
            info: InlinerInfo {
                host: clone,
                new_lexical_parent: clone,
                scope_renames,
                variable_renames: HashMap::new(),
                label_renames: HashMap::new(),
            },
        }
    }
}

#[derive(Debug)]
pub struct InlinerInfoBuilder {
    info: InlinerInfo,
}

impl InlinerInfoBuilder {
    pub fn rename_label(mut self, from: Label, to: Label) -> Self {
        self.info.label_renames.insert(from, to);
        self
    }

    pub fn rename_variable(mut self, from: Variable, to: Variable) -> Self {
        self.info.variable_renames.insert(from, to);
        self
    }

    /// Mint a fresh label in the host for every label `cfg` uses, and a fresh
    /// temporary for every temporary it reads or writes.
    pub fn prepare(mut self, manager: &mut IrManager, cfg: &Cfg) -> Self {
        let host = self.info.host;
        for block in cfg.blocks() {
            self.prepare_label(manager, &block.label);
            for instr in &block.instrs {
                for label in instr.labels() {
                    self.prepare_label(manager, label);
                }
                if let Some(result) = instr.result() {
                    self.prepare_variable(manager, result);
                }
                for operand in instr.operands() {
                    operand.visit(&mut |op| match op {
                        Operand::Label(label) => self.prepare_label(manager, label),
                        Operand::Variable(var) => self.prepare_variable(manager, var),
                        _ => {}
                    });
                }
            }
        }
        tracing::trace!(
            host = %host,
            labels = self.info.label_renames.len(),
            temporaries = self.info.variable_renames.len(),
            "inliner context prepared"
        );
        self
    }

    fn prepare_label(&mut self, manager: &mut IrManager, label: &Label) {
        if !self.info.label_renames.contains_key(label) {
            let fresh = manager.get_new_label(self.info.host);
            self.info.label_renames.insert(label.clone(), fresh);
        }
    }

    fn prepare_variable(&mut self, manager: &mut IrManager, var: &Variable) {
        let Variable::Temporary(tmp) = var else {
            return;
        };
        if self.info.variable_renames.contains_key(var) {
            return;
        }
        let fresh = match &tmp.tag {
            TempTag::Named(name) => manager.get_new_named_temporary_variable(self.info.host, name),
            TempTag::Scope | TempTag::Closure(_) => manager.get_new_temporary_variable(self.info.host),
        };
        self.info.variable_renames.insert(var.clone(), fresh);
    }

    pub fn build(self) -> InlinerInfo {
        self.info
    }
}
