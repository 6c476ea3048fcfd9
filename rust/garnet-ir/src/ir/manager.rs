//! The scope arena and the operations every kind of scope supports.
//!
//! All building and cloning goes through a single `&mut IrManager`, which is
//! what serializes mutation of the per-scope counters. Finished scopes can be
//! shared read-only.
//!
//! Closure construction, implicit block arguments and cloning live in
//! [`closure`](crate::ir::closure).

use crate::ir::cfg::Cfg;
use crate::ir::instr::Instr;
use crate::ir::operand::{Label, Operand};
use crate::ir::scope::{Scope, ScopeId, ScopeKind, StaticScope};
use crate::ir::variable::{LocalKind, LocalVariable, TempTag, TemporaryVariable, Variable};
use crate::{IrError, IrOptions};
use std::fmt::Write as _;
use std::ops::{Index, IndexMut};

#[derive(Debug, Default)]
pub struct IrManager {
    scopes: Vec<Scope>,
    options: IrOptions,
}

impl IrManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: IrOptions) -> Self {
        Self {
            scopes: Vec::new(),
            options,
        }
    }

    pub fn options(&self) -> &IrOptions {
        &self.options
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub(crate) fn push_scope(
        &mut self,
        kind: ScopeKind,
        name: String,
        file_name: String,
        line: u32,
        lexical_parent: Option<ScopeId>,
        static_scope: Option<StaticScope>,
    ) -> ScopeId {
        let id = ScopeId::new(self.scopes.len() as u32);
        self.scopes.push(Scope::new(
            id,
            kind,
            name,
            file_name,
            line,
            lexical_parent,
            static_scope,
        ));
        id
    }

    /// Root scope for a file.
    pub fn new_script(&mut self, file_name: &str) -> ScopeId {
        self.push_scope(
            ScopeKind::Script,
            file_name.to_string(),
            file_name.to_string(),
            0,
            None,
            None,
        )
    }

    pub fn new_method(
        &mut self,
        parent: ScopeId,
        name: &str,
        line: u32,
        static_scope: Option<StaticScope>,
    ) -> ScopeId {
        let file_name = self[parent].file_name.clone();
        self.push_scope(
            ScopeKind::Method,
            name.to_string(),
            file_name,
            line,
            Some(parent),
            static_scope,
        )
    }

    /// Lexical parent of a closure-like scope. Closures are only ever
    /// created under a parent.
    pub(crate) fn closure_parent(&self, scope: ScopeId) -> ScopeId {
        match self[scope].lexical_parent {
            Some(parent) => parent,
            None => panic!("closure {} has no lexical parent", self[scope].name),
        }
    }

    /// The nearest enclosing scope that is not closure-like (`scope` itself
    /// when it is a method or script).
    pub fn nearest_flat_scope(&self, scope: ScopeId) -> ScopeId {
        let mut current = scope;
        while self[current].is_closure() {
            current = self.closure_parent(current);
        }
        current
    }

    /// An inlined closure lives on only inside its host.
    pub(crate) fn assert_live(&self, scope: ScopeId) {
        debug_assert!(
            !self[scope].has_been_inlined(),
            "closure {} was inlined and is no longer an independent scope",
            self[scope].name
        );
    }

    /// Append `instr`. Argument-receiving instructions added to a closure are
    /// also recorded as block arguments.
    pub fn add_instr(&mut self, scope: ScopeId, instr: Instr) {
        self.assert_live(scope);
        let target = &mut self[scope];
        if let Some(closure) = target.closure_mut() {
            match &instr {
                Instr::ReceiveArg { result, .. } | Instr::ReceiveOptArg { result, .. } => {
                    closure.block_args.push(Operand::Variable(result.clone()));
                }
                Instr::ReceiveRestArg { result, .. } => {
                    closure
                        .block_args
                        .push(Operand::splat(Operand::Variable(result.clone())));
                }
                Instr::Copy { .. }
                | Instr::Label(_)
                | Instr::Jump { .. }
                | Instr::BranchFalse { .. }
                | Instr::Call { .. }
                | Instr::Return { .. }
                | Instr::ModuleGuard(_) => {}
            }
        }
        target.instrs.push(instr);
    }

    /// Fresh label in `scope`'s default naming scheme: `CL<closureId>_LBL_<n>`
    /// for closures, `LBL_<n>` otherwise.
    pub fn get_new_label(&mut self, scope: ScopeId) -> Label {
        let prefix = match self[scope].closure_id() {
            Some(closure_id) => format!("CL{}_LBL", closure_id),
            None => "LBL".to_string(),
        };
        self.get_new_label_with_prefix(scope, &prefix)
    }

    pub fn get_new_label_with_prefix(&mut self, scope: ScopeId, prefix: &str) -> Label {
        self.assert_live(scope);
        Label::new(self[scope].next_prefixed_name(prefix))
    }

    pub fn get_new_temporary_variable(&mut self, scope: ScopeId) -> Variable {
        self.assert_live(scope);
        let target = &mut self[scope];
        let tag = match target.closure_id() {
            Some(closure_id) => TempTag::Closure(closure_id),
            None => TempTag::Scope,
        };
        let index = target.next_temporary_index();
        Variable::Temporary(TemporaryVariable {
            owner: scope,
            index,
            tag,
        })
    }

    pub fn get_new_named_temporary_variable(&mut self, scope: ScopeId, name: &str) -> Variable {
        self.assert_live(scope);
        let index = self[scope].next_temporary_index();
        Variable::Temporary(TemporaryVariable {
            owner: scope,
            index,
            tag: TempTag::Named(name.to_string()),
        })
    }

    /// Search for an existing binding of `name`, `depth` scopes up.
    ///
    /// Methods and scripts only look at their own table. Closures look at
    /// their own table, then ask their parent one level shallower; for-loop
    /// bodies pass the depth through unchanged.
    pub fn find_existing_local_variable(
        &self,
        scope: ScopeId,
        name: &str,
        depth: u32,
    ) -> Option<LocalVariable> {
        let mut current = scope;
        let mut depth = depth;
        loop {
            let s = &self[current];
            if let Some(lvar) = s.local_vars.get(name) {
                return Some(lvar.clone());
            }
            if !s.is_closure() {
                return None;
            }
            depth = if s.is_for_loop_body() {
                depth
            } else {
                depth.checked_sub(1)?
            };
            current = self.closure_parent(current);
        }
    }

    /// Declare `name` `depth` scopes up from `scope`.
    pub fn get_new_local_variable(&mut self, scope: ScopeId, name: &str, depth: u32) -> LocalVariable {
        self.assert_live(scope);
        let mut current = scope;
        let mut depth = depth;
        loop {
            match self[current].kind {
                ScopeKind::ForLoopBody => current = self.closure_parent(current),
                ScopeKind::Closure | ScopeKind::EvalUnit if depth > 0 => {
                    depth -= 1;
                    current = self.closure_parent(current);
                }
                ScopeKind::Closure | ScopeKind::EvalUnit => {
                    return self.declare(current, name, LocalKind::Closure);
                }
                ScopeKind::Script | ScopeKind::Method => {
                    return self.declare(current, name, LocalKind::Plain);
                }
            }
        }
    }

    fn declare(&mut self, scope: ScopeId, name: &str, kind: LocalKind) -> LocalVariable {
        let table = &mut self[scope].local_vars;
        let lvar = LocalVariable::new(name, 0, table.next_slot(), scope, kind);
        table.insert(lvar.clone());
        lvar
    }

    /// Find or declare `name`. Closures hand back a view adjusted to the
    /// requested depth; the stored binding is never touched.
    pub fn get_local_variable(&mut self, scope: ScopeId, name: &str, depth: u32) -> LocalVariable {
        self.assert_live(scope);
        match self[scope].kind {
            ScopeKind::ForLoopBody => {
                let parent = self.closure_parent(scope);
                self.get_local_variable(parent, name, depth)
            }
            ScopeKind::Closure | ScopeKind::EvalUnit => {
                let lvar = match self.find_existing_local_variable(scope, name, depth) {
                    Some(lvar) => lvar,
                    None => self.get_new_local_variable(scope, name, depth),
                };
                if lvar.depth != depth {
                    lvar.clone_for_depth(depth)
                } else {
                    lvar
                }
            }
            ScopeKind::Script | ScopeKind::Method => match self.find_existing_local_variable(scope, name, depth) {
                Some(lvar) => lvar,
                None => self.get_new_local_variable(scope, name, depth),
            },
        }
    }

    /// Local holding flip-flop state. Only methods and scripts have any.
    ///
    /// # Panics
    ///
    /// When `scope` is closure-like.
    pub fn get_new_flip_state_variable(&mut self, scope: ScopeId) -> LocalVariable {
        if !self[scope].is_flip_scope() {
            panic!("Cannot get flip variables from closures.");
        }
        let name = self[scope].next_prefixed_name("%flip");
        self.get_new_local_variable(scope, &name, 0)
    }

    /// Next closure id handed out under `scope`'s nearest method or script,
    /// starting at 1.
    pub fn next_closure_id(&mut self, scope: ScopeId) -> u32 {
        let owner = self.nearest_flat_scope(scope);
        let target = &mut self[owner];
        target.next_closure_index += 1;
        target.next_closure_index
    }

    /// Split `scope`'s instructions into a control-flow graph and store it.
    pub fn build_cfg(&mut self, scope: ScopeId) -> Result<&Cfg, IrError> {
        self.assert_live(scope);
        let instrs = self[scope].instrs.clone();
        let name = self[scope].name.clone();
        let cfg = Cfg::build(scope, &name, &instrs, || self.get_new_label(scope))?;
        let cfg: &Cfg = self[scope].cfg.insert(cfg);
        Ok(cfg)
    }

    pub fn to_string_instrs(&self, scope: ScopeId) -> String {
        let mut buf = String::new();
        for (i, instr) in self[scope].instrs.iter().enumerate() {
            let _ = writeln!(buf, "{:>4}\t{}", i, instr);
        }
        buf
    }

    /// Name, then the CFG when built, the raw listing otherwise.
    pub fn to_string_body(&self, scope: ScopeId) -> String {
        let s = &self[scope];
        let mut buf = format!("{} = {{ \n", s.name);
        match &s.cfg {
            Some(cfg) => {
                buf.push_str("\nCFG:\n");
                buf.push_str(&cfg.to_string_graph());
                buf.push_str("\nInstructions:\n");
                buf.push_str(&cfg.to_string_instrs());
            }
            None => buf.push_str(&self.to_string_instrs(scope)),
        }
        buf.push_str("\n}\n\n");
        buf
    }
}

impl Index<ScopeId> for IrManager {
    type Output = Scope;

    fn index(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }
}

impl IndexMut<ScopeId> for IrManager {
    fn index_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }
}
