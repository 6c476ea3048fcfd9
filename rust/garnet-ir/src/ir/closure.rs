//! Closure scopes: construction, the implicit block argument, and cloning
//! for inlining.
//!
//! A closure's `nesting_depth` is found by stepping to the lexical parent,
//! counting it unless it is a for-loop body, and continuing while the scope
//! just reached is itself closure-like. A closure directly inside a method
//! therefore has depth 1.

use crate::ir::block_body::{BlockBody, BlockSignature};
use crate::ir::inliner::InlinerInfo;
use crate::ir::manager::IrManager;
use crate::ir::scope::{ClosureData, ScopeId, ScopeKind, StaticScope};
use crate::ir::variable::{LocalVariable, BLOCK};
use crate::IrError;

impl IrManager {
    /// A block or `for` loop body under `parent`.
    ///
    /// Outside IR-generation-only mode the closure gets a runtime block body,
    /// and a non-`for` closure binds `static_scope` back to itself.
    pub fn new_closure(
        &mut self,
        parent: ScopeId,
        is_for_loop_body: bool,
        line: u32,
        static_scope: Option<StaticScope>,
        signature: BlockSignature,
    ) -> ScopeId {
        let (kind, prefix) = if is_for_loop_body {
            (ScopeKind::ForLoopBody, "_FOR_LOOP_")
        } else {
            (ScopeKind::Closure, "_CLOSURE_")
        };
        let file_name = self[parent].file_name().to_string();
        let id = self.push_closure(parent, kind, prefix, file_name, line, static_scope);

        if !self.options().ir_gen_only {
            let binding = signature.binding.unwrap_or(self.options().default_binding);
            let body = BlockBody::new(id, signature.arity, signature.argument_type, binding);
            let scope = &mut self[id];
            if let Some(closure) = scope.closure_mut() {
                closure.body = Some(body);
            }
            if !is_for_loop_body {
                if let Some(descriptor) = scope.static_scope.as_mut() {
                    descriptor.ir_scope = Some(id);
                }
            }
        }

        tracing::debug!(
            closure = %self[id].name(),
            parent = %self[parent].name(),
            depth = self[id].nesting_depth().unwrap_or(0),
            "created closure"
        );
        id
    }

    /// A closure-like unit for code evaluated in the context of `parent`.
    /// It has no runtime block body and its name is `prefix` plus its id.
    pub fn new_eval_closure(
        &mut self,
        parent: ScopeId,
        file_name: &str,
        line: u32,
        static_scope: Option<StaticScope>,
        prefix: &str,
    ) -> ScopeId {
        let id = self.push_closure(
            parent,
            ScopeKind::EvalUnit,
            prefix,
            file_name.to_string(),
            line,
            static_scope,
        );
        tracing::debug!(
            closure = %self[id].name(),
            depth = self[id].nesting_depth().unwrap_or(0),
            "created eval unit"
        );
        id
    }

    fn push_closure(
        &mut self,
        parent: ScopeId,
        kind: ScopeKind,
        prefix: &str,
        file_name: String,
        line: u32,
        static_scope: Option<StaticScope>,
    ) -> ScopeId {
        let closure_id = self.next_closure_id(parent);
        let name = format!("{}{}", prefix, closure_id);
        let id = self.push_scope(kind, name, file_name, line, Some(parent), static_scope);
        let start_label = self.get_new_label_with_prefix(id, &format!("{}START", prefix));
        let end_label = self.get_new_label_with_prefix(id, &format!("{}END", prefix));
        let nesting_depth = self.nesting_depth_under(parent);
        self[id].closure = Some(ClosureData {
            closure_id,
            start_label,
            end_label,
            nesting_depth,
            has_been_inlined: false,
            block_args: Vec::new(),
            body: None,
            parameter_list: Vec::new(),
        });
        id
    }

    /// Depth of a closure whose lexical parent is `parent`.
    fn nesting_depth_under(&self, parent: ScopeId) -> u32 {
        let mut depth = 0;
        let mut current = parent;
        loop {
            let scope = &self[current];
            if !scope.is_for_loop_body() {
                depth += 1;
            }
            if !scope.is_closure() {
                return depth;
            }
            current = self.closure_parent(current);
        }
    }

    fn require_closure(&self, scope: ScopeId) -> Result<&ClosureData, IrError> {
        self[scope].closure().ok_or_else(|| IrError::NotAClosure {
            scope: self[scope].name().to_string(),
        })
    }

    /// The variable holding the block passed to the nearest enclosing
    /// method, as seen from `closure`.
    ///
    /// An existing binding anywhere up the chain is reused. Otherwise it is
    /// declared in the enclosing method, or, when there is no method to
    /// receive a block, as a placeholder local of the closure itself.
    pub fn get_implicit_block_arg(&mut self, closure: ScopeId) -> Result<LocalVariable, IrError> {
        let depth = self.require_closure(closure)?.nesting_depth;
        let at_depth = |lvar: LocalVariable| {
            if lvar.depth != depth {
                lvar.clone_for_depth(depth)
            } else {
                lvar
            }
        };

        if let Some(existing) = self.find_existing_local_variable(closure, BLOCK, depth) {
            return Ok(at_depth(existing));
        }
        let outer = self.nearest_flat_scope(closure);
        if self[outer].kind() == ScopeKind::Method {
            let declared = self.get_new_local_variable(outer, BLOCK, 0);
            Ok(at_depth(declared))
        } else {
            Ok(self.get_new_local_variable(closure, BLOCK, 0))
        }
    }

    /// End `closure`'s life as an independent scope.
    pub fn mark_inlined(&mut self, closure: ScopeId) -> Result<(), IrError> {
        self.require_closure(closure)?;
        if let Some(data) = self[closure].closure_mut() {
            data.has_been_inlined = true;
        }
        tracing::debug!(closure = %self[closure].name(), "closure inlined");
        Ok(())
    }

    pub fn set_parameter_list(&mut self, closure: ScopeId, parameters: Vec<String>) -> Result<(), IrError> {
        self.require_closure(closure)?;
        if let Some(data) = self[closure].closure_mut() {
            data.parameter_list = parameters;
        }
        Ok(())
    }

    /// Clone `source` (and every closure nested in it) under `new_parent`.
    pub fn clone_closure(&mut self, source: ScopeId, new_parent: ScopeId) -> Result<ScopeId, IrError> {
        self.clone_for_cloned_instr(source, &InlinerInfo::for_new_parent(new_parent))
    }

    /// Clone `source` under the lexical parent `ii` designates.
    ///
    /// The clone gets a fresh id, name and start/end labels; kind, nesting
    /// depth, parameter list and block-body shape are copied. Its CFG is the
    /// source's, renamed through a context derived from `ii`. A start or end
    /// label the source body actually places follows the body's renaming, so
    /// it still names a block in the clone's CFG.
    pub fn clone_for_cloned_instr(&mut self, source: ScopeId, ii: &InlinerInfo) -> Result<ScopeId, IrError> {
        self.assert_live(source);
        let data = self.require_closure(source)?.clone();
        let src = &self[source];
        let cfg = src.cfg().cloned().ok_or_else(|| IrError::CfgNotBuilt {
            scope: src.name().to_string(),
        })?;
        let kind = src.kind();
        let file_name = src.file_name().to_string();
        let line = src.line();
        let static_scope = src.static_scope().cloned();
        let local_vars = src.local_variables().clone();

        let parent = ii.new_lexical_parent_for_closure();
        let closure_id = self.next_closure_id(parent);
        let name = format!("_CLOSURE_CLONE_{}", closure_id);
        let id = self.push_scope(kind, name.clone(), file_name, line, Some(parent), static_scope);
        let start_label = self.get_new_label_with_prefix(id, &format!("{}_START", name));
        let end_label = self.get_new_label_with_prefix(id, &format!("{}_END", name));
        self[id].local_vars = local_vars.reowned(id);
        self[id].closure = Some(ClosureData {
            closure_id,
            start_label,
            end_label,
            nesting_depth: data.nesting_depth,
            has_been_inlined: false,
            block_args: Vec::new(),
            body: data.body.as_ref().map(|body| body.rebind(id)),
            parameter_list: data.parameter_list.clone(),
        });

        let child = ii.derive_for_closure(source, id).prepare(self, &cfg).build();
        let cloned_cfg = cfg.clone_for_cloning_closure(id, &child, self)?;
        let block_args = data
            .block_args
            .iter()
            .map(|arg| arg.clone_for_inlining(&child, self))
            .collect::<Result<Vec<_>, _>>()?;

        let clone = &mut self[id];
        clone.instrs = cloned_cfg.instrs();
        clone.cfg = Some(cloned_cfg);
        if let Some(closure) = clone.closure_mut() {
            closure.block_args = block_args;
            if let Some(start) = child.prepared_label(&data.start_label) {
                closure.start_label = start.clone();
            }
            if let Some(end) = child.prepared_label(&data.end_label) {
                closure.end_label = end.clone();
            }
        }

        tracing::debug!(
            source = %self[source].name(),
            clone = %name,
            parent = %self[parent].name(),
            "cloned closure"
        );
        Ok(id)
    }
}
