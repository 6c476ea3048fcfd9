//! Scope serialization to JSON for debugging and golden tests.

use crate::ir::cfg::{BlockId, CfgEdge};
use crate::ir::manager::IrManager;
use crate::ir::operand::Label;
use crate::ir::scope::{ScopeId, ScopeKind};
use crate::ir::variable::LocalVariable;
use crate::IrError;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BlockSummary {
    pub id: BlockId,
    pub label: Label,
    pub instrs: Vec<String>,
    pub successors: Vec<CfgEdge>,
}

/// Everything about a scope worth diffing.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeSummary {
    pub id: ScopeId,
    pub name: String,
    pub kind: ScopeKind,
    pub lexical_parent: Option<ScopeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closure_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nesting_depth: Option<u32>,
    pub locals: Vec<LocalVariable>,
    pub instrs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<BlockSummary>>,
}

impl ScopeSummary {
    pub fn of(manager: &IrManager, id: ScopeId) -> Self {
        let scope = &manager[id];
        let blocks = scope.cfg().map(|cfg| {
            cfg.blocks()
                .iter()
                .map(|block| BlockSummary {
                    id: block.id,
                    label: block.label.clone(),
                    instrs: block.instrs.iter().map(|i| i.to_string()).collect(),
                    successors: cfg.outgoing_edges(block.id).iter().cloned().collect(),
                })
                .collect()
        });
        ScopeSummary {
            id,
            name: scope.name().to_string(),
            kind: scope.kind(),
            lexical_parent: scope.lexical_parent(),
            closure_id: scope.closure_id(),
            nesting_depth: scope.nesting_depth(),
            locals: scope.local_variables().sorted().into_iter().cloned().collect(),
            instrs: scope.instrs().iter().map(|i| i.to_string()).collect(),
            blocks,
        }
    }
}

/// Emit a scope as pretty-printed JSON.
pub fn emit_scope_json(manager: &IrManager, id: ScopeId) -> Result<String, IrError> {
    Ok(serde_json::to_string_pretty(&ScopeSummary::of(manager, id))?)
}
