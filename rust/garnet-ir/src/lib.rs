//! Garnet IR
//!
//! The scope and instruction-graph core of the Garnet compiler: an arena of
//! scopes (scripts, methods, closures, eval units), depth-aware variable
//! resolution across nested closures, control-flow graphs, clone-for-inlining,
//! and the module-version guard used by speculative optimizations.

pub mod ir;
pub mod util;

pub use ir::{
    BlockSignature, Cfg, Instr, IrManager, Label, ModuleVersionGuardInstr, Operand, ParameterBinding,
    ScopeId, ScopeKind, Variable,
};

use thiserror::Error;

// ── Options ─────────────────────────────────────────────────────────

/// Options controlling how scopes are built.
#[derive(Debug, Clone, Default)]
pub struct IrOptions {
    /// Only IR is being generated; closures get no runtime block body and
    /// static scopes are not bound to their IR scope. Default: `false`.
    pub ir_gen_only: bool,
    /// Parameter binding for closures built without an explicit one.
    /// Default: `Modern`.
    pub default_binding: ParameterBinding,
}

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum IrError {
    #[error("scope {scope} has no control-flow graph")]
    CfgNotBuilt { scope: String },
    #[error("unknown label {label} in scope {scope}")]
    UnknownLabel { label: String, scope: String },
    #[error("scope {scope} is not a closure")]
    NotAClosure { scope: String },
    #[error("variable {name} is not bound in this frame")]
    UnboundVariable { name: String },
    #[error("operand {operand} has no runtime value")]
    NotRetrievable { operand: String },
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
