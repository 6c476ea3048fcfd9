//! The IR: scopes, variables, operands, instructions and their graphs.

pub mod block_body;
pub mod cfg;
pub mod closure;
pub mod emit;
pub mod frame;
pub mod guard;
pub mod inliner;
pub mod instr;
pub mod manager;
pub mod operand;
pub mod scope;
pub mod variable;

pub use block_body::{ArgumentType, Arity, BlockBody, BlockSignature, ParameterBinding};
pub use cfg::{BasicBlock, BlockId, Cfg, CfgEdge, EdgeSet, EdgeType};
pub use emit::{emit_scope_json, ScopeSummary};
pub use frame::{ExecutionContext, Frame};
pub use guard::ModuleVersionGuardInstr;
pub use inliner::{InlinerInfo, InlinerInfoBuilder};
pub use instr::{Instr, Operation};
pub use manager::IrManager;
pub use operand::{Label, Operand};
pub use scope::{ClosureData, LocalVariableTable, Scope, ScopeId, ScopeKind, StaticScope};
pub use variable::{LocalKind, LocalVariable, TempTag, TemporaryVariable, Variable};
