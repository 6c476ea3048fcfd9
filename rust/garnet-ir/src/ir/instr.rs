//! Instructions. A closed set: passes match on [`Instr`] exhaustively.

use crate::ir::guard::ModuleVersionGuardInstr;
use crate::ir::inliner::InlinerInfo;
use crate::ir::manager::IrManager;
use crate::ir::operand::{Label, Operand};
use crate::ir::variable::Variable;
use crate::IrError;
use std::collections::HashMap;
use std::fmt;
use strum::{Display, EnumCount, EnumIter};

/// Opcode tag of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumCount)]
pub enum Operation {
    #[strum(serialize = "copy")]
    Copy,
    #[strum(serialize = "recv_arg")]
    ReceiveArg,
    #[strum(serialize = "recv_opt_arg")]
    ReceiveOptArg,
    #[strum(serialize = "recv_rest_arg")]
    ReceiveRestArg,
    #[strum(serialize = "label")]
    Label,
    #[strum(serialize = "jump")]
    Jump,
    #[strum(serialize = "b_false")]
    BranchFalse,
    #[strum(serialize = "call")]
    Call,
    #[strum(serialize = "return")]
    Return,
    #[strum(serialize = "module_guard")]
    ModuleGuard,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    Copy {
        result: Variable,
        source: Operand,
    },
    /// Bind the `index`th required block/method argument.
    ReceiveArg {
        result: Variable,
        index: u32,
    },
    /// Bind an optional argument, or `default` when it was not passed.
    ReceiveOptArg {
        result: Variable,
        index: u32,
        default: Operand,
    },
    /// Bind all arguments from `index` on as an array.
    ReceiveRestArg {
        result: Variable,
        index: u32,
    },
    Label(Label),
    Jump {
        target: Label,
    },
    BranchFalse {
        condition: Operand,
        target: Label,
    },
    Call {
        result: Option<Variable>,
        receiver: Operand,
        method: String,
        args: Vec<Operand>,
        closure: Option<Operand>,
    },
    Return {
        value: Operand,
    },
    ModuleGuard(ModuleVersionGuardInstr),
}

impl Instr {
    pub fn operation(&self) -> Operation {
        match self {
            Instr::Copy { .. } => Operation::Copy,
            Instr::ReceiveArg { .. } => Operation::ReceiveArg,
            Instr::ReceiveOptArg { .. } => Operation::ReceiveOptArg,
            Instr::ReceiveRestArg { .. } => Operation::ReceiveRestArg,
            Instr::Label(_) => Operation::Label,
            Instr::Jump { .. } => Operation::Jump,
            Instr::BranchFalse { .. } => Operation::BranchFalse,
            Instr::Call { .. } => Operation::Call,
            Instr::Return { .. } => Operation::Return,
            Instr::ModuleGuard(_) => Operation::ModuleGuard,
        }
    }

    pub fn result(&self) -> Option<&Variable> {
        match self {
            Instr::Copy { result, .. }
            | Instr::ReceiveArg { result, .. }
            | Instr::ReceiveOptArg { result, .. }
            | Instr::ReceiveRestArg { result, .. } => Some(result),
            Instr::Call { result, .. } => result.as_ref(),
            _ => None,
        }
    }

    /// Inputs, in evaluation order. Results and jump targets are not inputs.
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Instr::Copy { source, .. } => vec![source],
            Instr::ReceiveOptArg { default, .. } => vec![default],
            Instr::BranchFalse { condition, .. } => vec![condition],
            Instr::Call {
                receiver,
                args,
                closure,
                ..
            } => std::iter::once(receiver)
                .chain(args.iter())
                .chain(closure.iter())
                .collect(),
            Instr::Return { value } => vec![value],
            Instr::ModuleGuard(guard) => guard.operands(),
            Instr::ReceiveArg { .. }
            | Instr::ReceiveRestArg { .. }
            | Instr::Label(_)
            | Instr::Jump { .. } => Vec::new(),
        }
    }

    /// Every label this instruction names: its own label or its jump targets.
    pub fn labels(&self) -> Vec<&Label> {
        match self {
            Instr::Label(label) => vec![label],
            Instr::Jump { target } | Instr::BranchFalse { target, .. } => vec![target],
            Instr::ModuleGuard(guard) => vec![guard.failure_path_label()],
            _ => Vec::new(),
        }
    }

    /// Where control goes when this instruction branches, if it can.
    pub fn jump_target(&self) -> Option<&Label> {
        match self {
            Instr::Jump { target } | Instr::BranchFalse { target, .. } => Some(target),
            Instr::ModuleGuard(guard) => Some(guard.failure_path_label()),
            _ => None,
        }
    }

    /// Ends a basic block.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instr::Jump { .. } | Instr::BranchFalse { .. } | Instr::Return { .. } | Instr::ModuleGuard(_)
        )
    }

    pub fn simplify_operands(&mut self, value_map: &HashMap<Operand, Operand>, force: bool) {
        let simplify = |op: &mut Operand| *op = op.simplified(value_map, force);
        match self {
            Instr::Copy { source, .. } => simplify(source),
            Instr::ReceiveOptArg { default, .. } => simplify(default),
            Instr::BranchFalse { condition, .. } => simplify(condition),
            Instr::Call {
                receiver,
                args,
                closure,
                ..
            } => {
                simplify(receiver);
                args.iter_mut().for_each(simplify);
                closure.iter_mut().for_each(simplify);
            }
            Instr::Return { value } => simplify(value),
            Instr::ModuleGuard(guard) => guard.simplify_operands(value_map, force),
            Instr::ReceiveArg { .. }
            | Instr::ReceiveRestArg { .. }
            | Instr::Label(_)
            | Instr::Jump { .. } => {}
        }
    }

    /// A copy valid in the scope `ii` clones into, with every label and
    /// variable renamed and nested closures cloned.
    pub fn clone_for_inlined_scope(
        &self,
        ii: &InlinerInfo,
        manager: &mut IrManager,
    ) -> Result<Instr, IrError> {
        Ok(match self {
            Instr::Copy { result, source } => Instr::Copy {
                result: ii.renamed_variable(result),
                source: source.clone_for_inlining(ii, manager)?,
            },
            Instr::ReceiveArg { result, index } => Instr::ReceiveArg {
                result: ii.renamed_variable(result),
                index: *index,
            },
            Instr::ReceiveOptArg {
                result,
                index,
                default,
            } => Instr::ReceiveOptArg {
                result: ii.renamed_variable(result),
                index: *index,
                default: default.clone_for_inlining(ii, manager)?,
            },
            Instr::ReceiveRestArg { result, index } => Instr::ReceiveRestArg {
                result: ii.renamed_variable(result),
                index: *index,
            },
            Instr::Label(label) => Instr::Label(ii.renamed_label(label)),
            Instr::Jump { target } => Instr::Jump {
                target: ii.renamed_label(target),
            },
            Instr::BranchFalse { condition, target } => Instr::BranchFalse {
                condition: condition.clone_for_inlining(ii, manager)?,
                target: ii.renamed_label(target),
            },
            Instr::Call {
                result,
                receiver,
                method,
                args,
                closure,
            } => Instr::Call {
                result: result.as_ref().map(|r| ii.renamed_variable(r)),
                receiver: receiver.clone_for_inlining(ii, manager)?,
                method: method.clone(),
                args: args
                    .iter()
                    .map(|a| a.clone_for_inlining(ii, manager))
                    .collect::<Result<_, _>>()?,
                closure: closure
                    .as_ref()
                    .map(|c| c.clone_for_inlining(ii, manager))
                    .transpose()?,
            },
            Instr::Return { value } => Instr::Return {
                value: value.clone_for_inlining(ii, manager)?,
            },
            Instr::ModuleGuard(guard) => {
                Instr::ModuleGuard(guard.clone_for_inlined_scope(ii, manager)?)
            }
        })
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.operation();
        match self {
            Instr::Copy { result, source } => write!(f, "{} = {}({})", result, op, source),
            Instr::ReceiveArg { result, index } | Instr::ReceiveRestArg { result, index } => {
                write!(f, "{} = {}({})", result, op, index)
            }
            Instr::ReceiveOptArg {
                result,
                index,
                default,
            } => write!(f, "{} = {}({}, {})", result, op, index, default),
            Instr::Label(label) => write!(f, "{}:", label),
            Instr::Jump { target } => write!(f, "{}({})", op, target),
            Instr::BranchFalse { condition, target } => {
                write!(f, "{}({}, {})", op, condition, target)
            }
            Instr::Call {
                result,
                receiver,
                method,
                args,
                closure,
            } => {
                if let Some(result) = result {
                    write!(f, "{} = ", result)?;
                }
                write!(f, "{}({}, :{}, [", op, receiver, method)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, "]")?;
                if let Some(closure) = closure {
                    write!(f, ", &{}", closure)?;
                }
                write!(f, ")")
            }
            Instr::Return { value } => write!(f, "{}({})", op, value),
            Instr::ModuleGuard(guard) => write!(f, "{}", guard),
        }
    }
}
