//! Operands: the immutable value descriptions instructions consume.

use crate::ir::frame::ExecutionContext;
use crate::ir::inliner::InlinerInfo;
use crate::ir::manager::IrManager;
use crate::ir::scope::ScopeId;
use crate::ir::variable::Variable;
use crate::IrError;
use garnet_core::Value;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A jump target. Names are unique within the scope that minted them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Label(String);

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Label(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Operand {
    Nil,
    Boolean(bool),
    Fixnum(i64),
    /// Mutable string literal; a fresh string per evaluation.
    StringLiteral(String),
    Symbol(String),
    SelfValue,
    Variable(Variable),
    Label(Label),
    /// Rest/splat marker around an array-producing operand.
    Splat(Box<Operand>),
    Array(Vec<Operand>),
    /// A nested closure body, by arena id.
    Closure(ScopeId),
}

impl Operand {
    pub fn splat(inner: Operand) -> Self {
        Operand::Splat(Box::new(inner))
    }

    /// Can a use of a variable be replaced by this operand during copy
    /// propagation?
    pub fn can_copy_propagate(&self) -> bool {
        matches!(
            self,
            Operand::Nil
                | Operand::Boolean(_)
                | Operand::Fixnum(_)
                | Operand::Symbol(_)
                | Operand::SelfValue
                | Operand::Variable(_)
        )
    }

    /// Substitute values from `value_map`. Only variables are replaced, and
    /// only by copy-propagatable operands unless `force` is set.
    pub fn simplified(&self, value_map: &HashMap<Operand, Operand>, force: bool) -> Operand {
        match self {
            Operand::Variable(_) => match value_map.get(self) {
                Some(v) if force || v.can_copy_propagate() => v.clone(),
                _ => self.clone(),
            },
            Operand::Splat(inner) => Operand::splat(inner.simplified(value_map, force)),
            Operand::Array(elts) => {
                Operand::Array(elts.iter().map(|e| e.simplified(value_map, force)).collect())
            }
            _ => self.clone(),
        }
    }

    /// An equivalent operand valid in the scope being cloned into.
    pub fn clone_for_inlining(
        &self,
        ii: &InlinerInfo,
        manager: &mut IrManager,
    ) -> Result<Operand, IrError> {
        Ok(match self {
            Operand::Variable(var) => Operand::Variable(ii.renamed_variable(var)),
            Operand::Label(label) => Operand::Label(ii.renamed_label(label)),
            Operand::Splat(inner) => Operand::splat(inner.clone_for_inlining(ii, manager)?),
            Operand::Array(elts) => Operand::Array(
                elts.iter()
                    .map(|e| e.clone_for_inlining(ii, manager))
                    .collect::<Result<_, _>>()?,
            ),
            Operand::Closure(id) => Operand::Closure(manager.clone_for_cloned_instr(*id, ii)?),
            _ => self.clone(),
        })
    }

    /// Visit this operand and every operand nested inside it.
    pub fn visit(&self, f: &mut impl FnMut(&Operand)) {
        f(self);
        match self {
            Operand::Splat(inner) => inner.visit(f),
            Operand::Array(elts) => elts.iter().for_each(|e| e.visit(f)),
            _ => {}
        }
    }

    /// Evaluate against a live frame.
    pub fn retrieve(&self, ctx: &impl ExecutionContext) -> Result<Value, IrError> {
        match self {
            Operand::Nil => Ok(Value::Nil),
            Operand::Boolean(b) => Ok(Value::Bool(*b)),
            Operand::Fixnum(n) => Ok(Value::Fixnum(*n)),
            Operand::StringLiteral(s) => Ok(Value::Str(Arc::from(s.as_str()))),
            Operand::Symbol(s) => Ok(Value::Symbol(Arc::from(s.as_str()))),
            Operand::SelfValue => Ok(ctx.self_value().clone()),
            Operand::Variable(var) => ctx.lookup(var).ok_or_else(|| IrError::UnboundVariable {
                name: var.to_string(),
            }),
            _ => Err(IrError::NotRetrievable {
                operand: self.to_string(),
            }),
        }
    }
}

impl From<Variable> for Operand {
    fn from(var: Variable) -> Self {
        Operand::Variable(var)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Nil => write!(f, "nil"),
            Operand::Boolean(b) => write!(f, "{}", b),
            Operand::Fixnum(n) => write!(f, "{}", n),
            Operand::StringLiteral(s) => write!(f, "\"{}\"", s),
            Operand::Symbol(s) => write!(f, ":{}", s),
            Operand::SelfValue => write!(f, "%self"),
            Operand::Variable(var) => write!(f, "{}", var),
            Operand::Label(label) => write!(f, "{}", label),
            Operand::Splat(inner) => write!(f, "*{}", inner),
            Operand::Array(elts) => {
                write!(f, "[")?;
                for (i, e) in elts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "]")
            }
            Operand::Closure(id) => write!(f, "closure<{}>", id),
        }
    }
}
