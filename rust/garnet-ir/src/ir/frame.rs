//! The view of a live activation that operands are evaluated against.

use crate::ir::scope::ScopeId;
use crate::ir::variable::{TemporaryVariable, Variable};
use garnet_core::Value;
use std::collections::HashMap;

/// What the interpreter exposes to instructions that inspect live values.
pub trait ExecutionContext {
    fn self_value(&self) -> &Value;
    fn lookup(&self, var: &Variable) -> Option<Value>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Slot {
    Local { owner: ScopeId, slot: u32 },
    Temporary(TemporaryVariable),
}

impl Slot {
    // Locals are keyed by declaration, so every depth-adjusted view of a
    // binding reads the same value.
    fn of(var: &Variable) -> Self {
        match var {
            Variable::Local(lvar) => Slot::Local { owner: lvar.owner, slot: lvar.slot },
            Variable::Temporary(tmp) => Slot::Temporary(tmp.clone()),
        }
    }
}

/// A flat, map-backed frame.
#[derive(Debug, Clone)]
pub struct Frame {
    self_value: Value,
    slots: HashMap<Slot, Value>,
}

impl Frame {
    pub fn new(self_value: Value) -> Self {
        Self {
            self_value,
            slots: HashMap::new(),
        }
    }

    pub fn bind(&mut self, var: &Variable, value: Value) {
        self.slots.insert(Slot::of(var), value);
    }
}

impl ExecutionContext for Frame {
    fn self_value(&self) -> &Value {
        &self.self_value
    }

    fn lookup(&self, var: &Variable) -> Option<Value> {
        self.slots.get(&Slot::of(var)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::variable::{LocalKind, LocalVariable};

    #[test]
    fn test_depth_views_share_a_slot() {
        let x = LocalVariable::new("x", 0, 1, ScopeId::new(4), LocalKind::Plain);
        let mut frame = Frame::new(Value::Nil);
        frame.bind(&Variable::Local(x.clone()), Value::Fixnum(9));
        let view = Variable::Local(x.clone_for_depth(3));
        assert_eq!(frame.lookup(&view), Some(Value::Fixnum(9)));
    }

    #[test]
    fn test_unbound_lookup() {
        let frame = Frame::new(Value::Bool(true));
        let y = Variable::Local(LocalVariable::new("y", 0, 0, ScopeId::new(0), LocalKind::Plain));
        assert_eq!(frame.lookup(&y), None);
        assert_eq!(frame.self_value(), &Value::Bool(true));
    }
}
