//! Speculation guard on a module's structure generation.
//!
//! Optimized code that assumed "the receiver's metaclass is C, as of
//! generation G" is preceded by a [`ModuleVersionGuardInstr`]. Every execution
//! re-checks the receiver's live metaclass generation against G; on mismatch
//! the interpreter branches to the failure label (the slow/deopt path). The
//! guard holds no state of its own and may be evaluated by any number of
//! threads at once.

use crate::ir::frame::ExecutionContext;
use crate::ir::inliner::InlinerInfo;
use crate::ir::instr::Operation;
use crate::ir::manager::IrManager;
use crate::ir::operand::{Label, Operand};
use crate::IrError;
use garnet_core::RtModule;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ModuleVersionGuardInstr {
    /// The module whose structure was assumed.
    module: Arc<RtModule>,
    /// Generation observed when the assumption was made.
    expected_version: u64,
    /// The value whose metaclass generation is checked.
    candidate: Operand,
    failure_label: Label,
}

impl ModuleVersionGuardInstr {
    pub fn new(
        module: Arc<RtModule>,
        expected_version: u64,
        candidate: Operand,
        failure_label: Label,
    ) -> Self {
        Self {
            module,
            expected_version,
            candidate,
            failure_label,
        }
    }

    pub fn module(&self) -> &Arc<RtModule> {
        &self.module
    }

    pub fn expected_version(&self) -> u64 {
        self.expected_version
    }

    pub fn candidate(&self) -> &Operand {
        &self.candidate
    }

    pub fn failure_path_label(&self) -> &Label {
        &self.failure_label
    }

    /// Only the checked value is an operand; module, version and label are
    /// fixed properties of the instruction.
    pub fn operands(&self) -> Vec<&Operand> {
        vec![&self.candidate]
    }

    pub fn simplify_operands(&mut self, value_map: &HashMap<Operand, Operand>, force: bool) {
        self.candidate = self.candidate.simplified(value_map, force);
    }

    pub fn clone_for_inlined_scope(
        &self,
        ii: &InlinerInfo,
        manager: &mut IrManager,
    ) -> Result<Self, IrError> {
        Ok(Self::new(
            Arc::clone(&self.module),
            self.expected_version,
            self.candidate.clone_for_inlining(ii, manager)?,
            ii.renamed_label(&self.failure_label),
        ))
    }

    /// Does the candidate's live metaclass still have the expected
    /// generation? Values without a metaclass never match.
    pub fn version_matches(&self, ctx: &impl ExecutionContext) -> Result<bool, IrError> {
        let receiver = self.candidate.retrieve(ctx)?;
        // TODO: once the module itself has moved past expected_version, the
        // guard can never pass again and should be rewritten into a jump.
        Ok(receiver
            .metaclass()
            .is_some_and(|class| class.generation() == self.expected_version))
    }
}

impl PartialEq for ModuleVersionGuardInstr {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.module, &other.module)
            && self.expected_version == other.expected_version
            && self.candidate == other.candidate
            && self.failure_label == other.failure_label
    }
}

impl fmt::Display for ModuleVersionGuardInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}, {}[{}], {})",
            Operation::ModuleGuard,
            self.candidate,
            self.expected_version,
            self.module.name(),
            self.failure_label
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::frame::Frame;
    use garnet_core::{RtObject, Value};

    fn guard_on_self(module: &Arc<RtModule>, version: u64) -> ModuleVersionGuardInstr {
        ModuleVersionGuardInstr::new(module.clone(), version, Operand::SelfValue, Label::new("LBL_0"))
    }

    #[test]
    fn test_matches_current_generation() {
        let class = RtModule::new("Point");
        let frame = Frame::new(Value::Object(RtObject::new(class.clone())));
        let guard = guard_on_self(&class, class.generation());
        assert!(guard.version_matches(&frame).unwrap());
    }

    #[test]
    fn test_stale_after_bump() {
        let class = RtModule::new("Point");
        let frame = Frame::new(Value::Object(RtObject::new(class.clone())));
        let guard = guard_on_self(&class, class.generation());
        class.bump_generation();
        assert!(!guard.version_matches(&frame).unwrap());
    }

    #[test]
    fn test_immediate_never_matches() {
        let class = RtModule::new("Integer");
        let frame = Frame::new(Value::Fixnum(1));
        assert!(!guard_on_self(&class, 0).version_matches(&frame).unwrap());
    }

    #[test]
    fn test_operands_are_only_the_candidate() {
        let class = RtModule::new("Point");
        let guard = guard_on_self(&class, 3);
        assert_eq!(guard.operands(), vec![&Operand::SelfValue]);
    }

    #[test]
    fn test_display() {
        let class = RtModule::new("Point");
        let guard = guard_on_self(&class, 3);
        assert_eq!(guard.to_string(), "module_guard(%self, 3[Point], LBL_0)");
    }
}
