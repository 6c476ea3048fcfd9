//! The runtime-facing descriptor the call mechanism uses to invoke a
//! closure's interpreted body.

use crate::ir::scope::ScopeId;
use serde::Serialize;

/// Number of parameters a block accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Arity {
    pub required: u32,
    pub optional: u32,
    pub rest: bool,
}

impl Arity {
    pub fn fixed(required: u32) -> Self {
        Self {
            required,
            optional: 0,
            rest: false,
        }
    }

    /// `required` when the arity is fixed, `-(required + 1)` otherwise.
    pub fn value(&self) -> i32 {
        if self.optional > 0 || self.rest {
            -(self.required as i32 + 1)
        } else {
            self.required as i32
        }
    }
}

/// How incoming arguments are spread over block parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArgumentType {
    ZeroArgs,
    MultipleAssignment,
    Array,
    SingleRestArg,
}

/// Which parameter-binding semantics the interpreted body follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ParameterBinding {
    /// Older semantics: a lone array argument is never auto-splatted into
    /// optional parameters.
    Classic,
    #[default]
    Modern,
}

/// What the parser knows about a block's parameters when the block is built.
/// A missing `binding` falls back to
/// [`IrOptions::default_binding`](crate::IrOptions::default_binding).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSignature {
    pub arity: Arity,
    pub argument_type: ArgumentType,
    pub binding: Option<ParameterBinding>,
}

impl BlockSignature {
    pub fn new(arity: Arity, argument_type: ArgumentType) -> Self {
        Self {
            arity,
            argument_type,
            binding: None,
        }
    }

    pub fn with_binding(mut self, binding: ParameterBinding) -> Self {
        self.binding = Some(binding);
        self
    }
}

impl Default for BlockSignature {
    fn default() -> Self {
        Self::new(Arity::default(), ArgumentType::ZeroArgs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockBody {
    pub closure: ScopeId,
    pub arity: Arity,
    pub argument_type: ArgumentType,
    pub binding: ParameterBinding,
}

impl BlockBody {
    pub fn new(
        closure: ScopeId,
        arity: Arity,
        argument_type: ArgumentType,
        binding: ParameterBinding,
    ) -> Self {
        Self {
            closure,
            arity,
            argument_type,
            binding,
        }
    }

    /// Same shape, bound to another closure.
    pub fn rebind(&self, closure: ScopeId) -> Self {
        Self { closure, ..*self }
    }
}
