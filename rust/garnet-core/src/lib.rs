//! Garnet Core
//!
//! Runtime object model shared by the IR and the interpreter: modules with
//! generation counters, heap objects, and values.

pub mod module;
pub mod value;

pub use module::RtModule;
pub use value::{RtObject, Value};
