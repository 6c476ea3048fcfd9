//! Representation-agnostic helpers used by graph algorithms over the IR.

pub mod data_iterable;

pub use data_iterable::{DataIter, DataIterable, Edge, EdgeEnd};
