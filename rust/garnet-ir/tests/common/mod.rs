//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use garnet_ir::{BlockSignature, IrManager, ScopeId};
use tracing_subscriber::EnvFilter;

/// Route `tracing` output through the test harness. Set `RUST_LOG` to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct Fixture {
    pub manager: IrManager,
    pub script: ScopeId,
    pub method: ScopeId,
}

/// A script holding one method, `run`.
pub fn method_fixture() -> Fixture {
    init_tracing();
    let mut manager = IrManager::new();
    let script = manager.new_script("fixture.rb");
    let method = manager.new_method(script, "run", 1, None);
    Fixture {
        manager,
        script,
        method,
    }
}

pub fn block(manager: &mut IrManager, parent: ScopeId) -> ScopeId {
    manager.new_closure(parent, false, 2, None, BlockSignature::default())
}

pub fn for_loop(manager: &mut IrManager, parent: ScopeId) -> ScopeId {
    manager.new_closure(parent, true, 2, None, BlockSignature::default())
}

/// Nest closures under `parent`, one per entry; `true` makes a for-loop body.
/// Returns them outermost first.
pub fn nest(manager: &mut IrManager, parent: ScopeId, for_loops: &[bool]) -> Vec<ScopeId> {
    let mut scopes = Vec::with_capacity(for_loops.len());
    let mut current = parent;
    for &is_for_loop in for_loops {
        current = if is_for_loop {
            for_loop(manager, current)
        } else {
            block(manager, current)
        };
        scopes.push(current);
    }
    scopes
}
