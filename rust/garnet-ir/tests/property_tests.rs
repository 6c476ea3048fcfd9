//! Randomized checks of nesting depth and depth-adjusted variable views.

mod common;

use common::nest;
use garnet_ir::ir::variable::BLOCK;
use garnet_ir::IrManager;
use proptest::prelude::*;

fn build(for_loops: &[bool]) -> (IrManager, garnet_ir::ScopeId, Vec<garnet_ir::ScopeId>) {
    let mut manager = IrManager::new();
    let script = manager.new_script("prop.rb");
    let method = manager.new_method(script, "run", 1, None);
    let chain = nest(&mut manager, method, for_loops);
    (manager, method, chain)
}

/// The method counts once; every closure above `i` that is not a for-loop
/// body counts once more.
fn expected_depth(for_loops: &[bool], i: usize) -> u32 {
    1 + for_loops[..i].iter().filter(|&&f| !f).count() as u32
}

proptest! {
    #[test]
    fn prop_nesting_depth(for_loops in prop::collection::vec(any::<bool>(), 1..10)) {
        let (manager, _, chain) = build(&for_loops);
        for (i, &c) in chain.iter().enumerate() {
            prop_assert_eq!(manager[c].nesting_depth(), Some(expected_depth(&for_loops, i)));
        }
    }

    #[test]
    fn prop_views_share_the_method_binding(for_loops in prop::collection::vec(any::<bool>(), 1..10)) {
        let (mut manager, method, chain) = build(&for_loops);
        let declared = manager.get_local_variable(method, "v", 0);
        for (i, &c) in chain.iter().enumerate() {
            if for_loops[i] {
                continue;
            }
            let depth = manager[c].nesting_depth().unwrap_or(0);
            let view = manager.get_local_variable(c, "v", depth);
            prop_assert!(view.same_binding(&declared));
            prop_assert_eq!(view.depth, depth);
        }
        prop_assert_eq!(manager[method].local_variables().len(), 1);
    }

    #[test]
    fn prop_for_loops_hold_no_bindings(for_loops in prop::collection::vec(any::<bool>(), 1..10)) {
        let (mut manager, method, chain) = build(&for_loops);
        for (i, &c) in chain.iter().enumerate() {
            let name = format!("v{}", i);
            let lvar = manager.get_local_variable(c, &name, 0);
            let owner = chain[..=i]
                .iter()
                .zip(&for_loops[..=i])
                .rev()
                .find(|(_, &f)| !f)
                .map(|(&s, _)| s)
                .unwrap_or(method);
            prop_assert_eq!(lvar.owner, owner);
        }
        for (i, &c) in chain.iter().enumerate() {
            if for_loops[i] {
                prop_assert!(manager[c].local_variables().is_empty());
            }
        }
    }

    #[test]
    fn prop_implicit_block_arg_lives_in_method(for_loops in prop::collection::vec(any::<bool>(), 1..10)) {
        let (mut manager, method, chain) = build(&for_loops);
        let innermost = chain[chain.len() - 1];
        let view = manager.get_implicit_block_arg(innermost).unwrap();
        prop_assert_eq!(view.owner, method);
        prop_assert_eq!(Some(view.depth), manager[innermost].nesting_depth());
        prop_assert!(manager[method].local_variables().get(BLOCK).is_some());
    }
}
