//! Cloning closures for inlining: renaming, nested closures, and isolation
//! between a clone and its source.

mod common;

use common::{block, method_fixture};
use garnet_ir::ir::{EdgeType, InlinerInfo, Instr, Label, Operand, Variable};
use garnet_ir::{IrError, IrManager, ScopeId};

struct Source {
    outer: ScopeId,
    inner: ScopeId,
}

/// `run` holds a closure that receives `a`, branches on it, and passes a
/// nested closure reading `a` to `each`.
fn build_source(manager: &mut IrManager, method: ScopeId) -> Source {
    let outer = block(manager, method);
    let inner = block(manager, outer);

    let a = Variable::Local(manager.get_local_variable(outer, "a", 0));
    let t = manager.get_new_temporary_variable(outer);
    let r = manager.get_new_temporary_variable(outer);
    let skip = manager.get_new_label(outer);
    manager.add_instr(outer, Instr::ReceiveArg { result: a.clone(), index: 0 });
    manager.add_instr(
        outer,
        Instr::Copy {
            result: t.clone(),
            source: Operand::Variable(a.clone()),
        },
    );
    manager.add_instr(
        outer,
        Instr::BranchFalse {
            condition: Operand::Variable(t.clone()),
            target: skip.clone(),
        },
    );
    manager.add_instr(
        outer,
        Instr::Call {
            result: Some(r.clone()),
            receiver: Operand::SelfValue,
            method: "each".into(),
            args: vec![Operand::Array(vec![Operand::Variable(t.clone()), Operand::Fixnum(1)])],
            closure: Some(Operand::Closure(inner)),
        },
    );
    manager.add_instr(outer, Instr::Label(skip));
    manager.add_instr(outer, Instr::Return { value: Operand::Variable(t) });

    let seen = Variable::Local(manager.get_local_variable(inner, "a", 1));
    let u = manager.get_new_temporary_variable(inner);
    manager.add_instr(
        inner,
        Instr::Copy {
            result: u.clone(),
            source: Operand::Variable(seen),
        },
    );
    manager.add_instr(inner, Instr::Return { value: Operand::Variable(u) });

    manager.build_cfg(inner).unwrap();
    manager.build_cfg(outer).unwrap();
    Source { outer, inner }
}

fn nested_closure(instrs: &[Instr]) -> Option<ScopeId> {
    instrs.iter().find_map(|instr| match instr {
        Instr::Call {
            closure: Some(Operand::Closure(id)),
            ..
        } => Some(*id),
        _ => None,
    })
}

#[test]
fn test_clone_is_structurally_isomorphic() {
    let mut fx = method_fixture();
    let src = build_source(&mut fx.manager, fx.method);
    let clone = fx.manager.clone_closure(src.outer, fx.method).unwrap();

    let source_cfg = fx.manager[src.outer].cfg().unwrap();
    let clone_cfg = fx.manager[clone].cfg().unwrap();
    assert_eq!(source_cfg.blocks().len(), clone_cfg.blocks().len());
    for (a, b) in source_cfg.blocks().iter().zip(clone_cfg.blocks()) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.instrs.len(), b.instrs.len());
        for (x, y) in a.instrs.iter().zip(&b.instrs) {
            assert_eq!(x.operation(), y.operation());
        }
        assert_eq!(source_cfg.outgoing_edges(a.id), clone_cfg.outgoing_edges(b.id));
    }
    assert_eq!(fx.manager[clone].instrs().len(), fx.manager[src.outer].instrs().len());
}

#[test]
fn test_clone_renames_labels_and_temporaries() {
    let mut fx = method_fixture();
    let src = build_source(&mut fx.manager, fx.method);
    let clone = fx.manager.clone_closure(src.outer, fx.method).unwrap();
    let clone_id = fx.manager[clone].closure_id().unwrap();
    let prefix = format!("CL{}_LBL", clone_id);

    let cfg = fx.manager[clone].cfg().unwrap();
    for block in cfg.blocks() {
        assert!(block.label.name().starts_with(&prefix), "{}", block.label);
        for instr in &block.instrs {
            for label in instr.labels() {
                assert!(label.name().starts_with(&prefix), "{}", label);
            }
            if let Some(Variable::Temporary(tmp)) = instr.result() {
                assert_eq!(tmp.owner, clone);
            }
        }
    }

    let branch = cfg
        .blocks()
        .iter()
        .flat_map(|b| &b.instrs)
        .find_map(|i| match i {
            Instr::BranchFalse { target, .. } => Some(target.clone()),
            _ => None,
        })
        .unwrap();
    let target_block = cfg.block_for_label(&branch).unwrap();
    assert_eq!(
        cfg.predecessors_of_type(target_block, EdgeType::Regular).iter().count(),
        1
    );
}

#[test]
fn test_clone_recurses_into_nested_closures() {
    let mut fx = method_fixture();
    let src = build_source(&mut fx.manager, fx.method);
    let clone = fx.manager.clone_closure(src.outer, fx.method).unwrap();

    let nested = nested_closure(fx.manager[clone].instrs()).unwrap();
    assert_ne!(nested, src.inner);
    assert_eq!(fx.manager[nested].lexical_parent(), Some(clone));
    assert_eq!(fx.manager[nested].name(), "_CLOSURE_CLONE_4");
    assert_eq!(fx.manager[nested].nesting_depth(), fx.manager[src.inner].nesting_depth());

    // The nested clone reads the outer clone's `a`, not the source's.
    let read = fx.manager[nested]
        .instrs()
        .iter()
        .find_map(|i| match i {
            Instr::Copy {
                source: Operand::Variable(Variable::Local(lvar)),
                ..
            } => Some(lvar.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(read.owner, clone);
    assert_eq!(read.depth, 1);

    assert_eq!(nested_closure(fx.manager[src.outer].instrs()), Some(src.inner));
}

#[test]
fn test_mutating_clone_leaves_source_alone() {
    let mut fx = method_fixture();
    let src = build_source(&mut fx.manager, fx.method);
    let instrs_before = fx.manager[src.outer].instrs().to_vec();
    let graph_before = fx.manager[src.outer].cfg().unwrap().to_string_graph();
    let locals_before = fx.manager[src.outer].local_variables().len();
    let start_before = fx.manager[src.outer].start_label().cloned();

    let clone = fx.manager.clone_closure(src.outer, fx.method).unwrap();
    fx.manager.add_instr(clone, Instr::Return { value: Operand::Nil });
    let fresh = fx.manager.get_local_variable(clone, "fresh", 0);
    fx.manager.set_parameter_list(clone, vec!["fresh".into()]).unwrap();
    fx.manager.build_cfg(clone).unwrap();
    fx.manager.mark_inlined(clone).unwrap();

    assert_eq!(fresh.owner, clone);
    assert_eq!(fx.manager[src.outer].instrs(), instrs_before.as_slice());
    assert_eq!(fx.manager[src.outer].cfg().unwrap().to_string_graph(), graph_before);
    assert_eq!(fx.manager[src.outer].local_variables().len(), locals_before);
    assert!(fx.manager[src.outer].local_variables().get("fresh").is_none());
    assert_eq!(fx.manager[src.outer].start_label().cloned(), start_before);
    assert!(!fx.manager[src.outer].has_been_inlined());
    assert!(fx.manager[src.outer].parameter_list().is_empty());
}

#[test]
fn test_placed_start_label_follows_the_clone_body() {
    let mut fx = method_fixture();
    let c = block(&mut fx.manager, fx.method);
    let start = fx.manager[c].start_label().cloned().unwrap();
    let end = fx.manager[c].end_label().cloned().unwrap();
    fx.manager.add_instr(c, Instr::Label(start.clone()));
    fx.manager.add_instr(
        c,
        Instr::BranchFalse {
            condition: Operand::Boolean(true),
            target: start.clone(),
        },
    );
    fx.manager.add_instr(c, Instr::Return { value: Operand::Nil });
    fx.manager.build_cfg(c).unwrap();

    let clone = fx.manager.clone_closure(c, fx.method).unwrap();
    let scope = &fx.manager[clone];
    let clone_start = scope.start_label().cloned().unwrap();
    assert_ne!(clone_start, start);
    let cfg = scope.cfg().unwrap();
    let redo = cfg.block_for_label(&clone_start).unwrap();
    let looped: Vec<_> = cfg.successors_of_type(redo, EdgeType::Regular).iter().copied().collect();
    assert_eq!(looped, vec![redo]);

    // The end label is never placed, so the clone mints its own.
    let clone_end = scope.end_label().cloned().unwrap();
    assert_ne!(clone_end, end);
    assert!(cfg.block_for_label(&clone_end).is_none());
}

#[test]
fn test_clone_under_new_parent() {
    let mut fx = method_fixture();
    let src = build_source(&mut fx.manager, fx.method);
    let host = fx.manager.new_method(fx.script, "host", 20, None);
    let ii = InlinerInfo::for_new_parent(host);
    let clone = fx.manager.clone_for_cloned_instr(src.outer, &ii).unwrap();

    assert_eq!(fx.manager[clone].lexical_parent(), Some(host));
    assert_eq!(fx.manager[clone].closure_id(), Some(1));
    assert_eq!(fx.manager[clone].name(), "_CLOSURE_CLONE_1");
    assert_eq!(
        fx.manager[clone].start_label(),
        Some(&Label::new("_CLOSURE_CLONE_1_START_0"))
    );
    assert_eq!(fx.manager[clone].block_args().len(), 1);
}

#[test]
fn test_clone_without_cfg_fails() {
    let mut fx = method_fixture();
    let outer = block(&mut fx.manager, fx.method);
    let inner = block(&mut fx.manager, outer);
    fx.manager.add_instr(
        outer,
        Instr::Call {
            result: None,
            receiver: Operand::SelfValue,
            method: "tap".into(),
            args: Vec::new(),
            closure: Some(Operand::Closure(inner)),
        },
    );
    fx.manager.build_cfg(outer).unwrap();
    match fx.manager.clone_closure(outer, fx.method) {
        Err(IrError::CfgNotBuilt { scope }) => assert_eq!(scope, "_CLOSURE_2"),
        other => panic!("expected CfgNotBuilt, got {:?}", other),
    }
}
