//! Control-flow graph over a scope's instructions.
//!
//! Blocks are addressed by [`BlockId`] (an index into the block vector), so
//! cloning a graph keeps its shape by construction: only labels and
//! instructions are renamed, block ids and edges carry over untouched.

use crate::ir::inliner::InlinerInfo;
use crate::ir::instr::Instr;
use crate::ir::manager::IrManager;
use crate::ir::operand::Label;
use crate::ir::scope::ScopeId;
use crate::util::data_iterable::{DataIterable, Edge};
use crate::IrError;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fmt::Write as _;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BlockId(u32);

impl BlockId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Display)]
pub enum EdgeType {
    /// Taken jump, branch or guard failure.
    Regular,
    FallThrough,
    /// Return, or falling off the end of the scope.
    Exit,
}

pub type CfgEdge = Edge<BlockId, EdgeType>;
pub type EdgeSet = BTreeSet<CfgEdge>;

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub id: BlockId,
    pub label: Label,
    pub instrs: Vec<Instr>,
}

#[derive(Debug, Clone)]
pub struct Cfg {
    scope: ScopeId,
    blocks: Vec<BasicBlock>,
    entry: BlockId,
    exit: BlockId,
    outgoing: Vec<EdgeSet>,
    incoming: Vec<EdgeSet>,
}

impl Cfg {
    /// Split `instrs` into blocks and connect them. Blocks start at `Label`
    /// instructions and after terminators; `new_label` names blocks that have
    /// no label of their own (including entry and exit).
    pub fn build(
        scope: ScopeId,
        scope_name: &str,
        instrs: &[Instr],
        mut new_label: impl FnMut() -> Label,
    ) -> Result<Cfg, IrError> {
        let mut cfg = Cfg {
            scope,
            blocks: Vec::new(),
            entry: BlockId(0),
            exit: BlockId(0),
            outgoing: Vec::new(),
            incoming: Vec::new(),
        };
        cfg.entry = cfg.add_block(new_label());

        let mut body: Vec<BlockId> = Vec::new();
        let mut current: Option<BlockId> = None;
        for instr in instrs {
            let block = match (instr, current) {
                (Instr::Label(label), _) => {
                    let id = cfg.add_block(label.clone());
                    body.push(id);
                    id
                }
                (_, Some(id)) => id,
                (_, None) => {
                    let id = cfg.add_block(new_label());
                    body.push(id);
                    id
                }
            };
            cfg.blocks[block.index()].instrs.push(instr.clone());
            current = if instr.is_terminator() { None } else { Some(block) };
        }
        cfg.exit = cfg.add_block(new_label());

        let by_label: HashMap<Label, BlockId> = cfg
            .blocks
            .iter()
            .map(|b| (b.label.clone(), b.id))
            .collect();
        let lookup = |label: &Label| {
            by_label.get(label).copied().ok_or_else(|| IrError::UnknownLabel {
                label: label.to_string(),
                scope: scope_name.to_string(),
            })
        };

        let exit = cfg.exit;
        let fall_through = |next: BlockId| {
            if next == exit {
                EdgeType::Exit
            } else {
                EdgeType::FallThrough
            }
        };

        let first = body.first().copied().unwrap_or(exit);
        cfg.add_edge(cfg.entry, first, fall_through(first));

        for (i, &id) in body.iter().enumerate() {
            let next = body.get(i + 1).copied().unwrap_or(exit);
            let last = cfg.blocks[id.index()].instrs.last().cloned();
            match last {
                Some(Instr::Return { .. }) => cfg.add_edge(id, exit, EdgeType::Exit),
                Some(Instr::Jump { target }) => {
                    cfg.add_edge(id, lookup(&target)?, EdgeType::Regular);
                }
                Some(ref branch @ (Instr::BranchFalse { .. } | Instr::ModuleGuard(_))) => {
                    if let Some(target) = branch.jump_target() {
                        cfg.add_edge(id, lookup(target)?, EdgeType::Regular);
                    }
                    cfg.add_edge(id, next, fall_through(next));
                }
                _ => cfg.add_edge(id, next, fall_through(next)),
            }
        }

        tracing::debug!(
            scope = %scope_name,
            blocks = cfg.blocks.len(),
            "built control-flow graph"
        );
        Ok(cfg)
    }

    fn add_block(&mut self, label: Label) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BasicBlock {
            id,
            label,
            instrs: Vec::new(),
        });
        self.outgoing.push(EdgeSet::new());
        self.incoming.push(EdgeSet::new());
        id
    }

    fn add_edge(&mut self, from: BlockId, to: BlockId, kind: EdgeType) {
        let edge = Edge::new(from, to, kind);
        self.outgoing[from.index()].insert(edge.clone());
        self.incoming[to.index()].insert(edge);
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn exit(&self) -> BlockId {
        self.exit
    }

    pub fn block_for_label(&self, label: &Label) -> Option<BlockId> {
        self.blocks.iter().find(|b| &b.label == label).map(|b| b.id)
    }

    pub fn outgoing_edges(&self, id: BlockId) -> &EdgeSet {
        &self.outgoing[id.index()]
    }

    pub fn incoming_edges(&self, id: BlockId) -> &EdgeSet {
        &self.incoming[id.index()]
    }

    pub fn successors(&self, id: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.outgoing_edges(id).iter().map(|e| e.destination)
    }

    pub fn predecessors(&self, id: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.incoming_edges(id).iter().map(|e| e.source)
    }

    pub fn successors_of_type(&self, id: BlockId, kind: EdgeType) -> DataIterable<'_, EdgeSet, EdgeType> {
        DataIterable::new(self.outgoing_edges(id), kind)
    }

    pub fn successors_not_of_type(
        &self,
        id: BlockId,
        kind: EdgeType,
    ) -> DataIterable<'_, EdgeSet, EdgeType> {
        DataIterable::with_negate(self.outgoing_edges(id), kind, true)
    }

    pub fn predecessors_of_type(&self, id: BlockId, kind: EdgeType) -> DataIterable<'_, EdgeSet, EdgeType> {
        DataIterable::new(self.incoming_edges(id), kind).from_sources()
    }

    /// All instructions in block order.
    pub fn instrs(&self) -> Vec<Instr> {
        self.blocks.iter().flat_map(|b| b.instrs.iter().cloned()).collect()
    }

    /// Same graph for the closure `scope`, every block label and instruction
    /// renamed through `ii`.
    pub fn clone_for_cloning_closure(
        &self,
        scope: ScopeId,
        ii: &InlinerInfo,
        manager: &mut IrManager,
    ) -> Result<Cfg, IrError> {
        let mut blocks = Vec::with_capacity(self.blocks.len());
        for block in &self.blocks {
            let instrs = block
                .instrs
                .iter()
                .map(|i| i.clone_for_inlined_scope(ii, manager))
                .collect::<Result<Vec<_>, _>>()?;
            blocks.push(BasicBlock {
                id: block.id,
                label: ii.renamed_label(&block.label),
                instrs,
            });
        }
        Ok(Cfg {
            scope,
            blocks,
            entry: self.entry,
            exit: self.exit,
            outgoing: self.outgoing.clone(),
            incoming: self.incoming.clone(),
        })
    }

    pub fn to_string_graph(&self) -> String {
        let mut buf = String::new();
        for block in &self.blocks {
            let _ = write!(buf, "BB [{}:{}]", block.id, block.label);
            let succs: Vec<String> = self
                .outgoing_edges(block.id)
                .iter()
                .map(|e| format!("{} ({})", e.destination, e.kind))
                .collect();
            if !succs.is_empty() {
                let _ = write!(buf, " -> {}", succs.join(", "));
            }
            buf.push('\n');
        }
        buf
    }

    pub fn to_string_instrs(&self) -> String {
        let mut buf = String::new();
        for block in &self.blocks {
            let _ = writeln!(buf, "BB [{}:{}]", block.id, block.label);
            for instr in &block.instrs {
                let _ = writeln!(buf, "\t{}", instr);
            }
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::operand::Operand;

    fn build(instrs: &[Instr]) -> Result<Cfg, IrError> {
        let mut n = 0;
        Cfg::build(ScopeId::new(0), "test", instrs, || {
            n += 1;
            Label::new(format!("B{}", n))
        })
    }

    #[test]
    fn test_straight_line_has_entry_body_exit() {
        let cfg = build(&[Instr::Return { value: Operand::Nil }]).unwrap();
        assert_eq!(cfg.blocks().len(), 3);
        let body: Vec<BlockId> = cfg.successors(cfg.entry()).collect();
        assert_eq!(body.len(), 1);
        let exits: Vec<&BlockId> = cfg.successors_of_type(body[0], EdgeType::Exit).iter().collect();
        assert_eq!(exits, vec![&cfg.exit()]);
    }

    #[test]
    fn test_branch_edges() {
        let target = Label::new("ELSE");
        let cfg = build(&[
            Instr::BranchFalse {
                condition: Operand::Boolean(false),
                target: target.clone(),
            },
            Instr::Return { value: Operand::Fixnum(1) },
            Instr::Label(target.clone()),
            Instr::Return { value: Operand::Fixnum(2) },
        ])
        .unwrap();
        let branch_block = cfg.successors(cfg.entry()).next().unwrap();
        let else_block = cfg.block_for_label(&target).unwrap();
        let taken: Vec<&BlockId> = cfg.successors_of_type(branch_block, EdgeType::Regular).iter().collect();
        assert_eq!(taken, vec![&else_block]);
        let not_taken: Vec<&BlockId> = cfg
            .successors_not_of_type(branch_block, EdgeType::Regular)
            .iter()
            .collect();
        assert_eq!(not_taken.len(), 1);
        assert_ne!(not_taken[0], &else_block);
        let preds: Vec<&BlockId> = cfg
            .predecessors_of_type(else_block, EdgeType::Regular)
            .iter()
            .collect();
        assert_eq!(preds, vec![&branch_block]);
    }

    #[test]
    fn test_unknown_jump_target() {
        let err = build(&[Instr::Jump { target: Label::new("NOWHERE") }]).unwrap_err();
        assert!(err.to_string().contains("NOWHERE"));
    }

    #[test]
    fn test_empty_scope_goes_straight_to_exit() {
        let cfg = build(&[]).unwrap();
        let succs: Vec<BlockId> = cfg.successors(cfg.entry()).collect();
        assert_eq!(succs, vec![cfg.exit()]);
        assert!(cfg.instrs().is_empty());
    }

    #[test]
    fn test_render() {
        let cfg = build(&[Instr::Return { value: Operand::Nil }]).unwrap();
        assert!(cfg.to_string_graph().contains("BB [1:B2] -> 2 (Exit)"));
        assert!(cfg.to_string_instrs().contains("\treturn(nil)"));
    }
}
