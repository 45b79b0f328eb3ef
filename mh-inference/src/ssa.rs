//! On-demand SSA form over the host's linearized instruction list.
//!
//! Blocks are derived from branch edges, a synthetic entry block is
//! prepended, and every block is sealed immediately since the whole
//! flow graph is known up front. Reading a variable walks predecessors
//! lazily and materializes a phi at every join point it crosses; no
//! trivial-phi elimination is performed, the consumer folds phi leaves
//! with the lattice join instead.

use std::collections::{BTreeSet, HashMap, HashSet};

use miette::Diagnostic;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::DfsPostOrder;
use petgraph::Direction;
use thiserror::Error;

use crate::ir::{ControlFlow, VarId};

#[derive(Debug, Error, Diagnostic)]
pub enum CfgError {
    /// The control flow the host handed us is inconsistent, typically
    /// because the body is being edited while we analyze it.
    #[error("instruction {instruction} starts a block with no predecessors")]
    #[diagnostic(code(mh_inference::ssa::unreachable_block))]
    UnreachableBlock { instruction: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(NodeIndex);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhiId(usize);

/// A definition reaching a use: either a concrete value or a join point.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<T> {
    Holder(T),
    Phi(PhiId),
}

#[derive(Debug, Clone)]
struct PhiData<T> {
    operands: Vec<(NodeIndex, Value<T>)>,
}

#[derive(Debug)]
pub struct SsaConstruction<T> {
    graph: DiGraph<Vec<usize>, ()>,
    entry: NodeIndex,
    defs: HashMap<VarId, HashMap<NodeIndex, Value<T>>>,
    phis: Vec<PhiData<T>>,
}

impl<T: Clone> SsaConstruction<T> {
    pub fn build(flow: &ControlFlow) -> Result<Self, CfgError> {
        let len = flow.instructions.len();

        // Block leaders: the first instruction, and both endpoints of
        // every non-fallthrough transfer.
        let mut leaders = BTreeSet::new();
        leaders.insert(0);
        let mut out_degree = vec![0usize; len];
        for &(from, _) in &flow.edges {
            if from < len {
                out_degree[from] += 1;
            }
        }
        for &(from, to) in &flow.edges {
            if from >= len || to >= len {
                continue;
            }
            if to != from + 1 || out_degree[from] > 1 {
                leaders.insert(to);
                if from + 1 < len {
                    leaders.insert(from + 1);
                }
            }
        }

        let mut graph = DiGraph::new();
        let entry = graph.add_node(Vec::new());
        let mut block_of = vec![entry; len];
        let mut current = None;
        for index in 0..len {
            if leaders.contains(&index) {
                current = Some(graph.add_node(Vec::new()));
            }
            let node = current.unwrap_or(entry);
            graph[node].push(index);
            block_of[index] = node;
        }

        let mut seen = HashSet::new();
        if len > 0 {
            let first = block_of[0];
            graph.add_edge(entry, first, ());
            seen.insert((entry, first));
        }
        for &(from, to) in &flow.edges {
            if from >= len || to >= len {
                continue;
            }
            let (from_block, to_block) = (block_of[from], block_of[to]);
            if from_block != to_block && seen.insert((from_block, to_block)) {
                graph.add_edge(from_block, to_block, ());
            }
        }

        for node in graph.node_indices() {
            if node != entry
                && graph
                    .neighbors_directed(node, Direction::Incoming)
                    .next()
                    .is_none()
            {
                return Err(CfgError::UnreachableBlock {
                    instruction: graph[node][0],
                });
            }
        }

        Ok(SsaConstruction {
            graph,
            entry,
            defs: HashMap::new(),
            phis: Vec::new(),
        })
    }

    pub fn write_variable(&mut self, var: VarId, block: BlockId, value: Value<T>) {
        self.defs.entry(var).or_default().insert(block.0, value);
    }

    /// The definition of `var` visible at the start of `block`'s
    /// instruction currently being interpreted, or `None` if no write
    /// reaches it.
    pub fn read_variable(&mut self, var: VarId, block: BlockId) -> Option<Value<T>> {
        if !self.defs.contains_key(&var) {
            return None;
        }
        self.read_in(var, block.0)
    }

    fn read_in(&mut self, var: VarId, node: NodeIndex) -> Option<Value<T>> {
        if let Some(value) = self.defs.get(&var).and_then(|defs| defs.get(&node)) {
            return Some(value.clone());
        }
        self.read_recursive(var, node)
    }

    fn read_recursive(&mut self, var: VarId, node: NodeIndex) -> Option<Value<T>> {
        let preds: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .collect();
        match preds.len() {
            0 => None,
            1 => self.read_in(var, preds[0]),
            _ => {
                let phi = PhiId(self.phis.len());
                self.phis.push(PhiData {
                    operands: Vec::new(),
                });
                // Writing the phi before reading the predecessors
                // breaks the recursion on loop back edges.
                self.write_variable(var, BlockId(node), Value::Phi(phi));
                let mut operands = Vec::new();
                for pred in preds {
                    if let Some(value) = self.read_in(var, pred) {
                        operands.push((pred, value));
                    }
                }
                self.phis[phi.0].operands = operands;
                Some(Value::Phi(phi))
            }
        }
    }

    pub fn phi_operands(&self, phi: PhiId) -> impl Iterator<Item = &Value<T>> {
        self.phis[phi.0].operands.iter().map(|(_, value)| value)
    }

    /// Blocks in reverse postorder from the synthetic entry; every
    /// block is visited after all its forward predecessors.
    pub fn traversal_order(&self) -> Vec<BlockId> {
        let mut order = Vec::new();
        let mut dfs = DfsPostOrder::new(&self.graph, self.entry);
        while let Some(node) = dfs.next(&self.graph) {
            order.push(BlockId(node));
        }
        order.reverse();
        order
    }

    pub fn instructions(&self, block: BlockId) -> &[usize] {
        &self.graph[block.0]
    }
}
