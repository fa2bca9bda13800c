//! Generic monotone dataflow framework
//!
//! A worklist solver over a CFG, parameterized by a user-supplied lattice:
//! an initial value per node, an equality test, a join, and a transfer
//! function. The framework guarantees a fixed point for lattices of
//! finite height with monotone join and transfer; supplying such a
//! lattice is the analysis author's obligation, and a generous iteration
//! budget asserts against misdesigned ones.

use crate::cfg::{CfgNode, CfgNodeId, ControlFlowGraph};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

/// Per-node fixpoint values of one analysis run, indexed by node id.
/// Nodes the solver never visited (unreachable ones) hold `None`.
#[derive(Debug, Clone)]
pub struct DataFlowResult<D> {
    input: Vec<Option<D>>,
    output: Vec<Option<D>>,
}

impl<D> DataFlowResult<D> {
    fn new(node_count: usize) -> Self {
        Self {
            input: (0..node_count).map(|_| None).collect(),
            output: (0..node_count).map(|_| None).collect(),
        }
    }

    /// The value flowing into a node: from predecessors for a forward
    /// analysis, from successors for a backward one.
    pub fn input_of(&self, id: CfgNodeId) -> Option<&D> {
        self.input[id.index()].as_ref()
    }

    /// The value after the node's transfer function.
    pub fn output_of(&self, id: CfgNodeId) -> Option<&D> {
        self.output[id.index()].as_ref()
    }
}

/// Iteration budget: far above what any finite-height lattice needs, so
/// tripping it means the lattice is misdesigned.
fn iteration_budget(node_count: usize) -> usize {
    10_000 * (node_count + 1)
}

/// A forward monotone dataflow analysis.
pub trait ForwardDataFlowAnalysis {
    /// The lattice.
    type Domain: Clone;

    /// The value a node starts with, before any flow: usually bottom
    /// everywhere except the entry.
    fn initial_value(&mut self, graph: &ControlFlowGraph, node: &CfgNode) -> Self::Domain;

    /// Lattice equality.
    fn compare(&self, a: &Self::Domain, b: &Self::Domain) -> bool;

    /// Least upper bound.
    fn join(&self, a: &Self::Domain, b: &Self::Domain) -> Self::Domain;

    /// Transfer function for one node.
    fn flow(
        &mut self,
        graph: &ControlFlowGraph,
        node: &CfgNode,
        input: &Self::Domain,
    ) -> Self::Domain;

    /// Run the worklist solver to a fixed point.
    fn analyze(&mut self, graph: &ControlFlowGraph) -> DataFlowResult<Self::Domain> {
        let order = graph.forward_order();
        let mut result = DataFlowResult::new(graph.node_count());

        for &id in &order {
            let node = graph.node(id);
            let input = self.initial_value(graph, node);
            let output = self.flow(graph, node, &input);
            result.input[id.index()] = Some(input);
            result.output[id.index()] = Some(output);
        }

        let mut worklist: VecDeque<CfgNodeId> = order.iter().copied().collect();
        let mut enqueued: FxHashSet<CfgNodeId> = worklist.iter().copied().collect();
        let budget = iteration_budget(graph.node_count());
        let mut iterations = 0usize;

        while let Some(id) = worklist.pop_front() {
            enqueued.remove(&id);
            iterations += 1;
            assert!(
                iterations <= budget,
                "dataflow solver exceeded its iteration budget; the lattice is not monotone or not of finite height"
            );

            let mut joined: Option<Self::Domain> = None;
            for &pred in graph.predecessors(id) {
                if let Some(pred_out) = result.output[pred.index()].as_ref() {
                    joined = Some(match joined {
                        None => pred_out.clone(),
                        Some(acc) => self.join(&acc, pred_out),
                    });
                }
            }
            let Some(new_input) = joined else { continue };

            let old_input = result.input[id.index()].as_ref().unwrap();
            if self.compare(&new_input, old_input) {
                continue;
            }

            let node = graph.node(id);
            let new_output = self.flow(graph, node, &new_input);
            result.input[id.index()] = Some(new_input);

            let output_changed = !self
                .compare(&new_output, result.output[id.index()].as_ref().unwrap());
            result.output[id.index()] = Some(new_output);

            if output_changed {
                for &successor in graph.successors(id) {
                    if result.input[successor.index()].is_some() && enqueued.insert(successor) {
                        worklist.push_back(successor);
                    }
                }
            }
        }
        result
    }
}

/// A backward monotone dataflow analysis: identical to the forward one
/// with successors and predecessors swapped. The input of a node is the
/// value joined over its successors.
pub trait BackwardDataFlowAnalysis {
    /// The lattice.
    type Domain: Clone;

    /// The value a node starts with, before any flow.
    fn initial_value(&mut self, graph: &ControlFlowGraph, node: &CfgNode) -> Self::Domain;

    /// Lattice equality.
    fn compare(&self, a: &Self::Domain, b: &Self::Domain) -> bool;

    /// Least upper bound.
    fn join(&self, a: &Self::Domain, b: &Self::Domain) -> Self::Domain;

    /// Transfer function for one node, flowing against control flow.
    fn flow(
        &mut self,
        graph: &ControlFlowGraph,
        node: &CfgNode,
        input: &Self::Domain,
    ) -> Self::Domain;

    /// Run the worklist solver to a fixed point.
    fn analyze(&mut self, graph: &ControlFlowGraph) -> DataFlowResult<Self::Domain> {
        let order = graph.backward_order();
        let mut result = DataFlowResult::new(graph.node_count());

        for &id in &order {
            let node = graph.node(id);
            let input = self.initial_value(graph, node);
            let output = self.flow(graph, node, &input);
            result.input[id.index()] = Some(input);
            result.output[id.index()] = Some(output);
        }

        let mut worklist: VecDeque<CfgNodeId> = order.iter().copied().collect();
        let mut enqueued: FxHashSet<CfgNodeId> = worklist.iter().copied().collect();
        let budget = iteration_budget(graph.node_count());
        let mut iterations = 0usize;

        while let Some(id) = worklist.pop_front() {
            enqueued.remove(&id);
            iterations += 1;
            assert!(
                iterations <= budget,
                "dataflow solver exceeded its iteration budget; the lattice is not monotone or not of finite height"
            );

            let mut joined: Option<Self::Domain> = None;
            for &successor in graph.successors(id) {
                if let Some(successor_out) = result.output[successor.index()].as_ref() {
                    joined = Some(match joined {
                        None => successor_out.clone(),
                        Some(acc) => self.join(&acc, successor_out),
                    });
                }
            }
            let Some(new_input) = joined else { continue };

            let old_input = result.input[id.index()].as_ref().unwrap();
            if self.compare(&new_input, old_input) {
                continue;
            }

            let node = graph.node(id);
            let new_output = self.flow(graph, node, &new_input);
            result.input[id.index()] = Some(new_input);

            let output_changed = !self
                .compare(&new_output, result.output[id.index()].as_ref().unwrap());
            result.output[id.index()] = Some(new_output);

            if output_changed {
                for &pred in graph.predecessors(id) {
                    if result.input[pred.index()].is_some() && enqueued.insert(pred) {
                        worklist.push_back(pred);
                    }
                }
            }
        }
        result
    }
}
