//! Live-variables analysis
//!
//! Backward dataflow over sets of variables: a variable is live at a
//! point when some path from that point reads it before writing it.
//! `gen` is the used set, `kill` the defined set, join is union.

use crate::cfg::{CfgNode, CfgNodeId, ControlFlowGraph};
use crate::dataflow::{BackwardDataFlowAnalysis, DataFlowResult};
use crate::ir::Variable;
use rustc_hash::FxHashSet;

/// Backward liveness over a CFG.
pub struct LiveVariablesAnalysis;

impl LiveVariablesAnalysis {
    /// Run to a fixed point. In the result, a node's *input* is its
    /// live-out set and its *output* is its live-in set.
    pub fn run(graph: &ControlFlowGraph) -> DataFlowResult<FxHashSet<Variable>> {
        LiveVariablesAnalysis.analyze(graph)
    }

    /// The live-in set of a node at the fixed point.
    pub fn live_in(
        result: &DataFlowResult<FxHashSet<Variable>>,
        node: CfgNodeId,
    ) -> FxHashSet<Variable> {
        result.output_of(node).cloned().unwrap_or_default()
    }
}

impl BackwardDataFlowAnalysis for LiveVariablesAnalysis {
    type Domain = FxHashSet<Variable>;

    fn initial_value(
        &mut self,
        _graph: &ControlFlowGraph,
        _node: &CfgNode,
    ) -> FxHashSet<Variable> {
        FxHashSet::default()
    }

    fn compare(&self, a: &FxHashSet<Variable>, b: &FxHashSet<Variable>) -> bool {
        a == b
    }

    fn join(&self, a: &FxHashSet<Variable>, b: &FxHashSet<Variable>) -> FxHashSet<Variable> {
        a.union(b).cloned().collect()
    }

    fn flow(
        &mut self,
        _graph: &ControlFlowGraph,
        node: &CfgNode,
        input: &FxHashSet<Variable>,
    ) -> FxHashSet<Variable> {
        let mut live = input.clone();
        for instruction in node.instructions.iter().rev() {
            for defined in instruction.kind.modified_variables() {
                live.remove(&defined);
            }
            live.extend(instruction.kind.used_variables());
        }
        live
    }
}
