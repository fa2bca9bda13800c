//! Copy propagation
//!
//! Forward dataflow over partial maps from variables to the expressions
//! they were last assigned. Any definition of a variable kills its entry
//! and every entry mentioning it; `r = v` introduces `r -> v`. The
//! transform pass rewrites uses of copied variables through structural
//! substitution.

use crate::cfg::{CfgNode, ControlFlowGraph};
use crate::dataflow::ForwardDataFlowAnalysis;
use crate::ir::{Expression, InstructionKind, Value, Variable};
use rustc_hash::FxHashMap;

/// Forward copy propagation over a CFG.
pub struct CopyPropagation;

impl CopyPropagation {
    /// Apply one instruction's effect to a copy map.
    fn step(state: &mut FxHashMap<Variable, Expression>, kind: &InstructionKind) {
        if let Some(defined) = kind.result() {
            state.remove(defined);
            state.retain(|_, expression| !expression.variables().contains(defined));
        }
        if let InstructionKind::Load { result, operand } = kind {
            let worth_recording = match operand {
                Value::Variable(source) => source != result,
                Value::Constant(_) => true,
                _ => false,
            };
            if worth_recording {
                state.insert(result.clone(), Expression::Value(operand.clone()));
            }
        }
    }

    /// Rewrite every use of a copied variable to its source, block by
    /// block, seeding each block with its fixpoint input. Returns the
    /// number of rewritten instructions.
    pub fn transform(graph: &mut ControlFlowGraph) -> usize {
        let result = CopyPropagation.analyze(graph);
        let mut rewritten = 0;

        for id in graph.node_ids().collect::<Vec<_>>() {
            let mut state = result.input_of(id).cloned().unwrap_or_default();
            let node = graph.node_mut(id);

            for instruction in &mut node.instructions {
                let mut kind = instruction.kind.clone();
                let mut changed = false;
                for used in kind.used_variables() {
                    if let Some(Expression::Value(Value::Variable(source))) = state.get(&used) {
                        kind = kind.replace_uses(&used, &source.clone());
                        changed = true;
                    }
                }
                if changed {
                    instruction.kind = kind.clone();
                    rewritten += 1;
                }
                Self::step(&mut state, &kind);
            }
        }
        rewritten
    }
}

impl ForwardDataFlowAnalysis for CopyPropagation {
    type Domain = FxHashMap<Variable, Expression>;

    fn initial_value(
        &mut self,
        _graph: &ControlFlowGraph,
        _node: &CfgNode,
    ) -> FxHashMap<Variable, Expression> {
        FxHashMap::default()
    }

    fn compare(
        &self,
        a: &FxHashMap<Variable, Expression>,
        b: &FxHashMap<Variable, Expression>,
    ) -> bool {
        a == b
    }

    /// Entries survive a join only when both paths agree on them.
    fn join(
        &self,
        a: &FxHashMap<Variable, Expression>,
        b: &FxHashMap<Variable, Expression>,
    ) -> FxHashMap<Variable, Expression> {
        a.iter()
            .filter(|(variable, expression)| b.get(variable) == Some(expression))
            .map(|(variable, expression)| (variable.clone(), expression.clone()))
            .collect()
    }

    fn flow(
        &mut self,
        _graph: &ControlFlowGraph,
        node: &CfgNode,
        input: &FxHashMap<Variable, Expression>,
    ) -> FxHashMap<Variable, Expression> {
        let mut state = input.clone();
        for instruction in &node.instructions {
            Self::step(&mut state, &instruction.kind);
        }
        state
    }
}
