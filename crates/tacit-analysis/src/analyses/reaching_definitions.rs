//! Reaching-definitions analysis
//!
//! Forward dataflow over [`Subset`] bit vectors: a definition reaches a
//! point when some path from the definition arrives without redefining
//! its variable. The definition universe is fixed per graph, so the sets
//! stay cheap to intersect and union.

use crate::cfg::{CfgNode, CfgNodeId, ControlFlowGraph};
use crate::dataflow::{DataFlowResult, ForwardDataFlowAnalysis};
use crate::ir::Variable;
use crate::util::{MultiMap, Subset};
use rustc_hash::FxHashMap;

/// One definition site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    /// Node holding the defining instruction.
    pub node: CfgNodeId,
    /// Index of the instruction within the node.
    pub index: usize,
    /// The defined variable.
    pub variable: Variable,
}

/// Reaching definitions over a CFG.
pub struct ReachingDefinitionsAnalysis {
    definitions: Vec<Definition>,
    definitions_of: MultiMap<Variable, usize>,
    definition_at: FxHashMap<(CfgNodeId, usize), usize>,
}

impl ReachingDefinitionsAnalysis {
    /// Enumerate every definition site of the graph.
    pub fn new(graph: &ControlFlowGraph) -> Self {
        let mut definitions = Vec::new();
        let mut definitions_of = MultiMap::new();
        let mut definition_at = FxHashMap::default();

        for node in graph.nodes() {
            for (index, instruction) in node.instructions.iter().enumerate() {
                if let Some(variable) = instruction.kind.result() {
                    let ordinal = definitions.len();
                    definitions.push(Definition {
                        node: node.id,
                        index,
                        variable: variable.clone(),
                    });
                    definitions_of.insert(variable.clone(), ordinal);
                    definition_at.insert((node.id, index), ordinal);
                }
            }
        }
        Self {
            definitions,
            definitions_of,
            definition_at,
        }
    }

    /// The definition universe, in discovery order.
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// Ordinals of every definition of a variable.
    pub fn definitions_of(&self, variable: &Variable) -> impl Iterator<Item = usize> + '_ {
        self.definitions_of.values_of(variable).copied()
    }

    /// The ordinal of the definition at an instruction, if it defines
    /// anything.
    pub fn definition_at(&self, node: CfgNodeId, index: usize) -> Option<usize> {
        self.definition_at.get(&(node, index)).copied()
    }

    /// Run to a fixed point.
    pub fn run(graph: &ControlFlowGraph) -> (Self, DataFlowResult<Subset>) {
        let mut analysis = Self::new(graph);
        let result = analysis.analyze(graph);
        (analysis, result)
    }

    /// Apply one instruction's gen/kill to a state.
    pub fn step(&self, state: &mut Subset, node: CfgNodeId, index: usize) {
        if let Some(ordinal) = self.definition_at(node, index) {
            let variable = &self.definitions[ordinal].variable;
            for other in self.definitions_of.values_of(variable) {
                state.remove(*other);
            }
            state.insert(ordinal);
        }
    }
}

impl ForwardDataFlowAnalysis for ReachingDefinitionsAnalysis {
    type Domain = Subset;

    fn initial_value(&mut self, _graph: &ControlFlowGraph, _node: &CfgNode) -> Subset {
        Subset::empty(self.definitions.len())
    }

    fn compare(&self, a: &Subset, b: &Subset) -> bool {
        a == b
    }

    fn join(&self, a: &Subset, b: &Subset) -> Subset {
        let mut joined = a.clone();
        joined.union_with(b);
        joined
    }

    fn flow(&mut self, _graph: &ControlFlowGraph, node: &CfgNode, input: &Subset) -> Subset {
        let mut state = input.clone();
        for index in 0..node.instructions.len() {
            self.step(&mut state, node.id, index);
        }
        state
    }
}
