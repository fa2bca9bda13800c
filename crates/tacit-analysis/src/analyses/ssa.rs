//! SSA construction
//!
//! Places phi functions at the iterated dominance frontiers of every
//! definition (pruned by liveness at the phi site), then renames
//! variables into SSA versions along the dominator tree. Versions are
//! expressed as derived variables: version 0 keeps the original name,
//! later versions append `_n`.

use crate::cfg::{
    compute_dominance_frontier, compute_dominators, CfgNodeId, ControlFlowGraph,
};
use crate::ir::{Instruction, InstructionKind, MethodBody, Variable};
use crate::util::MultiMap;
use rustc_hash::{FxHashMap, FxHashSet};

use super::live_variables::LiveVariablesAnalysis;

/// Rewrite `graph` into pruned SSA form.
pub fn construct_ssa(graph: &mut ControlFlowGraph, body: &MethodBody) {
    graph.compute_orders();
    compute_dominators(graph);
    compute_dominance_frontier(graph);

    let liveness = LiveVariablesAnalysis::run(graph);

    // Definition sites per variable; parameters count as defined at the
    // entry.
    let mut definition_sites: MultiMap<Variable, CfgNodeId> = MultiMap::new();
    for parameter in &body.parameters {
        definition_sites.insert(parameter.clone(), CfgNodeId::ENTRY);
    }
    for node in graph.nodes() {
        for instruction in &node.instructions {
            if let Some(defined) = instruction.kind.result() {
                definition_sites.insert(defined.clone(), node.id);
            }
        }
    }

    place_phi_functions(graph, &definition_sites, &liveness);
    rename_variables(graph, body);
}

/// Insert `v = phi(v, ..., v)` at the head of every node in the iterated
/// dominance frontier of v's definitions, skipping nodes where v is dead.
fn place_phi_functions(
    graph: &mut ControlFlowGraph,
    definition_sites: &MultiMap<Variable, CfgNodeId>,
    liveness: &crate::dataflow::DataFlowResult<FxHashSet<Variable>>,
) {
    let variables: Vec<Variable> = definition_sites.keys().cloned().collect();
    for variable in variables {
        let mut worklist: Vec<CfgNodeId> = definition_sites
            .values_of(&variable)
            .copied()
            .collect();
        let mut has_definition: FxHashSet<CfgNodeId> = worklist.iter().copied().collect();
        let mut has_phi: FxHashSet<CfgNodeId> = FxHashSet::default();

        while let Some(node) = worklist.pop() {
            let frontier: Vec<CfgNodeId> = graph
                .node(node)
                .dominance_frontier
                .iter()
                .copied()
                .collect();
            for join in frontier {
                if has_phi.contains(&join) {
                    continue;
                }
                if !LiveVariablesAnalysis::live_in(liveness, join).contains(&variable) {
                    continue;
                }
                let target = graph.node_mut(join);
                let offset = target.start_offset().unwrap_or(0);
                let arguments = vec![variable.clone(); target.predecessors.len()];
                target.instructions.insert(
                    0,
                    Instruction::new(
                        offset,
                        InstructionKind::Phi {
                            result: variable.clone(),
                            arguments,
                        },
                    ),
                );
                has_phi.insert(join);
                if has_definition.insert(join) {
                    worklist.push(join);
                }
            }
        }
    }
}

struct Renamer {
    counters: FxHashMap<String, u32>,
    stacks: FxHashMap<String, Vec<Variable>>,
    /// Original variable of each phi, keyed by (node, instruction
    /// index); phi results are renamed but their operands must keep
    /// resolving against the original name.
    phi_origins: FxHashMap<(CfgNodeId, usize), Variable>,
}

impl Renamer {
    fn define(&mut self, original: &Variable) -> Variable {
        let name = original.name();
        let counter = self.counters.entry(name.clone()).or_insert(0);
        let version = *counter;
        *counter += 1;
        let renamed = Variable::derived(original.clone(), version);
        self.stacks.entry(name).or_default().push(renamed.clone());
        renamed
    }

    fn current(&self, original: &Variable) -> Option<&Variable> {
        self.stacks.get(&original.name()).and_then(|stack| stack.last())
    }
}

/// Rename definitions and uses along the dominator tree.
fn rename_variables(graph: &mut ControlFlowGraph, body: &MethodBody) {
    let mut renamer = Renamer {
        counters: FxHashMap::default(),
        stacks: FxHashMap::default(),
        phi_origins: FxHashMap::default(),
    };

    // Version 0 of every parameter is live on entry and keeps its name.
    for parameter in &body.parameters {
        renamer.define(parameter);
    }

    for node in graph.nodes() {
        for (index, instruction) in node.instructions.iter().enumerate() {
            if let InstructionKind::Phi { result, .. } = &instruction.kind {
                renamer
                    .phi_origins
                    .insert((node.id, index), result.clone());
            }
        }
    }

    rename_node(graph, CfgNodeId::ENTRY, &mut renamer);
}

fn rename_node(graph: &mut ControlFlowGraph, id: CfgNodeId, renamer: &mut Renamer) {
    let mut pushed: Vec<String> = Vec::new();

    let instruction_count = graph.node(id).instructions.len();
    for index in 0..instruction_count {
        let kind = graph.node(id).instructions[index].kind.clone();
        let is_phi = matches!(kind, InstructionKind::Phi { .. });

        let mut rewritten = kind;
        if !is_phi {
            for used in rewritten.used_variables() {
                if let Some(current) = renamer.current(&used).cloned() {
                    if current.name() != used.name() {
                        rewritten = rewritten.replace_uses(&used, &current);
                    }
                }
            }
        }
        if let Some(defined) = rewritten.result().cloned() {
            let renamed = renamer.define(&defined);
            pushed.push(defined.name());
            rewritten = rewritten.replace_result(&renamed);
        }
        graph.node_mut(id).instructions[index].kind = rewritten;
    }

    // Feed the current versions into the phi operands of successors.
    let successors = graph.node(id).successors.clone();
    for successor in successors {
        let position = graph
            .node(successor)
            .predecessors
            .iter()
            .position(|&pred| pred == id);
        let Some(position) = position else { continue };

        let phi_count = graph.node(successor).instructions.len();
        for index in 0..phi_count {
            let Some(original) = renamer.phi_origins.get(&(successor, index)).cloned() else {
                continue;
            };
            if let Some(current) = renamer.current(&original).cloned() {
                if let InstructionKind::Phi { arguments, .. } =
                    &mut graph.node_mut(successor).instructions[index].kind
                {
                    arguments[position] = current;
                }
            }
        }
    }

    let children = graph.node(id).immediate_dominated.clone();
    for child in children {
        rename_node(graph, child, renamer);
    }

    for name in pushed.iter().rev() {
        if let Some(stack) = renamer.stacks.get_mut(name) {
            stack.pop();
        }
    }
}
