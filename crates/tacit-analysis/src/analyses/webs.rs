//! Web analysis
//!
//! Splits each variable into its def-use webs: equivalence classes of
//! definitions connected through shared uses, computed from reaching
//! definitions. Distinct webs become distinct derived variables, which
//! untangles unrelated reuses of one slot before SSA renaming.

use crate::cfg::ControlFlowGraph;
use crate::ir::Variable;
use crate::util::MultiMap;
use rustc_hash::FxHashMap;

use super::reaching_definitions::ReachingDefinitionsAnalysis;

/// Union-find over definition ordinals.
struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, element: usize) -> usize {
        if self.parent[element] != element {
            let root = self.find(self.parent[element]);
            self.parent[element] = root;
        }
        self.parent[element]
    }

    fn union(&mut self, a: usize, b: usize) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            self.parent[root_b] = root_a;
        }
    }
}

/// Split every multi-web variable into per-web derived variables.
/// Returns the number of renamed webs.
pub fn split_webs(graph: &mut ControlFlowGraph) -> usize {
    let (analysis, result) = ReachingDefinitionsAnalysis::run(graph);
    let definition_count = analysis.definitions().len();
    if definition_count == 0 {
        return 0;
    }

    // Definitions that reach a common use belong to one web.
    let mut sets = DisjointSets::new(definition_count);
    for id in graph.node_ids().collect::<Vec<_>>() {
        let Some(input) = result.input_of(id) else { continue };
        let mut state = input.clone();
        for index in 0..graph.node(id).instructions.len() {
            for used in graph.node(id).instructions[index].kind.used_variables() {
                let reaching: Vec<usize> = analysis
                    .definitions_of(&used)
                    .filter(|&ordinal| state.contains(ordinal))
                    .collect();
                for window in reaching.windows(2) {
                    sets.union(window[0], window[1]);
                }
            }
            analysis.step(&mut state, id, index);
        }
    }

    // Group webs per variable; the first keeps the original name, the
    // rest get fresh derived versions.
    let mut webs_of_variable: MultiMap<Variable, usize> = MultiMap::new();
    for ordinal in 0..definition_count {
        let root = sets.find(ordinal);
        let variable = analysis.definitions()[ordinal].variable.clone();
        webs_of_variable.insert(variable, root);
    }

    let mut replacement_of_root: FxHashMap<usize, Variable> = FxHashMap::default();
    let mut renamed_webs = 0;
    for (variable, roots) in webs_of_variable.iter() {
        if roots.len() < 2 {
            continue;
        }
        let mut ordered: Vec<usize> = roots.iter().copied().collect();
        ordered.sort_unstable();
        for (position, &root) in ordered.iter().enumerate().skip(1) {
            replacement_of_root
                .insert(root, Variable::derived(variable.clone(), position as u32));
            renamed_webs += 1;
        }
    }
    if replacement_of_root.is_empty() {
        return 0;
    }

    // Rewrite defs and uses web by web, tracking reaching state with the
    // original definition universe.
    for id in graph.node_ids().collect::<Vec<_>>() {
        let Some(input) = result.input_of(id) else { continue };
        let mut state = input.clone();
        for index in 0..graph.node(id).instructions.len() {
            let kind = graph.node(id).instructions[index].kind.clone();

            let mut rewritten = kind.clone();
            for used in kind.used_variables() {
                let reaching_root = analysis
                    .definitions_of(&used)
                    .find(|&ordinal| state.contains(ordinal))
                    .map(|ordinal| sets.find(ordinal));
                if let Some(root) = reaching_root {
                    if let Some(replacement) = replacement_of_root.get(&root) {
                        rewritten = rewritten.replace_uses(&used, replacement);
                    }
                }
            }
            if let Some(ordinal) = analysis.definition_at(id, index) {
                let root = sets.find(ordinal);
                if let Some(replacement) = replacement_of_root.get(&root) {
                    rewritten = rewritten.replace_result(replacement);
                }
            }

            graph.node_mut(id).instructions[index].kind = rewritten;
            analysis.step(&mut state, id, index);
        }
    }
    renamed_webs
}
