//! Dominator computation and dominance frontiers
//!
//! The standard iterative set-intersection algorithm over the forward
//! topological order, with dominator sets stored as [`Subset`] bit
//! vectors over the node arena.

use super::node::{CfgNodeId, ControlFlowGraph};
use crate::util::Subset;

/// Dominator sets for one graph, indexed by node id. Unreachable nodes
/// carry no set.
#[derive(Debug, Clone)]
pub struct Dominators {
    sets: Vec<Option<Subset>>,
}

impl Dominators {
    /// Whether `a` dominates `b`. Unreachable nodes dominate nothing and
    /// are dominated by nothing.
    pub fn dominates(&self, a: CfgNodeId, b: CfgNodeId) -> bool {
        self.sets[b.index()]
            .as_ref()
            .is_some_and(|set| set.contains(a.index()))
    }

    /// The dominators of `n`, if `n` is reachable.
    pub fn dominators_of(&self, n: CfgNodeId) -> Option<impl Iterator<Item = CfgNodeId> + '_> {
        self.sets[n.index()]
            .as_ref()
            .map(|set| set.iter().map(|index| CfgNodeId(index as u32)))
    }
}

/// Compute dominator sets and immediate dominators.
///
/// Writes `immediate_dominator` and `immediate_dominated` into the nodes
/// and returns the full sets for back-edge detection. Expects
/// [`ControlFlowGraph::compute_orders`] to have run.
pub fn compute_dominators(graph: &mut ControlFlowGraph) -> Dominators {
    let node_count = graph.node_count();
    let order = graph.forward_order();

    // Dom(entry) = {entry}; every other reachable node starts full.
    let mut sets: Vec<Option<Subset>> = vec![None; node_count];
    for &id in &order {
        sets[id.index()] = Some(if id == CfgNodeId::ENTRY {
            let mut set = Subset::empty(node_count);
            set.insert(id.index());
            set
        } else {
            Subset::full(node_count)
        });
    }

    let mut changed = true;
    while changed {
        changed = false;
        for &id in &order {
            if id == CfgNodeId::ENTRY {
                continue;
            }
            let mut new_set = Subset::full(node_count);
            let mut any_pred = false;
            for &pred in graph.predecessors(id) {
                if let Some(pred_set) = &sets[pred.index()] {
                    new_set.intersect_with(pred_set);
                    any_pred = true;
                }
            }
            if !any_pred {
                new_set = Subset::empty(node_count);
            }
            new_set.insert(id.index());

            if sets[id.index()].as_ref() != Some(&new_set) {
                sets[id.index()] = Some(new_set);
                changed = true;
            }
        }
    }

    // Immediate dominator: the dominator other than the node itself with
    // the maximum forward index.
    for id in graph.node_ids().collect::<Vec<_>>() {
        graph.node_mut(id).immediate_dominator = None;
        graph.node_mut(id).immediate_dominated.clear();
    }
    for &id in &order {
        if id == CfgNodeId::ENTRY {
            continue;
        }
        let set = sets[id.index()].as_ref().unwrap();
        let idom = set
            .iter()
            .map(|index| CfgNodeId(index as u32))
            .filter(|&dominator| dominator != id)
            .max_by_key(|&dominator| graph.node(dominator).forward_index);
        graph.node_mut(id).immediate_dominator = idom;
        if let Some(idom) = idom {
            graph.node_mut(idom).immediate_dominated.push(id);
        }
    }

    Dominators { sets }
}

/// Compute dominance frontiers into the nodes. Expects
/// [`compute_dominators`] to have run.
pub fn compute_dominance_frontier(graph: &mut ControlFlowGraph) {
    for id in graph.node_ids().collect::<Vec<_>>() {
        graph.node_mut(id).dominance_frontier.clear();
    }

    for id in graph.node_ids().collect::<Vec<_>>() {
        if graph.node(id).forward_index.is_none() {
            continue;
        }
        let predecessors = graph.predecessors(id).to_vec();
        if predecessors.len() < 2 {
            continue;
        }
        let idom = graph.node(id).immediate_dominator;

        // Walk upward from each predecessor; every node strictly below
        // idom(n) has n just outside its dominated subtree.
        for pred in predecessors {
            if graph.node(pred).forward_index.is_none() {
                continue;
            }
            let mut runner = Some(pred);
            while let Some(current) = runner {
                if Some(current) == idom {
                    break;
                }
                graph.node_mut(current).dominance_frontier.insert(id);
                runner = graph.node(current).immediate_dominator;
            }
        }
    }
}
