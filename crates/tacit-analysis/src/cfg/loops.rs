//! Natural-loop discovery
//!
//! An edge `s -> t` is a back edge when `t` dominates `s`. Each back edge
//! induces a natural loop: the nodes from which `s` is reachable
//! backwards without passing through `t`, plus the header `t`.

use super::dominance::Dominators;
use super::node::{CfgNodeId, ControlFlowGraph};
use super::region::RegionKind;
use rustc_hash::FxHashSet;

/// Find all natural loops and record them as [`RegionKind::Loop`]
/// regions. One region is created per back edge. Expects
/// [`super::dominance::compute_dominators`] to have run.
pub fn find_natural_loops(graph: &mut ControlFlowGraph, dominators: &Dominators) {
    let mut back_edges: Vec<(CfgNodeId, CfgNodeId)> = Vec::new();
    for node in graph.nodes() {
        for &successor in &node.successors {
            if dominators.dominates(successor, node.id) {
                back_edges.push((node.id, successor));
            }
        }
    }

    for (source, header) in back_edges {
        let body = loop_body(graph, source, header);
        let region = graph.add_region(RegionKind::Loop, header);
        graph.region_mut(region).nodes = body;
    }
}

/// Collect the loop body by reverse DFS from the back edge's source,
/// stopping at the header.
fn loop_body(
    graph: &ControlFlowGraph,
    source: CfgNodeId,
    header: CfgNodeId,
) -> FxHashSet<CfgNodeId> {
    let mut body = FxHashSet::default();
    body.insert(header);

    let mut stack = vec![source];
    while let Some(node) = stack.pop() {
        if body.insert(node) {
            stack.extend(graph.predecessors(node).iter().copied());
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::dominance::compute_dominators;

    #[test]
    fn test_self_loop() {
        let mut graph = ControlFlowGraph::new();
        let a = graph.add_basic_block();
        graph.connect(CfgNodeId::ENTRY, a);
        graph.connect(a, a);
        graph.connect(a, CfgNodeId::NORMAL_EXIT);
        graph.compute_orders();

        let dominators = compute_dominators(&mut graph);
        find_natural_loops(&mut graph, &dominators);

        let looped: Vec<_> = graph
            .regions()
            .filter(|region| region.kind == RegionKind::Loop)
            .collect();
        assert_eq!(looped.len(), 1);
        assert_eq!(looped[0].header, a);
        assert_eq!(looped[0].nodes.len(), 1);
    }

    #[test]
    fn test_while_loop_body() {
        // entry -> head -> {body -> head, exit-block}
        let mut graph = ControlFlowGraph::new();
        let head = graph.add_basic_block();
        let body = graph.add_basic_block();
        let tail = graph.add_basic_block();
        graph.connect(CfgNodeId::ENTRY, head);
        graph.connect(head, body);
        graph.connect(body, head);
        graph.connect(head, tail);
        graph.connect(tail, CfgNodeId::NORMAL_EXIT);
        graph.compute_orders();

        let dominators = compute_dominators(&mut graph);
        find_natural_loops(&mut graph, &dominators);

        let looped: Vec<_> = graph
            .regions()
            .filter(|region| region.kind == RegionKind::Loop)
            .collect();
        assert_eq!(looped.len(), 1);
        assert_eq!(looped[0].header, head);
        assert!(looped[0].contains(head));
        assert!(looped[0].contains(body));
        assert!(!looped[0].contains(tail));
    }

    #[test]
    fn test_no_loops_in_acyclic_graph() {
        let mut graph = ControlFlowGraph::new();
        let a = graph.add_basic_block();
        let b = graph.add_basic_block();
        graph.connect(CfgNodeId::ENTRY, a);
        graph.connect(a, b);
        graph.connect(b, CfgNodeId::NORMAL_EXIT);
        graph.compute_orders();

        let dominators = compute_dominators(&mut graph);
        find_natural_loops(&mut graph, &dominators);
        assert_eq!(
            graph
                .regions()
                .filter(|region| region.kind == RegionKind::Loop)
                .count(),
            0
        );
    }
}
