//! End-to-end CFG scenarios: exception edges, graph invariants, loops.

use rustc_hash::FxHashSet;
use tacit_analysis::cfg::{
    compute_dominance_frontier, compute_dominators, find_natural_loops, CfgBuilder, CfgMode,
    CfgNodeId, ControlFlowGraph, RegionKind,
};
use tacit_analysis::ir::{BodyBuilder, InstructionKind, MethodBody, Variable};
use tacit_analysis::util::visitor::reachable_from;
use tacit_il::{Handler, IlType, MethodRef, ProtectedBlock, TypeRef};

fn test_method() -> MethodRef {
    MethodRef::static_method(TypeRef::new("C"), "M", IlType::named("System.Void"))
}

fn bool_var(name: &str) -> Variable {
    Variable::local(name, IlType::named("System.Boolean"))
}

/// try { throw e } catch { return }
fn try_catch_body() -> MethodBody {
    let mut builder = BodyBuilder::new(test_method());
    builder.push(InstructionKind::TryStart);
    builder.push(InstructionKind::Throw {
        operand: Some(Variable::local("e", IlType::named("System.Exception"))),
    });
    builder.push(InstructionKind::CatchStart {
        result: Variable::local("ex", IlType::named("System.Exception")),
        exception_type: IlType::named("System.Exception"),
    });
    builder.push(InstructionKind::Return { operand: None });
    let mut body = builder.build();
    body.exceptions.add(ProtectedBlock {
        start: "L_0000".into(),
        end: "L_0002".into(),
        handler_start: "L_0002".into(),
        handler_end: "L_0004".into(),
        handler: Handler::Catch {
            exception_type: IlType::named("System.Exception"),
        },
    });
    body
}

#[test]
fn exceptional_cfg_routes_throw_to_handler() {
    let body = try_catch_body();
    let graph = CfgBuilder::new(CfgMode::Exceptional).build(&body).unwrap();

    let handler = graph
        .regions()
        .find(|region| matches!(region.kind, RegionKind::Handler { .. }))
        .expect("handler region");
    let protected = graph
        .regions()
        .find(|region| matches!(region.kind, RegionKind::Protected { .. }))
        .expect("protected region");

    // The throwing block has edges to both the exceptional exit and the
    // handler's header.
    for &node in &protected.nodes {
        assert!(graph.successors(node).contains(&handler.header));
    }
    let thrower = *protected.nodes.iter().next().unwrap();
    assert!(graph
        .successors(thrower)
        .contains(&CfgNodeId::EXCEPTIONAL_EXIT));
}

#[test]
fn normal_cfg_excises_handler_and_routes_to_exit() {
    let body = try_catch_body();
    let graph = CfgBuilder::new(CfgMode::Normal).build(&body).unwrap();

    assert_eq!(graph.regions().count(), 0);
    for block in graph.basic_blocks() {
        for instruction in &block.instructions {
            assert!(!matches!(
                instruction.kind,
                InstructionKind::CatchStart { .. }
            ));
        }
        // Every surviving block flows to the normal exit.
        let reaches_exit = reachable_from(block.id, |id: CfgNodeId| {
            graph.successors(id).to_vec()
        })
        .contains(&CfgNodeId::EXIT);
        assert!(reaches_exit);
    }
}

/// Structural invariants every graph keeps.
fn check_graph_invariants(graph: &ControlFlowGraph) {
    // Regions only contain graph nodes.
    let all_ids: FxHashSet<CfgNodeId> = graph.node_ids().collect();
    for region in graph.regions() {
        assert!(region.nodes.is_subset(&all_ids));
        assert!(region.nodes.contains(&region.header));
    }

    // Every node reachable from the entry reaches the exit.
    let from_entry = reachable_from(CfgNodeId::ENTRY, |id: CfgNodeId| {
        graph.successors(id).to_vec()
    });
    for &id in &from_entry {
        let onward = reachable_from(id, |id: CfgNodeId| graph.successors(id).to_vec());
        assert!(
            onward.contains(&CfgNodeId::EXIT),
            "{id} cannot reach the exit"
        );
    }
}

#[test]
fn invariants_hold_for_loop_and_exception_graphs() {
    let body = try_catch_body();
    let graph = CfgBuilder::new(CfgMode::Exceptional).build(&body).unwrap();
    check_graph_invariants(&graph);

    // while (c) { nop }
    let mut builder = BodyBuilder::new(test_method());
    builder.push(InstructionKind::ConditionalBranch {
        operand: bool_var("c"),
        target: "L_0003".into(),
    });
    builder.push(InstructionKind::Nop);
    builder.push(InstructionKind::UnconditionalBranch {
        target: "L_0000".into(),
    });
    builder.push(InstructionKind::Return { operand: None });
    let body = builder.build();
    let graph = CfgBuilder::new(CfgMode::Normal).build(&body).unwrap();
    check_graph_invariants(&graph);
}

#[test]
fn dominators_and_loops_over_built_graph() {
    // while (c) { nop }: the loop's header dominates its body.
    let mut builder = BodyBuilder::new(test_method());
    builder.push(InstructionKind::ConditionalBranch {
        operand: bool_var("c"),
        target: "L_0003".into(),
    });
    builder.push(InstructionKind::Nop);
    builder.push(InstructionKind::UnconditionalBranch {
        target: "L_0000".into(),
    });
    builder.push(InstructionKind::Return { operand: None });
    let body = builder.build();

    let mut graph = CfgBuilder::new(CfgMode::Normal).build(&body).unwrap();
    let dominators = compute_dominators(&mut graph);
    compute_dominance_frontier(&mut graph);
    find_natural_loops(&mut graph, &dominators);

    // Entry dominates every reachable node, and every node dominates
    // itself.
    for id in graph.forward_order() {
        assert!(dominators.dominates(CfgNodeId::ENTRY, id));
        assert!(dominators.dominates(id, id));
    }

    let natural_loop = graph
        .regions()
        .find(|region| region.kind == RegionKind::Loop)
        .expect("loop region");
    for &node in &natural_loop.nodes {
        assert!(dominators.dominates(natural_loop.header, node));
    }
}
