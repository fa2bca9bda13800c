//! End-to-end points-to scenarios over small method bodies.

use pretty_assertions::assert_eq;
use tacit_analysis::analyses::PointsToAnalysis;
use tacit_analysis::cfg::{CfgBuilder, CfgMode};
use tacit_analysis::ir::{
    BodyBuilder, CallKind, Constant, InstructionKind, MethodBody, Value, Variable,
};
use tacit_analysis::ptg::{PtgId, PtgNodeKind};
use tacit_analysis::PointsToResult;
use tacit_il::{
    FieldDefinition, FieldRef, IlType, MethodRef, TableResolver, TypeDefinition, TypeRef,
};

fn node_ty() -> IlType {
    IlType::named("Node")
}

fn next_field() -> FieldRef {
    FieldRef::instance(TypeRef::new("Node"), "next", node_ty())
}

fn var(name: &str) -> Variable {
    Variable::local(name, node_ty())
}

fn bool_var(name: &str) -> Variable {
    Variable::local(name, IlType::named("System.Boolean"))
}

fn resolver() -> TableResolver {
    let mut resolver = TableResolver::new();
    resolver.register_type(TypeDefinition::class(TypeRef::new("Node")));
    resolver.register_type(TypeDefinition::class(TypeRef::new("A")));
    resolver.register_type(TypeDefinition::class(TypeRef::new("B")));
    resolver.register_type(TypeDefinition::class(TypeRef::new("Cons")));
    resolver.register_type(TypeDefinition::class(TypeRef::new("Action")).delegate());
    resolver.register_field(FieldDefinition {
        reference: next_field(),
    });
    resolver
}

fn analyze(body: &MethodBody) -> PointsToResult {
    let graph = CfgBuilder::new(CfgMode::Normal).build(body).unwrap();
    let resolver = resolver();
    PointsToAnalysis::new(body, &resolver).run(&graph)
}

fn test_method() -> MethodRef {
    MethodRef::static_method(TypeRef::new("C"), "M", IlType::named("System.Void"))
}

#[test]
fn allocation_flows_through_copies_and_field_loads() {
    // p = new Node; q = p; r = q.next
    let mut builder = BodyBuilder::new(test_method());
    builder.push(InstructionKind::CreateObject {
        result: var("p"),
        allocation_type: node_ty(),
    });
    builder.push(InstructionKind::Load {
        result: var("q"),
        operand: Value::Variable(var("p")),
    });
    builder.push(InstructionKind::Load {
        result: var("r"),
        operand: Value::InstanceField {
            instance: var("q"),
            field: next_field(),
        },
    });
    builder.push(InstructionKind::Return { operand: None });
    let body = builder.build();

    let result = analyze(&body);
    let exit = result.exit_graph().unwrap();

    let p_targets = exit.get_targets(&var("p"));
    assert_eq!(p_targets.len(), 1);
    assert_eq!(p_targets, exit.get_targets(&var("q")));

    let allocation = exit.node(*p_targets.iter().next().unwrap());
    assert_eq!(allocation.kind, PtgNodeKind::Object);
    assert_eq!(allocation.id, PtgId::at_offset(test_method(), 0));

    // The allocation never escapes and nothing was stored in its field,
    // so the load finds nothing.
    assert!(exit.get_targets(&var("r")).is_empty());
    assert!(!allocation.targets.contains_key(&next_field()));
}

#[test]
fn null_store_is_displaced_by_real_store() {
    // p = new Node; t = null; p.next = t; q = new Node; p.next = q
    let mut builder = BodyBuilder::new(test_method());
    builder.push(InstructionKind::CreateObject {
        result: var("p"),
        allocation_type: node_ty(),
    });
    builder.push(InstructionKind::Load {
        result: var("t"),
        operand: Value::Constant(Constant::null(node_ty())),
    });
    builder.push(InstructionKind::Store {
        target: Value::InstanceField {
            instance: var("p"),
            field: next_field(),
        },
        operand: var("t"),
    });
    builder.push(InstructionKind::CreateObject {
        result: var("q"),
        allocation_type: node_ty(),
    });
    builder.push(InstructionKind::Store {
        target: Value::InstanceField {
            instance: var("p"),
            field: next_field(),
        },
        operand: var("q"),
    });
    builder.push(InstructionKind::Return { operand: None });
    let body = builder.build();

    let result = analyze(&body);
    let exit = result.exit_graph().unwrap();

    let p_node = *exit.get_targets(&var("p")).iter().next().unwrap();
    let q_node = *exit.get_targets(&var("q")).iter().next().unwrap();
    let next_targets = &exit.node(p_node).targets[&next_field()];
    assert_eq!(next_targets.len(), 1);
    assert!(next_targets.contains(&q_node));
}

#[test]
fn branch_join_merges_allocation_sites() {
    // if c goto L_0003; p = new A; goto L_0004; (L_0003) p = new B;
    // (L_0004) q = p
    let mut builder = BodyBuilder::new(test_method());
    builder.push(InstructionKind::ConditionalBranch {
        operand: bool_var("c"),
        target: "L_0003".into(),
    });
    builder.push(InstructionKind::CreateObject {
        result: var("p"),
        allocation_type: IlType::named("A"),
    });
    builder.push(InstructionKind::UnconditionalBranch {
        target: "L_0004".into(),
    });
    builder.push(InstructionKind::CreateObject {
        result: var("p"),
        allocation_type: IlType::named("B"),
    });
    builder.push(InstructionKind::Load {
        result: var("q"),
        operand: Value::Variable(var("p")),
    });
    builder.push(InstructionKind::Return { operand: None });
    let body = builder.build();

    let result = analyze(&body);
    let exit = result.exit_graph().unwrap();

    let q_targets = exit.get_targets(&var("q"));
    assert_eq!(q_targets.len(), 2);
    let types: Vec<IlType> = q_targets
        .iter()
        .map(|&handle| exit.node(handle).ty.clone())
        .collect();
    assert!(types.contains(&IlType::named("A")));
    assert!(types.contains(&IlType::named("B")));
}

#[test]
fn delegate_construction_binds_receiver() {
    // d = &C::Hook; e.ctor-style call: Action::.ctor(e, obj, d)
    let hook = MethodRef::static_method(TypeRef::new("C"), "Hook", IlType::named("System.Void"));
    let ctor = MethodRef::instance(TypeRef::new("Action"), ".ctor", IlType::named("System.Void"));

    let obj = Variable::parameter("obj", node_ty());
    let action_ty = IlType::named("Action");
    let d = Variable::local("d", action_ty.clone());
    let e = Variable::local("e", action_ty);

    let mut builder = BodyBuilder::new(test_method()).parameter(obj.clone());
    builder.push(InstructionKind::Load {
        result: d.clone(),
        operand: Value::StaticMethodRef {
            method: hook.clone(),
        },
    });
    builder.push(InstructionKind::Call {
        result: None,
        kind: CallKind::Static,
        method: ctor,
        arguments: vec![e.clone(), obj.clone(), d.clone()],
    });
    builder.push(InstructionKind::Return { operand: None });
    let body = builder.build();

    let result = analyze(&body);
    let exit = result.exit_graph().unwrap();

    let e_targets = exit.get_targets(&e);
    assert_eq!(e_targets.len(), 1);
    let delegate = exit.node(*e_targets.iter().next().unwrap());
    match &delegate.kind {
        PtgNodeKind::Delegate { method, instance } => {
            assert_eq!(method, &hook);
            assert_eq!(instance.as_ref(), Some(&obj));
        }
        other => panic!("expected a delegate node, got {other:?}"),
    }
}

#[test]
fn loop_reaches_fixpoint_with_one_allocation_site() {
    // while (c) { t = new Cons; head.next = t }
    let head = Variable::parameter("head", node_ty());
    let cons = IlType::named("Cons");

    let mut builder = BodyBuilder::new(test_method()).parameter(head.clone());
    builder.push(InstructionKind::ConditionalBranch {
        operand: bool_var("c"),
        target: "L_0004".into(),
    });
    builder.push(InstructionKind::CreateObject {
        result: Variable::local("t", cons.clone()),
        allocation_type: cons.clone(),
    });
    builder.push(InstructionKind::Store {
        target: Value::InstanceField {
            instance: head.clone(),
            field: next_field(),
        },
        operand: Variable::local("t", cons),
    });
    builder.push(InstructionKind::UnconditionalBranch {
        target: "L_0000".into(),
    });
    builder.push(InstructionKind::Return { operand: None });
    let body = builder.build();

    // The worklist terminates (allocation-site abstraction collapses all
    // iterations into one node) ...
    let result = analyze(&body);
    let exit = result.exit_graph().unwrap();

    // ... and head.next points at exactly that one site.
    let head_node = *exit.get_targets(&head).iter().next().unwrap();
    let next_targets = &exit.node(head_node).targets[&next_field()];
    assert_eq!(next_targets.len(), 1);
    let allocation = exit.node(*next_targets.iter().next().unwrap());
    assert_eq!(allocation.id, PtgId::at_offset(test_method(), 1));
}

#[test]
fn monotonicity_growing_input_grows_output() {
    // Same body analyzed from a larger entry graph cannot lose facts:
    // check exit targets of the allocation survive when a branch adds
    // more flow.
    let mut builder = BodyBuilder::new(test_method());
    builder.push(InstructionKind::CreateObject {
        result: var("p"),
        allocation_type: node_ty(),
    });
    builder.push(InstructionKind::Return { operand: None });
    let body = builder.build();

    let result = analyze(&body);
    let exit = result.exit_graph().unwrap();

    // Union with a larger graph and re-check containment of the smaller.
    let mut larger = exit.clone();
    let extra = larger.get_or_insert_node(
        PtgId::at_offset(test_method(), 99),
        node_ty(),
        PtgNodeKind::Object,
    );
    larger.points_to(var("z"), extra);

    let mut union = exit.clone();
    union.union(&larger);
    assert!(union.graph_equals(&larger));
}
