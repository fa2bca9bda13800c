//! Points-to analysis
//!
//! A forward monotone analysis whose lattice is the points-to graph:
//! join is graph union, equality is structural graph equality, and the
//! transfer function interprets each TAC instruction against the heap
//! abstraction. Field-sensitive for instance fields, allocation-site
//! abstracted, may-semantics throughout (no strong updates).

use crate::cfg::{CfgNode, CfgNodeId, CfgNodeKind, ControlFlowGraph};
use crate::dataflow::{DataFlowResult, ForwardDataFlowAnalysis};
use crate::error::AnalysisWarning;
use crate::ir::{CallKind, Instruction, InstructionKind, MethodBody, Value, Variable};
use crate::ptg::{PointsToGraph, PtgId, PtgNodeId, PtgNodeKind};
use rustc_hash::FxHashSet;
use tacit_il::{FieldRef, IlType, MethodRef, TypeRef, TypeResolver};

/// The fixpoint of a points-to run, plus the warnings it accumulated.
#[derive(Debug)]
pub struct PointsToResult {
    /// Per-node input/output graphs.
    pub dataflow: DataFlowResult<PointsToGraph>,
    /// Unresolved references observed along the way. A non-empty list
    /// marks the result as partial.
    pub warnings: Vec<AnalysisWarning>,
}

impl PointsToResult {
    /// The graph at the method's exit.
    pub fn exit_graph(&self) -> Option<&PointsToGraph> {
        self.dataflow.output_of(CfgNodeId::EXIT)
    }

    /// Whether any reference failed to resolve along the way.
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Field-sensitive, allocation-site points-to analysis for one method.
pub struct PointsToAnalysis<'a> {
    method: MethodRef,
    parameters: Vec<Variable>,
    resolver: &'a dyn TypeResolver,
    warnings: FxHashSet<AnalysisWarning>,
}

impl<'a> PointsToAnalysis<'a> {
    /// Create an analysis for the given body.
    pub fn new(body: &MethodBody, resolver: &'a dyn TypeResolver) -> Self {
        Self {
            method: body.method.clone(),
            parameters: body.parameters.clone(),
            resolver,
            warnings: FxHashSet::default(),
        }
    }

    /// Run to a fixed point over `graph`.
    pub fn run(mut self, graph: &ControlFlowGraph) -> PointsToResult {
        let dataflow = self.analyze(graph);
        let mut warnings: Vec<AnalysisWarning> = self.warnings.into_iter().collect();
        warnings.sort_by_key(|warning| warning.to_string());
        PointsToResult { dataflow, warnings }
    }

    fn is_value(&self, ty: &IlType) -> bool {
        self.resolver.is_value_type(ty)
    }

    /// The graph every method starts from: null, an object node for
    /// `this` (it exists and is non-null), and a parameter node for every
    /// other reference-typed parameter.
    fn initial_graph(&mut self) -> PointsToGraph {
        let mut graph = PointsToGraph::new();
        for (index, parameter) in self.parameters.iter().enumerate() {
            if self.is_value(parameter.ty()) {
                continue;
            }
            let receiver = !self.method.is_static && index == 0;
            let kind = if receiver {
                PtgNodeKind::Object
            } else {
                PtgNodeKind::Parameter(parameter.name())
            };
            let node = graph.get_or_insert_node(
                PtgId::parameter(self.method.clone(), index),
                parameter.ty().clone(),
                kind,
            );
            graph.points_to(parameter.clone(), node);
        }
        graph
    }

    fn transfer(&mut self, graph: &mut PointsToGraph, instruction: &Instruction) {
        let offset = instruction.offset;
        match &instruction.kind {
            InstructionKind::Load { result, operand } => {
                self.transfer_load(graph, offset, result, operand)
            }
            InstructionKind::Store { target, operand } => {
                self.transfer_store(graph, target, operand)
            }
            InstructionKind::CreateObject {
                result,
                allocation_type,
            } => self.transfer_allocation(graph, offset, result, allocation_type.clone()),
            InstructionKind::CreateArray {
                result,
                element_type,
                ..
            } => self.transfer_allocation(
                graph,
                offset,
                result,
                IlType::array(element_type.clone()),
            ),
            InstructionKind::Convert {
                result, operand, ..
            } => self.transfer_copy(graph, result, operand),
            InstructionKind::Phi { result, arguments } => {
                // Accumulate without clearing: the phi merges its
                // operands' targets.
                if !self.is_value(result.ty()) {
                    let targets: Vec<PtgNodeId> = arguments
                        .iter()
                        .flat_map(|argument| graph.get_targets(argument))
                        .collect();
                    for target in targets {
                        graph.points_to(result.clone(), target);
                    }
                }
            }
            InstructionKind::Return {
                operand: Some(operand),
            } => {
                let result = Variable::result_variable(operand.ty().clone());
                self.transfer_copy(graph, &result, operand);
            }
            InstructionKind::Call {
                result,
                kind,
                method,
                arguments,
            } => self.transfer_call(graph, offset, result.as_ref(), *kind, method, arguments),
            _ => {}
        }
    }

    fn transfer_load(
        &mut self,
        graph: &mut PointsToGraph,
        offset: u32,
        result: &Variable,
        operand: &Value,
    ) {
        if self.is_value(result.ty()) {
            return;
        }
        match operand {
            Value::Constant(constant) if constant.is_null() => {
                graph.remove_edges(result);
                graph.points_to(result.clone(), PtgNodeId::NULL);
            }
            // Non-null literals carry no heap shape.
            Value::Constant(_) => {}
            Value::Variable(source) => self.transfer_copy(graph, result, source),
            Value::InstanceField { instance, field } => {
                self.check_field(field);
                let sources = graph.get_targets(instance);
                self.load_through_field(graph, offset, result, field, &sources, false);
            }
            Value::StaticField { field } => {
                self.check_field(field);
                let global = graph.global_node();
                let mut sources = FxHashSet::default();
                sources.insert(global);
                // Statics are written by the outside world; missing
                // targets always synthesize an unknown.
                self.load_through_field(graph, offset, result, field, &sources, true);
            }
            Value::ArrayElement { array, .. } => {
                let field = element_field(array);
                let sources = graph.get_targets(array);
                self.load_through_field(graph, offset, result, &field, &sources, false);
            }
            Value::Unknown | Value::Dereference { .. } | Value::Reference { .. } => {
                self.bind_unknown(graph, offset, result);
            }
            Value::ArrayLength { .. } => {}
            Value::StaticMethodRef { method } => {
                self.create_delegate(graph, offset, result, method, None)
            }
            Value::VirtualMethodRef { instance, method } => {
                self.create_delegate(graph, offset, result, method, Some(instance.clone()))
            }
        }
    }

    /// `result = *.field` over the given source nodes. When a source node
    /// has no edge on the field yet, and either `always_synthesize` holds
    /// or the node escaped through a parameter, a fresh unknown target is
    /// synthesized at the load offset first.
    fn load_through_field(
        &mut self,
        graph: &mut PointsToGraph,
        offset: u32,
        result: &Variable,
        field: &FieldRef,
        sources: &FxHashSet<PtgNodeId>,
        always_synthesize: bool,
    ) {
        if self.is_value(&field.field_type) {
            return;
        }

        let escaped = if always_synthesize {
            FxHashSet::default()
        } else {
            self.parameter_reachable(graph)
        };
        for &source in sources {
            // Reading a field of null raises at runtime; the null node
            // never grows edges.
            if source == PtgNodeId::NULL {
                continue;
            }
            let missing = !graph.node(source).targets.contains_key(field);
            if missing && (always_synthesize || escaped.contains(&source)) {
                let unknown = graph.get_or_insert_node(
                    PtgId::at_offset(self.method.clone(), offset),
                    field.field_type.clone(),
                    PtgNodeKind::Unknown,
                );
                graph.points_to_field(source, field, unknown);
            }
        }

        graph.remove_edges(result);
        let mut targets = FxHashSet::default();
        for &source in sources {
            if source == PtgNodeId::NULL {
                continue;
            }
            if let Some(set) = graph.node(source).targets.get(field) {
                targets.extend(set.iter().copied());
            }
        }
        for target in targets {
            graph.points_to(result.clone(), target);
        }
    }

    fn transfer_store(&mut self, graph: &mut PointsToGraph, target: &Value, operand: &Variable) {
        if self.is_value(operand.ty()) {
            return;
        }
        match target {
            Value::InstanceField { instance, field } => {
                self.check_field(field);
                let sources = graph.get_targets(instance);
                self.store_through_field(graph, field, &sources, operand);
            }
            Value::StaticField { field } => {
                self.check_field(field);
                let global = graph.global_node();
                let mut sources = FxHashSet::default();
                sources.insert(global);
                self.store_through_field(graph, field, &sources, operand);
            }
            Value::ArrayElement { array, .. } => {
                let field = element_field(array);
                let sources = graph.get_targets(array);
                self.store_through_field(graph, &field, &sources, operand);
            }
            // Stores through raw pointers are outside the abstraction.
            _ => {}
        }
    }

    /// `*.field = operand` over the given receiver nodes. May-semantics:
    /// targets accumulate, except that a lone null edge yields to the
    /// first real target.
    fn store_through_field(
        &mut self,
        graph: &mut PointsToGraph,
        field: &FieldRef,
        sources: &FxHashSet<PtgNodeId>,
        operand: &Variable,
    ) {
        if self.is_value(&field.field_type) {
            return;
        }
        let values = graph.get_targets(operand);
        for &source in sources {
            if source == PtgNodeId::NULL {
                continue;
            }
            for &value in &values {
                graph.points_to_field(source, field, value);
            }
        }
    }

    fn transfer_copy(&mut self, graph: &mut PointsToGraph, result: &Variable, source: &Variable) {
        if self.is_value(result.ty()) || self.is_value(source.ty()) {
            return;
        }
        let targets = graph.get_targets(source);
        graph.remove_edges(result);
        for target in targets {
            graph.points_to(result.clone(), target);
        }
    }

    fn transfer_allocation(
        &mut self,
        graph: &mut PointsToGraph,
        offset: u32,
        result: &Variable,
        allocated: IlType,
    ) {
        if self.is_value(&allocated) {
            return;
        }
        if let Some(reference) = allocated.as_named() {
            if self.resolver.resolve_type(reference).is_none() {
                self.warnings.insert(AnalysisWarning::UnresolvedType {
                    reference: reference.to_string(),
                });
            }
        }
        let node = graph.get_or_insert_node(
            PtgId::at_offset(self.method.clone(), offset),
            allocated,
            PtgNodeKind::Object,
        );
        graph.remove_edges(result);
        graph.points_to(result.clone(), node);
    }

    fn create_delegate(
        &mut self,
        graph: &mut PointsToGraph,
        offset: u32,
        result: &Variable,
        method: &MethodRef,
        instance: Option<Variable>,
    ) {
        let node = graph.get_or_insert_node(
            PtgId::at_offset(self.method.clone(), offset),
            result.ty().clone(),
            PtgNodeKind::Delegate {
                method: method.clone(),
                instance,
            },
        );
        graph.remove_edges(result);
        graph.points_to(result.clone(), node);
    }

    fn bind_unknown(&mut self, graph: &mut PointsToGraph, offset: u32, result: &Variable) {
        let node = graph.get_or_insert_node(
            PtgId::at_offset(self.method.clone(), offset),
            result.ty().clone(),
            PtgNodeKind::Unknown,
        );
        graph.remove_edges(result);
        graph.points_to(result.clone(), node);
    }

    fn transfer_call(
        &mut self,
        graph: &mut PointsToGraph,
        offset: u32,
        result: Option<&Variable>,
        _kind: CallKind,
        method: &MethodRef,
        arguments: &[Variable],
    ) {
        let declaring = IlType::Named(method.declaring_type.clone());
        if method.is_constructor() && self.resolver.is_delegate_type(&declaring) {
            self.construct_delegate(graph, arguments);
            return;
        }

        if self.resolver.resolve_method(method).is_none() {
            self.warnings.insert(AnalysisWarning::UnresolvedMethod {
                reference: method.to_string(),
            });
        }

        let Some(result) = result else { return };
        if self.is_value(result.ty()) {
            return;
        }

        // The callee's effect is unknown: the result becomes a fresh
        // unknown node at the call site. For calls the container
        // heuristic judges pure (getters, collection reads) the unknown
        // also hangs off the receiver, keeping container contents
        // reachable from it.
        graph.remove_edges(result);
        let unknown = graph.get_or_insert_node(
            PtgId::at_offset(self.method.clone(), offset),
            result.ty().clone(),
            PtgNodeKind::Unknown,
        );
        graph.points_to(result.clone(), unknown);

        if self.is_pure_call(method) && !method.is_static {
            if let Some(receiver) = arguments.first() {
                let field = FieldRef::instance(
                    method.declaring_type.clone(),
                    format!("${}", method.name),
                    result.ty().clone(),
                );
                for source in graph.get_targets(receiver) {
                    graph.points_to_field(source, &field, unknown);
                }
            }
        }
    }

    /// `d.ctor(receiver, fp)`: rebind every delegate node reachable from
    /// the function-pointer argument to the actual receiver, and point
    /// the constructed variable at those delegates.
    fn construct_delegate(&mut self, graph: &mut PointsToGraph, arguments: &[Variable]) {
        let [destination, receiver, function_pointer] = arguments else {
            return;
        };
        let delegates: Vec<PtgNodeId> = graph
            .reachable_from(function_pointer)
            .into_iter()
            .filter(|&handle| {
                matches!(graph.node(handle).kind, PtgNodeKind::Delegate { .. })
            })
            .collect();

        for &delegate in &delegates {
            graph.retarget_delegate(delegate, receiver.clone());
        }
        graph.remove_edges(destination);
        for delegate in delegates {
            graph.points_to(destination.clone(), delegate);
        }
    }

    /// Whether a call is judged side-effect free on the heap.
    fn is_pure_call(&self, method: &MethodRef) -> bool {
        let declaring = IlType::Named(method.declaring_type.clone());
        self.resolver.is_container_type(&declaring) || method.name.starts_with("get_")
    }

    /// Nodes reachable from any formal parameter: the heap that escapes
    /// the method through its signature.
    fn parameter_reachable(&self, graph: &PointsToGraph) -> FxHashSet<PtgNodeId> {
        let mut reachable = FxHashSet::default();
        for parameter in &self.parameters {
            reachable.extend(graph.reachable_from(parameter));
        }
        reachable
    }

    fn check_field(&mut self, field: &FieldRef) {
        if self.resolver.resolve_field(field).is_none() {
            self.warnings.insert(AnalysisWarning::UnresolvedField {
                reference: field.to_string(),
            });
        }
    }
}

/// The pseudo-field standing for every element slot of an array; the
/// abstraction is element-index insensitive.
fn element_field(array: &Variable) -> FieldRef {
    let element = array.ty().element().cloned().unwrap_or(IlType::Unknown);
    FieldRef::instance(TypeRef::new("System.Array"), "$elem", element)
}

impl ForwardDataFlowAnalysis for PointsToAnalysis<'_> {
    type Domain = PointsToGraph;

    fn initial_value(&mut self, _graph: &ControlFlowGraph, node: &CfgNode) -> PointsToGraph {
        if node.kind == CfgNodeKind::Entry {
            self.initial_graph()
        } else {
            PointsToGraph::new()
        }
    }

    fn compare(&self, a: &PointsToGraph, b: &PointsToGraph) -> bool {
        a.graph_equals(b)
    }

    fn join(&self, a: &PointsToGraph, b: &PointsToGraph) -> PointsToGraph {
        let mut joined = a.clone();
        joined.union(b);
        joined
    }

    fn flow(
        &mut self,
        _graph: &ControlFlowGraph,
        node: &CfgNode,
        input: &PointsToGraph,
    ) -> PointsToGraph {
        let mut state = input.clone();
        for instruction in &node.instructions {
            self.transfer(&mut state, instruction);
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::{CfgBuilder, CfgMode};
    use crate::ir::{BodyBuilder, Constant};
    use tacit_il::{TableResolver, TypeDefinition};

    fn node_ty() -> IlType {
        IlType::named("Node")
    }

    fn next_field() -> FieldRef {
        FieldRef::instance(TypeRef::new("Node"), "next", node_ty())
    }

    fn resolver() -> TableResolver {
        let mut resolver = TableResolver::new();
        resolver.register_type(TypeDefinition::class(TypeRef::new("Node")));
        resolver.register_type(TypeDefinition::value_type(TypeRef::new("System.Int32")));
        resolver.register_field(tacit_il::FieldDefinition {
            reference: next_field(),
        });
        resolver
    }

    fn var(name: &str) -> Variable {
        Variable::local(name, node_ty())
    }

    fn run(body: &MethodBody, resolver: &TableResolver) -> PointsToResult {
        let cfg = CfgBuilder::new(CfgMode::Normal).build(body).unwrap();
        PointsToAnalysis::new(body, resolver).run(&cfg)
    }

    fn test_method() -> MethodRef {
        MethodRef::static_method(TypeRef::new("C"), "M", IlType::named("System.Void"))
    }

    #[test]
    fn test_null_load() {
        let mut builder = BodyBuilder::new(test_method());
        builder.push(InstructionKind::Load {
            result: var("p"),
            operand: Value::Constant(Constant::null(node_ty())),
        });
        builder.push(InstructionKind::Return { operand: None });
        let body = builder.build();

        let result = run(&body, &resolver());
        let exit = result.exit_graph().unwrap();
        let targets = exit.get_targets(&var("p"));
        assert_eq!(targets.len(), 1);
        assert!(targets.contains(&PtgNodeId::NULL));
        assert!(!result.is_partial());
    }

    #[test]
    fn test_allocation_and_copy() {
        // p = new Node; q = p
        let mut builder = BodyBuilder::new(test_method());
        builder.push(InstructionKind::CreateObject {
            result: var("p"),
            allocation_type: node_ty(),
        });
        builder.push(InstructionKind::Load {
            result: var("q"),
            operand: Value::Variable(var("p")),
        });
        builder.push(InstructionKind::Return { operand: None });
        let body = builder.build();

        let result = run(&body, &resolver());
        let exit = result.exit_graph().unwrap();
        let p_targets = exit.get_targets(&var("p"));
        assert_eq!(p_targets, exit.get_targets(&var("q")));
        assert_eq!(p_targets.len(), 1);

        let node = exit.node(*p_targets.iter().next().unwrap());
        assert_eq!(node.kind, PtgNodeKind::Object);
        assert_eq!(node.id, PtgId::at_offset(test_method(), 0));
    }

    #[test]
    fn test_value_type_copy_is_skipped() {
        let int = Variable::local("i", IlType::named("System.Int32"));
        let mut builder = BodyBuilder::new(test_method());
        builder.push(InstructionKind::Load {
            result: int.clone(),
            operand: Value::Constant(Constant::int(1, IlType::named("System.Int32"))),
        });
        builder.push(InstructionKind::Return { operand: None });
        let body = builder.build();

        let result = run(&body, &resolver());
        let exit = result.exit_graph().unwrap();
        assert!(exit.get_targets(&int).is_empty());
    }

    #[test]
    fn test_field_store_and_load() {
        // p = new Node; p.next = p; q = p.next
        let mut builder = BodyBuilder::new(test_method());
        builder.push(InstructionKind::CreateObject {
            result: var("p"),
            allocation_type: node_ty(),
        });
        builder.push(InstructionKind::Store {
            target: Value::InstanceField {
                instance: var("p"),
                field: next_field(),
            },
            operand: var("p"),
        });
        builder.push(InstructionKind::Load {
            result: var("q"),
            operand: Value::InstanceField {
                instance: var("p"),
                field: next_field(),
            },
        });
        builder.push(InstructionKind::Return { operand: None });
        let body = builder.build();

        let result = run(&body, &resolver());
        let exit = result.exit_graph().unwrap();
        assert_eq!(exit.get_targets(&var("q")), exit.get_targets(&var("p")));
    }

    #[test]
    fn test_field_load_from_parameter_synthesizes_unknown() {
        // r = a.next, where a is a parameter: the callee cannot see the
        // caller's heap, so an unknown placeholder appears.
        let a = Variable::parameter("a", node_ty());
        let mut builder = BodyBuilder::new(test_method()).parameter(a.clone());
        builder.push(InstructionKind::Load {
            result: var("r"),
            operand: Value::InstanceField {
                instance: a.clone(),
                field: next_field(),
            },
        });
        builder.push(InstructionKind::Return { operand: None });
        let body = builder.build();

        let result = run(&body, &resolver());
        let exit = result.exit_graph().unwrap();
        let targets = exit.get_targets(&var("r"));
        assert_eq!(targets.len(), 1);
        let target = exit.node(*targets.iter().next().unwrap());
        assert_eq!(target.kind, PtgNodeKind::Unknown);
    }

    #[test]
    fn test_field_load_from_local_yields_nothing() {
        // r = p.next where p is a fresh local allocation with no stores:
        // nothing escapes, so no unknown is synthesized.
        let mut builder = BodyBuilder::new(test_method());
        builder.push(InstructionKind::CreateObject {
            result: var("p"),
            allocation_type: node_ty(),
        });
        builder.push(InstructionKind::Load {
            result: var("r"),
            operand: Value::InstanceField {
                instance: var("p"),
                field: next_field(),
            },
        });
        builder.push(InstructionKind::Return { operand: None });
        let body = builder.build();

        let result = run(&body, &resolver());
        let exit = result.exit_graph().unwrap();
        assert!(exit.get_targets(&var("r")).is_empty());
    }

    #[test]
    fn test_null_displacement_scenario() {
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

        let result = run(&body, &resolver());
        let exit = result.exit_graph().unwrap();
        let p_node = *exit.get_targets(&var("p")).iter().next().unwrap();
        let next_targets = &exit.node(p_node).targets[&next_field()];
        assert_eq!(next_targets.len(), 1);
        assert!(!next_targets.contains(&PtgNodeId::NULL));
    }

    #[test]
    fn test_unresolved_field_marks_partial() {
        let stray = FieldRef::instance(TypeRef::new("Node"), "stray", node_ty());
        let a = Variable::parameter("a", node_ty());
        let mut builder = BodyBuilder::new(test_method()).parameter(a.clone());
        builder.push(InstructionKind::Load {
            result: var("r"),
            operand: Value::InstanceField {
                instance: a,
                field: stray,
            },
        });
        builder.push(InstructionKind::Return { operand: None });
        let body = builder.build();

        let result = run(&body, &resolver());
        assert!(result.is_partial());
        assert!(matches!(
            result.warnings[0],
            AnalysisWarning::UnresolvedField { .. }
        ));
    }

    #[test]
    fn test_this_parameter_gets_object_node() {
        let this = Variable::parameter("this", node_ty());
        let other = Variable::parameter("other", node_ty());
        let method = MethodRef::instance(TypeRef::new("Node"), "M", IlType::named("System.Void"));
        let mut builder = BodyBuilder::new(method)
            .parameter(this.clone())
            .parameter(other.clone());
        builder.push(InstructionKind::Return { operand: None });
        let body = builder.build();

        let result = run(&body, &resolver());
        let exit = result.exit_graph().unwrap();

        let this_node = exit.node(*exit.get_targets(&this).iter().next().unwrap());
        assert_eq!(this_node.kind, PtgNodeKind::Object);

        let other_node = exit.node(*exit.get_targets(&other).iter().next().unwrap());
        assert_eq!(other_node.kind, PtgNodeKind::Parameter("other".into()));
    }

    #[test]
    fn test_return_routes_to_result_variable() {
        let mut builder = BodyBuilder::new(MethodRef::static_method(
            TypeRef::new("C"),
            "Make",
            node_ty(),
        ));
        builder.push(InstructionKind::CreateObject {
            result: var("p"),
            allocation_type: node_ty(),
        });
        builder.push(InstructionKind::Return {
            operand: Some(var("p")),
        });
        let body = builder.build();

        let result = run(&body, &resolver());
        let exit = result.exit_graph().unwrap();
        let rv = Variable::result_variable(node_ty());
        assert_eq!(exit.get_targets(&rv), exit.get_targets(&var("p")));
    }
}
