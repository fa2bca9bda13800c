//! Type inference
//!
//! Forward dataflow over per-variable type maps: every definition
//! publishes the most specific type it can see, and joins widen to the
//! least common supertype the resolver knows about. An apply step writes
//! the inferred types back into the instructions, relying on the IR's
//! by-name variable equality.

use crate::cfg::{CfgNode, ControlFlowGraph};
use crate::dataflow::ForwardDataFlowAnalysis;
use crate::ir::{InstructionKind, Value, Variable};
use rustc_hash::{FxHashMap, FxHashSet};
use tacit_il::{IlType, TypeResolver};

/// Forward type inference over a CFG.
pub struct TypeInferenceAnalysis<'a> {
    resolver: &'a dyn TypeResolver,
}

impl<'a> TypeInferenceAnalysis<'a> {
    /// Create an inference pass using the given resolver for supertype
    /// queries.
    pub fn new(resolver: &'a dyn TypeResolver) -> Self {
        Self { resolver }
    }

    /// Run to a fixed point and fold every node's output into one map.
    pub fn infer(&mut self, graph: &ControlFlowGraph) -> FxHashMap<Variable, IlType> {
        let result = self.analyze(graph);
        let mut types: FxHashMap<Variable, IlType> = FxHashMap::default();
        for id in graph.node_ids() {
            if let Some(output) = result.output_of(id) {
                for (variable, ty) in output {
                    let merged = match types.get(variable) {
                        Some(existing) => self.least_common_supertype(existing, ty),
                        None => ty.clone(),
                    };
                    types.insert(variable.clone(), merged);
                }
            }
        }
        types
    }

    /// Run inference and rewrite the graph's instructions so every local
    /// and temporary carries its inferred type.
    pub fn apply(&mut self, graph: &mut ControlFlowGraph) {
        let types = self.infer(graph);
        for (variable, ty) in &types {
            let Some(updated) = retyped(variable, ty) else {
                continue;
            };
            if updated.ty() == variable.ty() {
                continue;
            }
            for id in graph.node_ids().collect::<Vec<_>>() {
                let node = graph.node_mut(id);
                for instruction in &mut node.instructions {
                    let mut kind = instruction.kind.replace_uses(variable, &updated);
                    if kind.result() == Some(variable) {
                        kind = kind.replace_result(&updated);
                    }
                    instruction.kind = kind;
                }
            }
        }
    }

    /// The most specific type both sides agree on: equal types join to
    /// themselves, named types join to their nearest shared ancestor,
    /// everything else widens to unknown.
    fn least_common_supertype(&self, a: &IlType, b: &IlType) -> IlType {
        if a == b {
            return a.clone();
        }
        let (Some(ref_a), Some(ref_b)) = (a.as_named(), b.as_named()) else {
            return IlType::Unknown;
        };

        let mut ancestors = FxHashSet::default();
        let mut cursor = Some(ref_a.clone());
        while let Some(current) = cursor {
            if !ancestors.insert(current.clone()) {
                break;
            }
            cursor = self
                .resolver
                .resolve_type(&current)
                .and_then(|definition| definition.base_type);
        }

        let mut cursor = Some(ref_b.clone());
        let mut seen = FxHashSet::default();
        while let Some(current) = cursor {
            if ancestors.contains(&current) {
                return IlType::Named(current);
            }
            if !seen.insert(current.clone()) {
                break;
            }
            cursor = self
                .resolver
                .resolve_type(&current)
                .and_then(|definition| definition.base_type);
        }
        IlType::Unknown
    }

    /// The type an instruction publishes for its result.
    fn result_type(
        &self,
        kind: &InstructionKind,
        state: &FxHashMap<Variable, IlType>,
    ) -> Option<IlType> {
        let ty = match kind {
            InstructionKind::Load { operand, .. } => match operand {
                Value::Variable(source) => state
                    .get(source)
                    .cloned()
                    .unwrap_or_else(|| source.ty().clone()),
                other => other.ty(),
            },
            InstructionKind::Binary { left, .. } => state
                .get(left)
                .cloned()
                .unwrap_or_else(|| left.ty().clone()),
            InstructionKind::Unary { operand, .. } => state
                .get(operand)
                .cloned()
                .unwrap_or_else(|| operand.ty().clone()),
            InstructionKind::CreateObject {
                allocation_type, ..
            } => allocation_type.clone(),
            InstructionKind::CreateArray { element_type, .. } => {
                IlType::array(element_type.clone())
            }
            InstructionKind::Convert {
                conversion_type, ..
            } => conversion_type.clone(),
            InstructionKind::Call { method, .. } => method.return_type.clone(),
            InstructionKind::Phi { arguments, .. } => {
                let mut merged: Option<IlType> = None;
                for argument in arguments {
                    let ty = state
                        .get(argument)
                        .cloned()
                        .unwrap_or_else(|| argument.ty().clone());
                    merged = Some(match merged {
                        None => ty,
                        Some(existing) => self.least_common_supertype(&existing, &ty),
                    });
                }
                merged.unwrap_or(IlType::Unknown)
            }
            InstructionKind::CatchStart { exception_type, .. } => exception_type.clone(),
            _ => return None,
        };
        Some(ty)
    }
}

/// A same-named, same-variant variable carrying the inferred type.
/// Derived variables share their origin's type and are left alone.
fn retyped(variable: &Variable, ty: &IlType) -> Option<Variable> {
    match variable {
        Variable::Local {
            name,
            is_parameter,
            ..
        } => Some(Variable::Local {
            name: name.clone(),
            ty: ty.clone(),
            is_parameter: *is_parameter,
        }),
        Variable::Temporal { base, index, .. } => Some(Variable::Temporal {
            base: base.clone(),
            index: *index,
            ty: ty.clone(),
        }),
        Variable::Derived { .. } => None,
    }
}

impl ForwardDataFlowAnalysis for TypeInferenceAnalysis<'_> {
    type Domain = FxHashMap<Variable, IlType>;

    fn initial_value(
        &mut self,
        _graph: &ControlFlowGraph,
        _node: &CfgNode,
    ) -> FxHashMap<Variable, IlType> {
        FxHashMap::default()
    }

    fn compare(
        &self,
        a: &FxHashMap<Variable, IlType>,
        b: &FxHashMap<Variable, IlType>,
    ) -> bool {
        a == b
    }

    fn join(
        &self,
        a: &FxHashMap<Variable, IlType>,
        b: &FxHashMap<Variable, IlType>,
    ) -> FxHashMap<Variable, IlType> {
        let mut joined = a.clone();
        for (variable, ty) in b {
            let merged = match joined.get(variable) {
                Some(existing) => self.least_common_supertype(existing, ty),
                None => ty.clone(),
            };
            joined.insert(variable.clone(), merged);
        }
        joined
    }

    fn flow(
        &mut self,
        _graph: &ControlFlowGraph,
        node: &CfgNode,
        input: &FxHashMap<Variable, IlType>,
    ) -> FxHashMap<Variable, IlType> {
        let mut state = input.clone();
        for instruction in &node.instructions {
            if let (Some(result), Some(ty)) = (
                instruction.kind.result(),
                self.result_type(&instruction.kind, &state),
            ) {
                state.insert(result.clone(), ty);
            }
        }
        state
    }
}
