//! Method inlining
//!
//! Splices a callee's TAC body into a caller at a call site. One label
//! discipline applies throughout: every spliced label (and every renamed
//! callee variable) is prefixed with the caller's call-site label, so
//! `L_0004` of the callee inlined at `L_0010` becomes `L_0010.L_0004`.
//! Spliced instructions keep the call site's offset, which preserves the
//! caller's offset monotonicity.

use crate::error::{AnalysisError, AnalysisResult};
use crate::ir::{Instruction, InstructionKind, Label, MethodBody, Value, Variable};
use rustc_hash::FxHashMap;
use tacit_il::ProtectedBlock;

/// Inline `callee` into `caller` at the call instruction labeled
/// `call_label`.
pub fn inline_call(
    caller: &mut MethodBody,
    call_label: &str,
    callee: &MethodBody,
) -> AnalysisResult<()> {
    let call_index = caller
        .instructions
        .iter()
        .position(|instruction| instruction.label == call_label)
        .ok_or_else(|| AnalysisError::MalformedIr {
            method: caller.method.to_string(),
            label: call_label.to_owned(),
        })?;

    let (call_offset, result, arguments) = match &caller.instructions[call_index] {
        Instruction {
            offset,
            kind: InstructionKind::Call {
                result, arguments, ..
            },
            ..
        } => (*offset, result.clone(), arguments.clone()),
        other => {
            return Err(AnalysisError::MalformedIr {
                method: caller.method.to_string(),
                label: other.label.clone(),
            })
        }
    };
    if callee.instructions.is_empty() {
        return Err(AnalysisError::MissingBody {
            method: callee.method.to_string(),
        });
    }

    // Hygiene: every callee variable gets a call-site-prefixed fresh
    // local, so nothing in the caller is captured.
    let renaming = variable_renaming(callee, call_label);

    // Where control resumes after the inlined body.
    let continuation = match caller.instructions.get(call_index + 1) {
        Some(next) => next.label.clone(),
        None => {
            let label: Label = format!("{call_label}.ret");
            caller
                .instructions
                .push(Instruction::with_label(call_offset, label.clone(), InstructionKind::Nop));
            label
        }
    };

    let mut spliced: Vec<Instruction> = Vec::new();
    for (formal, actual) in callee.parameters.iter().zip(&arguments) {
        spliced.push(Instruction::with_label(
            call_offset,
            format!("{call_label}.bind.{}", formal.name()),
            InstructionKind::Load {
                result: renaming[&formal.name()].clone(),
                operand: Value::Variable(actual.clone()),
            },
        ));
    }

    for instruction in &callee.instructions {
        let label = prefixed(call_label, &instruction.label);
        let kind = rename_variables(&instruction.kind, &renaming);
        match kind {
            InstructionKind::Return { operand } => {
                if let (Some(result), Some(returned)) = (&result, operand) {
                    spliced.push(Instruction::with_label(
                        call_offset,
                        label.clone(),
                        InstructionKind::Load {
                            result: result.clone(),
                            operand: Value::Variable(returned),
                        },
                    ));
                    spliced.push(Instruction::with_label(
                        call_offset,
                        format!("{label}.leave"),
                        InstructionKind::UnconditionalBranch {
                            target: continuation.clone(),
                        },
                    ));
                } else {
                    spliced.push(Instruction::with_label(
                        call_offset,
                        label,
                        InstructionKind::UnconditionalBranch {
                            target: continuation.clone(),
                        },
                    ));
                }
            }
            kind => {
                let kind = retarget_branches(kind, call_label);
                spliced.push(Instruction::with_label(call_offset, label, kind));
            }
        }
    }

    caller
        .instructions
        .splice(call_index..=call_index, spliced);

    for block in callee.exceptions.iter() {
        caller.exceptions.add(ProtectedBlock {
            start: prefixed(call_label, &block.start),
            end: prefixed(call_label, &block.end),
            handler_start: prefixed(call_label, &block.handler_start),
            handler_end: prefixed(call_label, &block.handler_end),
            handler: block.handler.clone(),
        });
    }
    Ok(())
}

fn prefixed(call_label: &str, label: &str) -> Label {
    format!("{call_label}.{label}")
}

/// Map every callee variable name to a fresh call-site-scoped local.
fn variable_renaming(callee: &MethodBody, call_label: &str) -> FxHashMap<String, Variable> {
    callee
        .variables()
        .into_iter()
        .map(|variable| {
            let renamed = Variable::local(
                format!("{call_label}.{}", variable.name()),
                variable.ty().clone(),
            );
            (variable.name(), renamed)
        })
        .collect()
}

fn rename_variables(
    kind: &InstructionKind,
    renaming: &FxHashMap<String, Variable>,
) -> InstructionKind {
    let mut renamed = kind.clone();
    for used in kind.used_variables() {
        if let Some(replacement) = renaming.get(&used.name()) {
            renamed = renamed.replace_uses(&used, replacement);
        }
    }
    if let Some(result) = renamed.result().cloned() {
        if let Some(replacement) = renaming.get(&result.name()) {
            renamed = renamed.replace_result(replacement);
        }
    }
    renamed
}

/// Rewrite intra-callee branch targets into the prefixed label space.
fn retarget_branches(kind: InstructionKind, call_label: &str) -> InstructionKind {
    match kind {
        InstructionKind::ConditionalBranch { operand, target } => {
            InstructionKind::ConditionalBranch {
                operand,
                target: prefixed(call_label, &target),
            }
        }
        InstructionKind::UnconditionalBranch { target } => InstructionKind::UnconditionalBranch {
            target: prefixed(call_label, &target),
        },
        InstructionKind::Switch { operand, targets } => InstructionKind::Switch {
            operand,
            targets: targets
                .iter()
                .map(|target| prefixed(call_label, target))
                .collect(),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BodyBuilder, CallKind};
    use tacit_il::{IlType, MethodRef, TypeRef};

    fn node_ty() -> IlType {
        IlType::named("Node")
    }

    fn callee() -> MethodBody {
        // Node Identity(Node p) { q = p; return q }
        let method = MethodRef::static_method(TypeRef::new("C"), "Identity", node_ty());
        let p = Variable::parameter("p", node_ty());
        let mut builder = BodyBuilder::new(method).parameter(p.clone());
        builder.push(InstructionKind::Load {
            result: Variable::local("q", node_ty()),
            operand: Value::Variable(p),
        });
        builder.push(InstructionKind::Return {
            operand: Some(Variable::local("q", node_ty())),
        });
        builder.build()
    }

    fn caller() -> MethodBody {
        // r = call C::Identity(a); return r
        let method = MethodRef::static_method(TypeRef::new("C"), "M", node_ty());
        let mut builder = BodyBuilder::new(method);
        builder.push(InstructionKind::Call {
            result: Some(Variable::local("r", node_ty())),
            kind: CallKind::Static,
            method: MethodRef::static_method(TypeRef::new("C"), "Identity", node_ty()),
            arguments: vec![Variable::local("a", node_ty())],
        });
        builder.push(InstructionKind::Return {
            operand: Some(Variable::local("r", node_ty())),
        });
        builder.build()
    }

    #[test]
    fn test_inline_replaces_call_and_stays_valid() {
        let mut caller = caller();
        inline_call(&mut caller, "L_0000", &callee()).unwrap();

        assert!(caller
            .instructions
            .iter()
            .all(|i| !matches!(i.kind, InstructionKind::Call { .. })));
        caller.validate().unwrap();
    }

    #[test]
    fn test_inline_uses_prefixed_labels_and_variables() {
        let mut caller = caller();
        inline_call(&mut caller, "L_0000", &callee()).unwrap();

        // The spliced copy of the callee's first instruction carries the
        // call-site prefix, in both its label and its variables.
        let spliced = caller
            .instructions
            .iter()
            .find(|i| i.label == "L_0000.L_0000")
            .expect("spliced instruction");
        let result = spliced.kind.result().unwrap();
        assert_eq!(result.name(), "L_0000.q");

        // The return became a load into the caller's result plus a jump
        // to the continuation.
        assert!(caller.instructions.iter().any(|i| matches!(
            &i.kind,
            InstructionKind::UnconditionalBranch { target } if target == "L_0001"
        )));
    }

    #[test]
    fn test_offsets_stay_monotone() {
        let mut caller = caller();
        inline_call(&mut caller, "L_0000", &callee()).unwrap();
        for window in caller.instructions.windows(2) {
            assert!(window[0].offset <= window[1].offset);
        }
    }

    #[test]
    fn test_inlining_non_call_is_an_error() {
        let mut caller = caller();
        let err = inline_call(&mut caller, "L_0001", &callee()).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedIr { .. }));
    }

    #[test]
    fn test_inlining_empty_body_is_an_error() {
        let mut caller = caller();
        let empty = MethodBody::new(MethodRef::static_method(
            TypeRef::new("C"),
            "Identity",
            node_ty(),
        ));
        let err = inline_call(&mut caller, "L_0000", &empty).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingBody { .. }));
    }
}
