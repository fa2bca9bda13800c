//! TAC instructions
//!
//! Every instruction is tagged with the bytecode offset it was lifted from
//! and a textual label (canonically `L_<offset:04X>`). Offsets are
//! monotone non-decreasing within a method body; labels are what branches
//! and exception tables reference.

use super::value::{BinaryOp, UnaryOp, Value, Variable};
use rustc_hash::FxHashSet;
use std::fmt;
use tacit_il::{offset_label, IlType, MethodRef};

/// A branch or switch target label.
pub type Label = String;

/// How a call dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Direct dispatch to the named method.
    Static,
    /// Virtual dispatch through the first argument.
    Virtual,
}

/// A TAC instruction: a labeled operation at a bytecode offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Offset of the originating bytecode instruction.
    pub offset: u32,
    /// Textual label, canonically derived from the offset.
    pub label: Label,
    /// The operation.
    pub kind: InstructionKind,
}

impl Instruction {
    /// Create an instruction with the canonical label for `offset`.
    pub fn new(offset: u32, kind: InstructionKind) -> Self {
        Self {
            offset,
            label: offset_label(offset),
            kind,
        }
    }

    /// Create an instruction with an explicit label (used by transforms
    /// that splice bodies and prefix labels).
    pub fn with_label(offset: u32, label: impl Into<Label>, kind: InstructionKind) -> Self {
        Self {
            offset,
            label: label.into(),
            kind,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.kind)
    }
}

/// The operation performed by an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionKind {
    /// No operation.
    Nop,

    /// `result = operand`
    Load {
        /// Destination variable.
        result: Variable,
        /// Loaded value.
        operand: Value,
    },

    /// `target = operand`, where target is an assignable location
    /// (field, array element, or dereference).
    Store {
        /// Written location.
        target: Value,
        /// Stored variable.
        operand: Variable,
    },

    /// `result = left op right`
    Binary {
        /// Destination variable.
        result: Variable,
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        left: Variable,
        /// Right operand.
        right: Variable,
    },

    /// `result = op operand`
    Unary {
        /// Destination variable.
        result: Variable,
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Variable,
    },

    /// `result = new allocation_type`
    CreateObject {
        /// Destination variable.
        result: Variable,
        /// Allocated type.
        allocation_type: IlType,
    },

    /// `result = new element_type[sizes]`
    CreateArray {
        /// Destination variable.
        result: Variable,
        /// Element type.
        element_type: IlType,
        /// One size variable per dimension.
        sizes: Vec<Variable>,
    },

    /// `result = (conversion_type) operand`
    Convert {
        /// Destination variable.
        result: Variable,
        /// Converted variable.
        operand: Variable,
        /// Target type.
        conversion_type: IlType,
    },

    /// `result = call method(arguments)`; for virtual calls the receiver
    /// is the first argument.
    Call {
        /// Destination variable, if the callee returns a value.
        result: Option<Variable>,
        /// Dispatch kind.
        kind: CallKind,
        /// The callee.
        method: MethodRef,
        /// Actual arguments, receiver first for instance methods.
        arguments: Vec<Variable>,
    },

    /// `result = phi(arguments)`
    Phi {
        /// Destination variable.
        result: Variable,
        /// One operand per predecessor.
        arguments: Vec<Variable>,
    },

    /// `return [operand]`
    Return {
        /// Returned variable, if any.
        operand: Option<Variable>,
    },

    /// `throw [operand]`; no operand rethrows the current exception.
    Throw {
        /// Thrown variable, if any.
        operand: Option<Variable>,
    },

    /// `if operand goto target`; falls through when the condition is
    /// false.
    ConditionalBranch {
        /// Branch condition.
        operand: Variable,
        /// Taken-branch label.
        target: Label,
    },

    /// `goto target`
    UnconditionalBranch {
        /// Branch label.
        target: Label,
    },

    /// `switch operand [targets]`; also falls through.
    Switch {
        /// Scrutinee.
        operand: Variable,
        /// One label per case.
        targets: Vec<Label>,
    },

    /// Marks the first instruction of a protected block.
    TryStart,

    /// Marks the first instruction of a catch handler; binds the caught
    /// exception.
    CatchStart {
        /// Variable receiving the exception.
        result: Variable,
        /// Caught exception type.
        exception_type: IlType,
    },

    /// Marks the first instruction of a finally handler.
    FinallyStart,

    /// Marks the first instruction of a fault handler.
    FaultStart,
}

impl InstructionKind {
    /// The variable this instruction defines, if any.
    pub fn result(&self) -> Option<&Variable> {
        match self {
            InstructionKind::Load { result, .. }
            | InstructionKind::Binary { result, .. }
            | InstructionKind::Unary { result, .. }
            | InstructionKind::CreateObject { result, .. }
            | InstructionKind::CreateArray { result, .. }
            | InstructionKind::Convert { result, .. }
            | InstructionKind::Phi { result, .. }
            | InstructionKind::CatchStart { result, .. } => Some(result),
            InstructionKind::Call { result, .. } => result.as_ref(),
            _ => None,
        }
    }

    /// The variables this instruction reads.
    pub fn used_variables(&self) -> FxHashSet<Variable> {
        let mut used = FxHashSet::default();
        match self {
            InstructionKind::Nop
            | InstructionKind::TryStart
            | InstructionKind::CatchStart { .. }
            | InstructionKind::FinallyStart
            | InstructionKind::FaultStart
            | InstructionKind::CreateObject { .. }
            | InstructionKind::UnconditionalBranch { .. } => {}
            InstructionKind::Load { operand, .. } => used.extend(operand.variables()),
            InstructionKind::Store { target, operand } => {
                used.extend(target.variables());
                used.insert(operand.clone());
            }
            InstructionKind::Binary { left, right, .. } => {
                used.insert(left.clone());
                used.insert(right.clone());
            }
            InstructionKind::Unary { operand, .. } => {
                used.insert(operand.clone());
            }
            InstructionKind::CreateArray { sizes, .. } => used.extend(sizes.iter().cloned()),
            InstructionKind::Convert { operand, .. } => {
                used.insert(operand.clone());
            }
            InstructionKind::Call { arguments, .. } | InstructionKind::Phi { arguments, .. } => {
                used.extend(arguments.iter().cloned())
            }
            InstructionKind::Return { operand } | InstructionKind::Throw { operand } => {
                used.extend(operand.iter().cloned())
            }
            InstructionKind::ConditionalBranch { operand, .. }
            | InstructionKind::Switch { operand, .. } => {
                used.insert(operand.clone());
            }
        }
        used
    }

    /// The variables this instruction defines.
    pub fn modified_variables(&self) -> FxHashSet<Variable> {
        self.result().cloned().into_iter().collect()
    }

    /// All variables mentioned by this instruction.
    pub fn variables(&self) -> FxHashSet<Variable> {
        let mut all = self.used_variables();
        all.extend(self.modified_variables());
        all
    }

    /// Rewrite every *use* of `old` to `new`, leaving the defined
    /// variable untouched.
    pub fn replace_uses(&self, old: &Variable, new: &Variable) -> InstructionKind {
        match self {
            InstructionKind::Nop
            | InstructionKind::TryStart
            | InstructionKind::CatchStart { .. }
            | InstructionKind::FinallyStart
            | InstructionKind::FaultStart
            | InstructionKind::CreateObject { .. }
            | InstructionKind::UnconditionalBranch { .. } => self.clone(),
            InstructionKind::Load { result, operand } => InstructionKind::Load {
                result: result.clone(),
                operand: operand.replace(old, new),
            },
            InstructionKind::Store { target, operand } => InstructionKind::Store {
                target: target.replace(old, new),
                operand: operand.replace(old, new),
            },
            InstructionKind::Binary {
                result,
                op,
                left,
                right,
            } => InstructionKind::Binary {
                result: result.clone(),
                op: *op,
                left: left.replace(old, new),
                right: right.replace(old, new),
            },
            InstructionKind::Unary {
                result,
                op,
                operand,
            } => InstructionKind::Unary {
                result: result.clone(),
                op: *op,
                operand: operand.replace(old, new),
            },
            InstructionKind::CreateArray {
                result,
                element_type,
                sizes,
            } => InstructionKind::CreateArray {
                result: result.clone(),
                element_type: element_type.clone(),
                sizes: sizes.iter().map(|s| s.replace(old, new)).collect(),
            },
            InstructionKind::Convert {
                result,
                operand,
                conversion_type,
            } => InstructionKind::Convert {
                result: result.clone(),
                operand: operand.replace(old, new),
                conversion_type: conversion_type.clone(),
            },
            InstructionKind::Call {
                result,
                kind,
                method,
                arguments,
            } => InstructionKind::Call {
                result: result.clone(),
                kind: *kind,
                method: method.clone(),
                arguments: arguments.iter().map(|a| a.replace(old, new)).collect(),
            },
            InstructionKind::Phi { result, arguments } => InstructionKind::Phi {
                result: result.clone(),
                arguments: arguments.iter().map(|a| a.replace(old, new)).collect(),
            },
            InstructionKind::Return { operand } => InstructionKind::Return {
                operand: operand.as_ref().map(|v| v.replace(old, new)),
            },
            InstructionKind::Throw { operand } => InstructionKind::Throw {
                operand: operand.as_ref().map(|v| v.replace(old, new)),
            },
            InstructionKind::ConditionalBranch { operand, target } => {
                InstructionKind::ConditionalBranch {
                    operand: operand.replace(old, new),
                    target: target.clone(),
                }
            }
            InstructionKind::Switch { operand, targets } => InstructionKind::Switch {
                operand: operand.replace(old, new),
                targets: targets.clone(),
            },
        }
    }

    /// Rewrite the defined variable, leaving uses untouched.
    pub fn replace_result(&self, new: &Variable) -> InstructionKind {
        let mut kind = self.clone();
        match &mut kind {
            InstructionKind::Load { result, .. }
            | InstructionKind::Binary { result, .. }
            | InstructionKind::Unary { result, .. }
            | InstructionKind::CreateObject { result, .. }
            | InstructionKind::CreateArray { result, .. }
            | InstructionKind::Convert { result, .. }
            | InstructionKind::Phi { result, .. }
            | InstructionKind::CatchStart { result, .. } => *result = new.clone(),
            InstructionKind::Call { result, .. } => {
                if let Some(result) = result {
                    *result = new.clone();
                }
            }
            _ => {}
        }
        kind
    }

    /// Labels this instruction may branch to.
    pub fn branch_targets(&self) -> Vec<&Label> {
        match self {
            InstructionKind::ConditionalBranch { target, .. }
            | InstructionKind::UnconditionalBranch { target } => vec![target],
            InstructionKind::Switch { targets, .. } => targets.iter().collect(),
            _ => vec![],
        }
    }

    /// Whether control may continue to the next instruction in sequence.
    /// Conditional branches and switches fall through when no case is
    /// taken.
    pub fn can_fall_through(&self) -> bool {
        !matches!(
            self,
            InstructionKind::UnconditionalBranch { .. }
                | InstructionKind::Return { .. }
                | InstructionKind::Throw { .. }
        )
    }

    /// Whether this instruction ends a basic block.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstructionKind::ConditionalBranch { .. }
                | InstructionKind::UnconditionalBranch { .. }
                | InstructionKind::Switch { .. }
                | InstructionKind::Return { .. }
                | InstructionKind::Throw { .. }
        )
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstructionKind::Nop => write!(f, "nop"),
            InstructionKind::Load { result, operand } => write!(f, "{result} = {operand}"),
            InstructionKind::Store { target, operand } => write!(f, "{target} = {operand}"),
            InstructionKind::Binary {
                result,
                op,
                left,
                right,
            } => write!(f, "{result} = {left} {op} {right}"),
            InstructionKind::Unary {
                result,
                op,
                operand,
            } => write!(f, "{result} = {op}{operand}"),
            InstructionKind::CreateObject {
                result,
                allocation_type,
            } => write!(f, "{result} = new {allocation_type}"),
            InstructionKind::CreateArray {
                result,
                element_type,
                sizes,
            } => {
                write!(f, "{result} = new {element_type}[")?;
                for (i, size) in sizes.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{size}")?;
                }
                write!(f, "]")
            }
            InstructionKind::Convert {
                result,
                operand,
                conversion_type,
            } => write!(f, "{result} = ({conversion_type}) {operand}"),
            InstructionKind::Call {
                result,
                kind,
                method,
                arguments,
            } => {
                if let Some(result) = result {
                    write!(f, "{result} = ")?;
                }
                let dispatch = match kind {
                    CallKind::Static => "call",
                    CallKind::Virtual => "callvirt",
                };
                write!(f, "{dispatch} {method}(")?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{argument}")?;
                }
                write!(f, ")")
            }
            InstructionKind::Phi { result, arguments } => {
                write!(f, "{result} = phi(")?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{argument}")?;
                }
                write!(f, ")")
            }
            InstructionKind::Return { operand: Some(v) } => write!(f, "return {v}"),
            InstructionKind::Return { operand: None } => write!(f, "return"),
            InstructionKind::Throw { operand: Some(v) } => write!(f, "throw {v}"),
            InstructionKind::Throw { operand: None } => write!(f, "rethrow"),
            InstructionKind::ConditionalBranch { operand, target } => {
                write!(f, "if {operand} goto {target}")
            }
            InstructionKind::UnconditionalBranch { target } => write!(f, "goto {target}"),
            InstructionKind::Switch { operand, targets } => {
                write!(f, "switch {operand} [")?;
                for (i, target) in targets.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{target}")?;
                }
                write!(f, "]")
            }
            InstructionKind::TryStart => write!(f, "try"),
            InstructionKind::CatchStart {
                result,
                exception_type,
            } => write!(f, "catch {exception_type} -> {result}"),
            InstructionKind::FinallyStart => write!(f, "finally"),
            InstructionKind::FaultStart => write!(f, "fault"),
        }
    }
}
