//! TAC method bodies

use super::instr::{Instruction, InstructionKind, Label};
use super::value::Variable;
use crate::error::{AnalysisError, AnalysisResult};
use rustc_hash::{FxHashMap, FxHashSet};
use tacit_il::{ExceptionInformation, MethodRef};

/// A disassembled method body in TAC form.
#[derive(Debug, Clone)]
pub struct MethodBody {
    /// The method this body belongs to.
    pub method: MethodRef,
    /// Instructions in offset order.
    pub instructions: Vec<Instruction>,
    /// Formal parameters, receiver first for instance methods.
    pub parameters: Vec<Variable>,
    /// Declared locals (not counting temporaries).
    pub local_variables: Vec<Variable>,
    /// The exception table.
    pub exceptions: ExceptionInformation,
}

impl MethodBody {
    /// Create an empty body for `method`.
    pub fn new(method: MethodRef) -> Self {
        Self {
            method,
            instructions: Vec::new(),
            parameters: Vec::new(),
            local_variables: Vec::new(),
            exceptions: ExceptionInformation::new(),
        }
    }

    /// Append an instruction.
    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// All variables mentioned anywhere in the body, including parameters
    /// and locals.
    pub fn variables(&self) -> FxHashSet<Variable> {
        let mut all: FxHashSet<Variable> = self.parameters.iter().cloned().collect();
        all.extend(self.local_variables.iter().cloned());
        for instruction in &self.instructions {
            all.extend(instruction.kind.variables());
        }
        all
    }

    /// Map from label to instruction index.
    pub fn label_index(&self) -> FxHashMap<&Label, usize> {
        self.instructions
            .iter()
            .enumerate()
            .map(|(index, instruction)| (&instruction.label, index))
            .collect()
    }

    /// Check structural well-formedness: offsets are monotone
    /// non-decreasing and every branch target labels some instruction.
    pub fn validate(&self) -> AnalysisResult<()> {
        for window in self.instructions.windows(2) {
            if window[1].offset < window[0].offset {
                return Err(AnalysisError::MalformedIr {
                    method: self.method.to_string(),
                    label: window[1].label.clone(),
                });
            }
        }

        let labels: FxHashSet<&Label> =
            self.instructions.iter().map(|i| &i.label).collect();
        for instruction in &self.instructions {
            for target in instruction.kind.branch_targets() {
                if !labels.contains(target) {
                    return Err(AnalysisError::MalformedIr {
                        method: self.method.to_string(),
                        label: target.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// The highest instruction offset, or 0 for an empty body.
    pub fn max_offset(&self) -> u32 {
        self.instructions.last().map_or(0, |i| i.offset)
    }
}

/// Convenience builder that assigns consecutive offsets, used by tests
/// and by transforms that synthesize bodies.
#[derive(Debug)]
pub struct BodyBuilder {
    body: MethodBody,
    next_offset: u32,
}

impl BodyBuilder {
    /// Start building a body for `method`.
    pub fn new(method: MethodRef) -> Self {
        Self {
            body: MethodBody::new(method),
            next_offset: 0,
        }
    }

    /// Declare a parameter.
    pub fn parameter(mut self, parameter: Variable) -> Self {
        self.body.parameters.push(parameter);
        self
    }

    /// Declare a local variable.
    pub fn local(mut self, local: Variable) -> Self {
        self.body.local_variables.push(local);
        self
    }

    /// Append an instruction at the next offset.
    pub fn push(&mut self, kind: InstructionKind) -> &mut Self {
        let instruction = Instruction::new(self.next_offset, kind);
        self.next_offset += 1;
        self.body.push(instruction);
        self
    }

    /// Append an instruction at an explicit offset; subsequent offsets
    /// continue from it.
    pub fn push_at(&mut self, offset: u32, kind: InstructionKind) -> &mut Self {
        self.next_offset = offset + 1;
        self.body.push(Instruction::new(offset, kind));
        self
    }

    /// The canonical label the next pushed instruction will get.
    pub fn next_label(&self) -> Label {
        tacit_il::offset_label(self.next_offset)
    }

    /// Finish and return the body.
    pub fn build(self) -> MethodBody {
        self.body
    }

    /// Mutable access to the body under construction.
    pub fn body_mut(&mut self) -> &mut MethodBody {
        &mut self.body
    }
}
