//! Raw method bodies and the loader interface
//!
//! A [`BytecodeLoader`] produces method bodies in raw stack-machine form:
//! decoded instructions with their byte offsets, the exception table, and
//! local signatures. Bit-exact fidelity to the on-disk instruction
//! encoding is the loader's responsibility; the analysis core only sees
//! this decoded shape.

use crate::exceptions::ExceptionInformation;
use crate::types::{IlType, MethodRef};
use std::fmt;

/// One decoded stack-machine instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInstruction {
    /// Byte offset within the method body.
    pub offset: u32,
    /// Instruction mnemonic, e.g. `ldfld`.
    pub mnemonic: String,
    /// Rendered operand, if the instruction has one.
    pub operand: Option<String>,
}

impl fmt::Display for RawInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Some(operand) => write!(f, "L_{:04X}: {} {}", self.offset, self.mnemonic, operand),
            None => write!(f, "L_{:04X}: {}", self.offset, self.mnemonic),
        }
    }
}

/// A method body in raw stack-machine form.
#[derive(Debug, Clone)]
pub struct RawMethodBody {
    /// The method this body belongs to.
    pub method: MethodRef,
    /// Decoded instructions in offset order.
    pub instructions: Vec<RawInstruction>,
    /// Declared parameter names and types, including `this`.
    pub parameters: Vec<(String, IlType)>,
    /// Declared local variable names and types.
    pub locals: Vec<(String, IlType)>,
    /// The exception table.
    pub exceptions: ExceptionInformation,
    /// Declared maximum evaluation stack depth.
    pub max_stack: u16,
}

/// Produces raw method bodies from loaded assemblies.
///
/// Implementations own assembly parsing end to end; the analysis core
/// treats them as opaque suppliers.
pub trait BytecodeLoader {
    /// Load the raw body of the given method, if the assembly defines one.
    fn load_body(&self, method: &MethodRef) -> Option<RawMethodBody>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRef;

    #[test]
    fn test_raw_instruction_display() {
        let plain = RawInstruction {
            offset: 4,
            mnemonic: "dup".into(),
            operand: None,
        };
        assert_eq!(format!("{plain}"), "L_0004: dup");

        let with_operand = RawInstruction {
            offset: 0x10,
            mnemonic: "ldfld".into(),
            operand: Some("Node::next".into()),
        };
        assert_eq!(format!("{with_operand}"), "L_0010: ldfld Node::next");
    }

    #[test]
    fn test_raw_body_holds_signature() {
        let body = RawMethodBody {
            method: MethodRef::static_method(TypeRef::new("C"), "Main", IlType::named("Void")),
            instructions: vec![],
            parameters: vec![("args".into(), IlType::array(IlType::named("String")))],
            locals: vec![("x".into(), IlType::named("Int32"))],
            exceptions: ExceptionInformation::new(),
            max_stack: 8,
        };
        assert_eq!(body.parameters.len(), 1);
        assert_eq!(body.locals.len(), 1);
    }
}
