//! Pretty-printing for TAC bodies
//!
//! Debug text output only; graph serialization to external formats is a
//! separate concern and not part of the core.

use super::body::MethodBody;
use std::fmt::Write;

/// Trait for pretty-printing IR constructs.
pub trait PrettyPrint {
    /// Render a human-readable listing.
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for MethodBody {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        writeln!(output, "; method {}", self.method).unwrap();

        if !self.parameters.is_empty() {
            let params: Vec<String> = self
                .parameters
                .iter()
                .map(|p| format!("{}: {}", p, p.ty()))
                .collect();
            writeln!(output, "; params {}", params.join(", ")).unwrap();
        }
        if !self.local_variables.is_empty() {
            let locals: Vec<String> = self
                .local_variables
                .iter()
                .map(|l| format!("{}: {}", l, l.ty()))
                .collect();
            writeln!(output, "; locals {}", locals.join(", ")).unwrap();
        }
        for block in self.exceptions.iter() {
            writeln!(output, "; {block}").unwrap();
        }

        for instruction in &self.instructions {
            writeln!(output, "  {instruction}").unwrap();
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::body::BodyBuilder;
    use crate::ir::instr::InstructionKind;
    use crate::ir::value::{Constant, Value, Variable};
    use tacit_il::{IlType, MethodRef, TypeRef};

    #[test]
    fn test_pretty_print_lists_instructions() {
        let method = MethodRef::static_method(TypeRef::new("C"), "M", IlType::named("Void"));
        let mut builder = BodyBuilder::new(method);
        builder.push(InstructionKind::Load {
            result: Variable::local("x", IlType::named("Node")),
            operand: Value::Constant(Constant::null(IlType::named("Node"))),
        });
        builder.push(InstructionKind::Return { operand: None });

        let text = builder.build().pretty_print();
        assert!(text.starts_with("; method C::M"));
        assert!(text.contains("L_0000: x = null"));
        assert!(text.contains("L_0001: return"));
    }
}
