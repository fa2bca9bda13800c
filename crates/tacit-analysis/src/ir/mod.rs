//! The TAC intermediate representation
//!
//! A register-based three-address code lifted from the stack-based IL:
//! values and expressions with structural substitution, labeled
//! instructions, and method bodies with exception tables.

pub mod body;
pub mod instr;
pub mod pretty;
pub mod value;

pub use body::{BodyBuilder, MethodBody};
pub use instr::{CallKind, Instruction, InstructionKind, Label};
pub use pretty::PrettyPrint;
pub use value::{BinaryOp, Constant, ConstantValue, Expression, UnaryOp, Value, Variable};
