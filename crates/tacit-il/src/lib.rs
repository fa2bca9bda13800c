//! Tacit IL Model
//!
//! This crate provides the IL-side data model for the Tacit analysis
//! engine: type and member references, resolved metadata, exception
//! handler tables, raw (stack-machine) method bodies, and the collaborator
//! interfaces the analysis core depends on.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod exceptions;
pub mod loader;
pub mod resolver;
pub mod types;

pub use exceptions::{ExceptionInformation, Handler, ProtectedBlock};
pub use loader::{BytecodeLoader, RawInstruction, RawMethodBody};
pub use resolver::{TableResolver, TypeResolver};
pub use types::{
    FieldDefinition, FieldRef, IlType, MethodDefinition, MethodRef, TypeDefinition, TypeRef,
};

/// Render a bytecode offset as a canonical instruction label (`L_002A`).
pub fn offset_label(offset: u32) -> String {
    format!("L_{offset:04X}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_label_format() {
        assert_eq!(offset_label(0), "L_0000");
        assert_eq!(offset_label(0x2A), "L_002A");
        assert_eq!(offset_label(0x1234), "L_1234");
        assert_eq!(offset_label(0x12345), "L_12345");
    }
}
