//! Exception handler metadata
//!
//! Protected blocks and their handlers, shared by raw stack-machine bodies
//! and disassembled TAC bodies. All ranges are half-open `[start, end)`
//! spans expressed as canonical instruction labels.

use crate::types::IlType;
use std::fmt;

/// The handler attached to a protected block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handler {
    /// Catches exceptions assignable to the given type.
    Catch {
        /// The caught exception type.
        exception_type: IlType,
    },
    /// Runs on both normal and exceptional exit of the protected block.
    Finally,
    /// Runs only on exceptional exit of the protected block.
    Fault,
    /// A filtered catch; the filter expression occupies its own range
    /// starting at `filter_start`.
    Filter {
        /// Label of the first filter instruction.
        filter_start: String,
    },
}

impl Handler {
    /// Short mnemonic used by pretty-printers.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Handler::Catch { .. } => "catch",
            Handler::Finally => "finally",
            Handler::Fault => "fault",
            Handler::Filter { .. } => "filter",
        }
    }
}

/// A protected (try) block and its handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedBlock {
    /// Label of the first protected instruction.
    pub start: String,
    /// Label one past the last protected instruction.
    pub end: String,
    /// Label of the first handler instruction.
    pub handler_start: String,
    /// Label one past the last handler instruction.
    pub handler_end: String,
    /// Handler kind.
    pub handler: Handler,
}

impl fmt::Display for ProtectedBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "try [{}, {}) {} [{}, {})",
            self.start,
            self.end,
            self.handler.mnemonic(),
            self.handler_start,
            self.handler_end
        )
    }
}

/// The exception table of one method body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionInformation {
    /// Protected blocks in metadata order (inner blocks before outer).
    pub blocks: Vec<ProtectedBlock>,
}

impl ExceptionInformation {
    /// An empty exception table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a protected block.
    pub fn add(&mut self, block: ProtectedBlock) {
        self.blocks.push(block);
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterate over the protected blocks.
    pub fn iter(&self) -> impl Iterator<Item = &ProtectedBlock> {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_block_display() {
        let block = ProtectedBlock {
            start: "L_0000".into(),
            end: "L_000A".into(),
            handler_start: "L_000A".into(),
            handler_end: "L_0014".into(),
            handler: Handler::Catch {
                exception_type: IlType::named("System.Exception"),
            },
        };
        assert_eq!(
            format!("{block}"),
            "try [L_0000, L_000A) catch [L_000A, L_0014)"
        );
    }

    #[test]
    fn test_exception_information() {
        let mut info = ExceptionInformation::new();
        assert!(info.is_empty());
        info.add(ProtectedBlock {
            start: "L_0000".into(),
            end: "L_0004".into(),
            handler_start: "L_0004".into(),
            handler_end: "L_0008".into(),
            handler: Handler::Finally,
        });
        assert_eq!(info.iter().count(), 1);
    }
}
