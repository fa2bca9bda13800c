//! Tacit Analysis Core
//!
//! Static analysis over a managed, stack-based IL lifted into
//! three-address code.
//!
//! # Architecture
//!
//! The analysis pipeline is:
//! 1. TAC method bodies (from a disassembler) → control-flow graphs
//! 2. CFG → topological orders, dominators, loops, exception regions
//! 3. CFG → dataflow analyses via the generic worklist framework
//! 4. Centrally: the field-sensitive, allocation-site points-to analysis
//!
//! The IR uses Three-Address Code with by-name variable identity and a
//! structural substitution protocol.

pub mod analyses;
pub mod cfg;
pub mod dataflow;
pub mod error;
pub mod ir;
pub mod ptg;
pub mod transform;
pub mod util;

pub use analyses::{PointsToAnalysis, PointsToResult};
pub use cfg::{CfgBuilder, CfgMode, ControlFlowGraph};
pub use dataflow::{BackwardDataFlowAnalysis, DataFlowResult, ForwardDataFlowAnalysis};
pub use error::{AnalysisError, AnalysisResult, AnalysisWarning};
pub use ir::{Instruction, InstructionKind, MethodBody, Value, Variable};
pub use ptg::{PointsToGraph, PtgId, PtgNodeId, PtgNodeKind};

use tacit_il::RawMethodBody;

/// Lifts raw stack-machine bodies into TAC.
///
/// The lifting itself lives outside the analysis core; the core only
/// consumes its output.
pub trait Disassembler {
    /// Disassemble one raw body into TAC form.
    fn disassemble(&self, body: &RawMethodBody) -> AnalysisResult<MethodBody>;
}
