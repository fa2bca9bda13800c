//! Analyses built on the dataflow framework
//!
//! The points-to analysis is the centerpiece; the others are the
//! companion passes a TAC pipeline needs around it.

pub mod copy_propagation;
pub mod live_variables;
pub mod points_to;
pub mod reaching_definitions;
pub mod ssa;
pub mod type_inference;
pub mod webs;

pub use copy_propagation::CopyPropagation;
pub use live_variables::LiveVariablesAnalysis;
pub use points_to::{PointsToAnalysis, PointsToResult};
pub use reaching_definitions::{Definition, ReachingDefinitionsAnalysis};
pub use ssa::construct_ssa;
pub use type_inference::TypeInferenceAnalysis;
pub use webs::split_webs;
