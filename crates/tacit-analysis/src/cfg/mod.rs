//! Control-flow graphs
//!
//! Basic blocks over TAC instructions with normal and exceptional edges,
//! try/handler and loop regions, topological orders, dominators, and
//! natural loops.

pub mod builder;
pub mod dominance;
pub mod loops;
pub mod node;
pub mod region;

pub use builder::{CfgBuilder, CfgMode};
pub use dominance::{compute_dominance_frontier, compute_dominators, Dominators};
pub use loops::find_natural_loops;
pub use node::{CfgNode, CfgNodeId, CfgNodeKind, ControlFlowGraph};
pub use region::{HandlerKind, Region, RegionId, RegionKind};
