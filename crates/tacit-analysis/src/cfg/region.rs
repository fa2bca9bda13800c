//! CFG regions
//!
//! Regions group nodes that share structure the edge lists alone cannot
//! express: protected (try) spans with their handlers, and natural loops.

use super::node::CfgNodeId;
use rustc_hash::FxHashSet;
use std::fmt;

/// Identifier of a region within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionId(pub u32);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region{}", self.0)
    }
}

/// The kind of a handler region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Runs when an exception of the handled type escapes the protected
    /// span.
    Catch,
    /// Runs only on exceptional exit.
    Fault,
    /// Runs on both normal and exceptional exit.
    Finally,
}

/// What a region represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// A protected (try) span; `handler` is its handler region.
    Protected {
        /// The attached handler region.
        handler: RegionId,
    },
    /// A handler span; `protected` is the span it protects.
    Handler {
        /// Handler kind.
        kind: HandlerKind,
        /// The protected region this handles.
        protected: RegionId,
    },
    /// A natural loop.
    Loop,
}

/// A set of CFG nodes with a distinguished header.
#[derive(Debug, Clone)]
pub struct Region {
    /// This region's id.
    pub id: RegionId,
    /// What the region represents.
    pub kind: RegionKind,
    /// First node of the region in offset order (for try/handler
    /// regions) or the loop header (for loops).
    pub header: CfgNodeId,
    /// All member nodes, header included.
    pub nodes: FxHashSet<CfgNodeId>,
}

impl Region {
    /// Whether the region contains a node.
    pub fn contains(&self, id: CfgNodeId) -> bool {
        self.nodes.contains(&id)
    }
}
