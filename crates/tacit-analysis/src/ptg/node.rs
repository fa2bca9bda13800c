//! Points-to graph nodes
//!
//! Nodes abstract heap locations by allocation site. Identity is the
//! [`PtgId`] (context plus offset); the [`PtgNodeId`] handle is only an
//! index into one graph's node table. Two nodes with equal ids are the
//! same abstract location and must be merged, never duplicated.

use crate::ir::Variable;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use tacit_il::{FieldRef, IlType, MethodRef};

/// Handle of a node within one graph's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PtgNodeId(pub u32);

impl PtgNodeId {
    /// The null node's handle; the null node is created with the graph
    /// and never removed.
    pub const NULL: PtgNodeId = PtgNodeId(0);
}

impl fmt::Display for PtgNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// The namespace a node id lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeContext {
    /// Allocation sites and parameters of one method.
    Method(MethodRef),
    /// The process-wide null context.
    GlobalNull,
    /// The process-wide static-storage context.
    GlobalStatic,
}

/// Identity of an abstract heap location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PtgId {
    /// The namespace.
    pub context: NodeContext,
    /// Offset within the namespace: the allocation's bytecode offset for
    /// objects, negative slots for parameters, fixed values for the
    /// singletons.
    pub offset: i64,
}

impl PtgId {
    /// The null node's id.
    pub fn null() -> Self {
        Self {
            context: NodeContext::GlobalNull,
            offset: 0,
        }
    }

    /// The global static-storage node's id.
    pub fn global() -> Self {
        Self {
            context: NodeContext::GlobalStatic,
            offset: -1,
        }
    }

    /// The id of an allocation site (or synthesized unknown) at a
    /// bytecode offset of a method.
    pub fn at_offset(method: MethodRef, offset: u32) -> Self {
        Self {
            context: NodeContext::Method(method),
            offset: offset as i64,
        }
    }

    /// The id of the node standing for the `index`-th parameter of a
    /// method. Parameter slots are negative so they never collide with
    /// allocation offsets.
    pub fn parameter(method: MethodRef, index: usize) -> Self {
        Self {
            context: NodeContext::Method(method),
            offset: -(index as i64) - 1,
        }
    }
}

impl fmt::Display for PtgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            NodeContext::Method(method) => write!(f, "{}@{}", method, self.offset),
            NodeContext::GlobalNull => write!(f, "null"),
            NodeContext::GlobalStatic => write!(f, "global"),
        }
    }
}

/// What a node stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PtgNodeKind {
    /// The null reference; one per graph.
    Null,
    /// An allocation site.
    Object,
    /// A placeholder for a value supplied from outside the analyzed
    /// method.
    Unknown,
    /// The object a formal parameter points to on entry; carries the
    /// parameter name.
    Parameter(String),
    /// A delegate carrying its target method and, once constructed, the
    /// bound receiver.
    Delegate {
        /// The method the delegate invokes.
        method: MethodRef,
        /// The bound receiver, if the delegate has been constructed over
        /// one.
        instance: Option<Variable>,
    },
    /// The static-storage root; one per graph.
    Global,
}

impl PtgNodeKind {
    /// Whether two kinds may describe the same abstract location. The
    /// delegate receiver is mutable state and does not participate.
    pub fn compatible(&self, other: &PtgNodeKind) -> bool {
        match (self, other) {
            (PtgNodeKind::Null, PtgNodeKind::Null)
            | (PtgNodeKind::Object, PtgNodeKind::Object)
            | (PtgNodeKind::Unknown, PtgNodeKind::Unknown)
            | (PtgNodeKind::Global, PtgNodeKind::Global) => true,
            (PtgNodeKind::Parameter(a), PtgNodeKind::Parameter(b)) => a == b,
            (
                PtgNodeKind::Delegate { method: a, .. },
                PtgNodeKind::Delegate { method: b, .. },
            ) => a == b,
            _ => false,
        }
    }

    /// Merge mutable state from a compatible kind: a known delegate
    /// receiver wins over an unknown one.
    pub fn merge(&mut self, other: &PtgNodeKind) {
        if let (
            PtgNodeKind::Delegate { instance, .. },
            PtgNodeKind::Delegate {
                instance: other_instance,
                ..
            },
        ) = (&mut *self, other)
        {
            if instance.is_none() {
                *instance = other_instance.clone();
            }
        }
    }
}

/// One node of a points-to graph.
#[derive(Debug, Clone)]
pub struct PtgNode {
    /// Identity of the abstract location.
    pub id: PtgId,
    /// What the node stands for.
    pub kind: PtgNodeKind,
    /// Static type of the location, as far as known.
    pub ty: IlType,
    /// Variables whose root edges point here; kept coherent with the
    /// graph's root map.
    pub variables: FxHashSet<Variable>,
    /// Field-labeled outgoing edges.
    pub targets: FxHashMap<FieldRef, FxHashSet<PtgNodeId>>,
    /// Field-labeled incoming edges; the exact inverse of `targets`.
    pub sources: FxHashMap<FieldRef, FxHashSet<PtgNodeId>>,
}

impl PtgNode {
    /// Create an unlinked node.
    pub fn new(id: PtgId, kind: PtgNodeKind, ty: IlType) -> Self {
        Self {
            id,
            kind,
            ty,
            variables: FxHashSet::default(),
            targets: FxHashMap::default(),
            sources: FxHashMap::default(),
        }
    }

    /// Whether this is the null node.
    pub fn is_null(&self) -> bool {
        matches!(self.kind, PtgNodeKind::Null)
    }

    /// All nodes this node points to, over any field.
    pub fn all_targets(&self) -> FxHashSet<PtgNodeId> {
        self.targets.values().flatten().copied().collect()
    }
}
