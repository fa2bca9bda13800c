//! Control-flow graph nodes and the graph arena
//!
//! Nodes live in a `Vec` indexed by their id. Ids 0 through 3 are
//! reserved for the four distinguished nodes (entry, exit, normal exit,
//! exceptional exit); basic blocks start at id 4.

use crate::ir::Instruction;
use rustc_hash::FxHashSet;
use std::fmt;

use super::region::{Region, RegionId, RegionKind};

/// Identifier of a CFG node; doubles as the index into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CfgNodeId(pub u32);

impl CfgNodeId {
    /// The entry node id.
    pub const ENTRY: CfgNodeId = CfgNodeId(0);
    /// The exit node id.
    pub const EXIT: CfgNodeId = CfgNodeId(1);
    /// The normal-exit node id.
    pub const NORMAL_EXIT: CfgNodeId = CfgNodeId(2);
    /// The exceptional-exit node id.
    pub const EXCEPTIONAL_EXIT: CfgNodeId = CfgNodeId(3);

    /// The arena index of this id.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CfgNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            CfgNodeId::ENTRY => write!(f, "entry"),
            CfgNodeId::EXIT => write!(f, "exit"),
            CfgNodeId::NORMAL_EXIT => write!(f, "normal-exit"),
            CfgNodeId::EXCEPTIONAL_EXIT => write!(f, "exceptional-exit"),
            CfgNodeId(n) => write!(f, "bb{n}"),
        }
    }
}

/// What a CFG node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfgNodeKind {
    /// The unique entry node.
    Entry,
    /// The unique exit node.
    Exit,
    /// Collects returns (and, in normal mode, throws).
    NormalExit,
    /// Collects throws in exceptional mode.
    ExceptionalExit,
    /// An ordinary basic block.
    BasicBlock,
}

/// One node of a control-flow graph.
#[derive(Debug, Clone)]
pub struct CfgNode {
    /// This node's id.
    pub id: CfgNodeId,
    /// What the node represents.
    pub kind: CfgNodeKind,
    /// Instructions of the block; empty for distinguished nodes.
    pub instructions: Vec<Instruction>,
    /// Predecessor node ids, without duplicates.
    pub predecessors: Vec<CfgNodeId>,
    /// Successor node ids, without duplicates. Normal and exceptional
    /// edges share this list; callers distinguish by region membership.
    pub successors: Vec<CfgNodeId>,
    /// Immediate dominator, once computed.
    pub immediate_dominator: Option<CfgNodeId>,
    /// Nodes immediately dominated by this one, once computed.
    pub immediate_dominated: Vec<CfgNodeId>,
    /// Dominance frontier, once computed.
    pub dominance_frontier: FxHashSet<CfgNodeId>,
    /// Position in forward topological order, once computed.
    pub forward_index: Option<u32>,
    /// Position in backward topological order, once computed.
    pub backward_index: Option<u32>,
}

impl CfgNode {
    fn new(id: CfgNodeId, kind: CfgNodeKind) -> Self {
        Self {
            id,
            kind,
            instructions: Vec::new(),
            predecessors: Vec::new(),
            successors: Vec::new(),
            immediate_dominator: None,
            immediate_dominated: Vec::new(),
            dominance_frontier: FxHashSet::default(),
            forward_index: None,
            backward_index: None,
        }
    }

    /// The offset of the block's first instruction, if it has any.
    pub fn start_offset(&self) -> Option<u32> {
        self.instructions.first().map(|i| i.offset)
    }

    /// The label of the block's first instruction, if it has any.
    pub fn start_label(&self) -> Option<&str> {
        self.instructions.first().map(|i| i.label.as_str())
    }
}

/// A control-flow graph over TAC instructions.
#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    nodes: Vec<CfgNode>,
    regions: Vec<Region>,
}

impl ControlFlowGraph {
    /// Create a graph holding only the four distinguished nodes and the
    /// invariant exit edges.
    pub fn new() -> Self {
        let mut graph = Self {
            nodes: vec![
                CfgNode::new(CfgNodeId::ENTRY, CfgNodeKind::Entry),
                CfgNode::new(CfgNodeId::EXIT, CfgNodeKind::Exit),
                CfgNode::new(CfgNodeId::NORMAL_EXIT, CfgNodeKind::NormalExit),
                CfgNode::new(CfgNodeId::EXCEPTIONAL_EXIT, CfgNodeKind::ExceptionalExit),
            ],
            regions: Vec::new(),
        };
        graph.connect(CfgNodeId::NORMAL_EXIT, CfgNodeId::EXIT);
        graph.connect(CfgNodeId::EXCEPTIONAL_EXIT, CfgNodeId::EXIT);
        graph
    }

    /// Append a fresh basic block and return its id.
    pub fn add_basic_block(&mut self) -> CfgNodeId {
        let id = CfgNodeId(self.nodes.len() as u32);
        self.nodes.push(CfgNode::new(id, CfgNodeKind::BasicBlock));
        id
    }

    /// Add the edge `from -> to` if not already present.
    pub fn connect(&mut self, from: CfgNodeId, to: CfgNodeId) {
        if !self.nodes[from.index()].successors.contains(&to) {
            self.nodes[from.index()].successors.push(to);
        }
        if !self.nodes[to.index()].predecessors.contains(&from) {
            self.nodes[to.index()].predecessors.push(from);
        }
    }

    /// Borrow a node.
    pub fn node(&self, id: CfgNodeId) -> &CfgNode {
        &self.nodes[id.index()]
    }

    /// Mutably borrow a node.
    pub fn node_mut(&mut self, id: CfgNodeId) -> &mut CfgNode {
        &mut self.nodes[id.index()]
    }

    /// Number of nodes, distinguished nodes included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate all nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &CfgNode> {
        self.nodes.iter()
    }

    /// Iterate all node ids in id order.
    pub fn node_ids(&self) -> impl Iterator<Item = CfgNodeId> + '_ {
        (0..self.nodes.len() as u32).map(CfgNodeId)
    }

    /// Iterate the basic-block nodes in id order.
    pub fn basic_blocks(&self) -> impl Iterator<Item = &CfgNode> {
        self.nodes
            .iter()
            .filter(|node| node.kind == CfgNodeKind::BasicBlock)
    }

    /// Successor ids of a node.
    pub fn successors(&self, id: CfgNodeId) -> &[CfgNodeId] {
        &self.nodes[id.index()].successors
    }

    /// Predecessor ids of a node.
    pub fn predecessors(&self, id: CfgNodeId) -> &[CfgNodeId] {
        &self.nodes[id.index()].predecessors
    }

    /// Add a region and return its id.
    pub fn add_region(&mut self, kind: RegionKind, header: CfgNodeId) -> RegionId {
        let id = RegionId(self.regions.len() as u32);
        self.regions.push(Region {
            id,
            kind,
            header,
            nodes: FxHashSet::default(),
        });
        id
    }

    /// Borrow a region.
    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.0 as usize]
    }

    /// Mutably borrow a region.
    pub fn region_mut(&mut self, id: RegionId) -> &mut Region {
        &mut self.regions[id.0 as usize]
    }

    /// Iterate all regions.
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// Whether the edge `from -> to` is exceptional: `to` heads a handler
    /// region whose protected region contains `from`.
    pub fn is_exceptional_edge(&self, from: CfgNodeId, to: CfgNodeId) -> bool {
        self.regions.iter().any(|region| {
            if let RegionKind::Handler { protected, .. } = region.kind {
                region.header == to && self.region(protected).nodes.contains(&from)
            } else {
                false
            }
        })
    }

    /// Compute forward and backward topological indices.
    ///
    /// Forward order is reverse post-order from the entry along successor
    /// edges; backward order is reverse post-order from the exit along
    /// predecessor edges. Unreachable nodes keep `None`.
    pub fn compute_orders(&mut self) {
        for node in &mut self.nodes {
            node.forward_index = None;
            node.backward_index = None;
        }

        let forward =
            crate::util::visitor::reverse_post_order(CfgNodeId::ENTRY, |id: CfgNodeId| {
                self.nodes[id.index()].successors.clone()
            });
        for (index, id) in forward.iter().enumerate() {
            self.nodes[id.index()].forward_index = Some(index as u32);
        }

        let backward =
            crate::util::visitor::reverse_post_order(CfgNodeId::EXIT, |id: CfgNodeId| {
                self.nodes[id.index()].predecessors.clone()
            });
        for (index, id) in backward.iter().enumerate() {
            self.nodes[id.index()].backward_index = Some(index as u32);
        }
    }

    /// Node ids reachable from the entry, in forward topological order.
    /// [`ControlFlowGraph::compute_orders`] must have run.
    pub fn forward_order(&self) -> Vec<CfgNodeId> {
        let mut ordered: Vec<&CfgNode> = self
            .nodes
            .iter()
            .filter(|node| node.forward_index.is_some())
            .collect();
        ordered.sort_by_key(|node| node.forward_index);
        ordered.iter().map(|node| node.id).collect()
    }

    /// Node ids reaching the exit, in backward topological order.
    /// [`ControlFlowGraph::compute_orders`] must have run.
    pub fn backward_order(&self) -> Vec<CfgNodeId> {
        let mut ordered: Vec<&CfgNode> = self
            .nodes
            .iter()
            .filter(|node| node.backward_index.is_some())
            .collect();
        ordered.sort_by_key(|node| node.backward_index);
        ordered.iter().map(|node| node.id).collect()
    }
}

impl Default for ControlFlowGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::ir::PrettyPrint for ControlFlowGraph {
    fn pretty_print(&self) -> String {
        use std::fmt::Write;

        let mut output = String::new();
        for node in &self.nodes {
            let successors: Vec<String> = node
                .successors
                .iter()
                .map(|successor| successor.to_string())
                .collect();
            writeln!(output, "{}: -> [{}]", node.id, successors.join(", ")).unwrap();
            for instruction in &node.instructions {
                writeln!(output, "  {instruction}").unwrap();
            }
        }
        for region in &self.regions {
            let kind = match region.kind {
                RegionKind::Protected { .. } => "protected",
                RegionKind::Handler { .. } => "handler",
                RegionKind::Loop => "loop",
            };
            writeln!(
                output,
                "{} {} header {} ({} nodes)",
                region.id,
                kind,
                region.header,
                region.nodes.len()
            )
            .unwrap();
        }
        output
    }
}
