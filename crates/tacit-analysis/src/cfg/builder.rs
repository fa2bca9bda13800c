//! Control-flow graph construction
//!
//! Partitions a TAC instruction stream into basic blocks, wires normal
//! and exceptional edges, and builds try/handler regions from the
//! exception table.

use super::node::{CfgNodeId, ControlFlowGraph};
use super::region::{HandlerKind, RegionId, RegionKind};
use crate::error::{AnalysisError, AnalysisResult};
use crate::ir::{Instruction, InstructionKind, Label, MethodBody};
use rustc_hash::{FxHashMap, FxHashSet};
use tacit_il::Handler;

/// Whether exception handlers participate in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfgMode {
    /// Handlers are excised and throws route to the normal exit.
    Normal,
    /// Handlers are included, protected regions are built, and every
    /// protected node gets an edge to its handler's header.
    Exceptional,
}

/// Builds control-flow graphs from method bodies.
#[derive(Debug, Clone, Copy)]
pub struct CfgBuilder {
    mode: CfgMode,
}

impl CfgBuilder {
    /// Create a builder for the given mode.
    pub fn new(mode: CfgMode) -> Self {
        Self { mode }
    }

    /// Build the graph for `body`.
    pub fn build(&self, body: &MethodBody) -> AnalysisResult<ControlFlowGraph> {
        let instructions = match self.mode {
            CfgMode::Normal => filter_exception_handlers(body)?,
            CfgMode::Exceptional => body.instructions.clone(),
        };

        let mut graph = ControlFlowGraph::new();
        if instructions.is_empty() {
            graph.connect(CfgNodeId::ENTRY, CfgNodeId::NORMAL_EXIT);
            graph.compute_orders();
            return Ok(graph);
        }

        let leaders = self.find_leaders(body, &instructions)?;
        let block_of_label = self.create_blocks(&mut graph, &instructions, &leaders);
        self.create_edges(&mut graph, body, &block_of_label)?;

        if self.mode == CfgMode::Exceptional {
            self.build_regions(&mut graph, body)?;
        }

        graph.compute_orders();
        Ok(graph)
    }

    /// Indices of the instructions that start a basic block.
    fn find_leaders(
        &self,
        body: &MethodBody,
        instructions: &[Instruction],
    ) -> AnalysisResult<Vec<usize>> {
        let index_of_label: FxHashMap<&Label, usize> = instructions
            .iter()
            .enumerate()
            .map(|(index, instruction)| (&instruction.label, index))
            .collect();

        let mut leaders = FxHashSet::default();
        leaders.insert(0);

        for (index, instruction) in instructions.iter().enumerate() {
            for target in instruction.kind.branch_targets() {
                match index_of_label.get(target) {
                    Some(&target_index) => {
                        leaders.insert(target_index);
                    }
                    None => {
                        return Err(AnalysisError::MalformedIr {
                            method: body.method.to_string(),
                            label: target.clone(),
                        })
                    }
                }
            }
            if instruction.kind.is_terminator() && index + 1 < instructions.len() {
                leaders.insert(index + 1);
            }
        }

        for block in body.exceptions.iter() {
            if let Some(&index) = index_of_label.get(&block.start) {
                leaders.insert(index);
            }
            if self.mode == CfgMode::Exceptional {
                match index_of_label.get(&block.handler_start) {
                    Some(&index) => {
                        leaders.insert(index);
                    }
                    None => {
                        return Err(AnalysisError::MalformedHandlerRange {
                            method: body.method.to_string(),
                            start: block.handler_start.clone(),
                            end: block.handler_end.clone(),
                        })
                    }
                }
                if let Handler::Filter { filter_start } = &block.handler {
                    if let Some(&index) = index_of_label.get(filter_start) {
                        leaders.insert(index);
                    }
                }
            }
        }

        let mut leaders: Vec<usize> = leaders.into_iter().collect();
        leaders.sort_unstable();
        Ok(leaders)
    }

    /// Create one basic block per leader, in offset order, and return the
    /// map from leader label to block id.
    fn create_blocks(
        &self,
        graph: &mut ControlFlowGraph,
        instructions: &[Instruction],
        leaders: &[usize],
    ) -> FxHashMap<Label, CfgNodeId> {
        let mut block_of_label = FxHashMap::default();

        for (position, &leader) in leaders.iter().enumerate() {
            let end = leaders
                .get(position + 1)
                .copied()
                .unwrap_or(instructions.len());
            let id = graph.add_basic_block();
            graph.node_mut(id).instructions = instructions[leader..end].to_vec();
            block_of_label.insert(instructions[leader].label.clone(), id);
        }
        block_of_label
    }

    /// Wire entry, fall-through, branch, and exit edges.
    fn create_edges(
        &self,
        graph: &mut ControlFlowGraph,
        body: &MethodBody,
        block_of_label: &FxHashMap<Label, CfgNodeId>,
    ) -> AnalysisResult<()> {
        let blocks: Vec<CfgNodeId> = graph.basic_blocks().map(|node| node.id).collect();
        graph.connect(CfgNodeId::ENTRY, blocks[0]);

        for (position, &id) in blocks.iter().enumerate() {
            let last = graph
                .node(id)
                .instructions
                .last()
                .expect("basic blocks are never empty")
                .kind
                .clone();

            for target in last.branch_targets() {
                match block_of_label.get(target) {
                    Some(&target_block) => graph.connect(id, target_block),
                    None => {
                        return Err(AnalysisError::MalformedIr {
                            method: body.method.to_string(),
                            label: target.clone(),
                        })
                    }
                }
            }

            if last.is_terminator() && !last.can_fall_through() {
                // Unconditional branch edges were added above; returns and
                // throws route to their exit node.
                match last {
                    InstructionKind::Return { .. } => {
                        graph.connect(id, CfgNodeId::NORMAL_EXIT)
                    }
                    InstructionKind::Throw { .. } => {
                        let exit = match self.mode {
                            CfgMode::Normal => CfgNodeId::NORMAL_EXIT,
                            CfgMode::Exceptional => CfgNodeId::EXCEPTIONAL_EXIT,
                        };
                        graph.connect(id, exit)
                    }
                    _ => {}
                }
            } else {
                match blocks.get(position + 1) {
                    Some(&next) => graph.connect(id, next),
                    None => graph.connect(id, CfgNodeId::NORMAL_EXIT),
                }
            }
        }
        Ok(())
    }

    /// Build protected and handler regions, then add the exceptional
    /// edges from every protected node to its handler's header.
    fn build_regions(
        &self,
        graph: &mut ControlFlowGraph,
        body: &MethodBody,
    ) -> AnalysisResult<()> {
        // Allocate the paired regions up front; headers are patched
        // during the sweep below.
        let placeholder = CfgNodeId::ENTRY;
        let mut starts: FxHashMap<&Label, Vec<RegionId>> = FxHashMap::default();
        let mut ends: FxHashMap<&Label, Vec<RegionId>> = FxHashMap::default();

        for block in body.exceptions.iter() {
            let handler_kind = match &block.handler {
                Handler::Catch { .. } | Handler::Filter { .. } => HandlerKind::Catch,
                Handler::Finally => HandlerKind::Finally,
                Handler::Fault => HandlerKind::Fault,
            };
            let protected_id =
                graph.add_region(RegionKind::Protected { handler: placeholder_region() }, placeholder);
            let handler_id = graph.add_region(
                RegionKind::Handler {
                    kind: handler_kind,
                    protected: protected_id,
                },
                placeholder,
            );
            // Patch the forward reference now that both exist.
            graph.region_mut(protected_id).kind = RegionKind::Protected {
                handler: handler_id,
            };

            starts.entry(&block.start).or_default().push(protected_id);
            ends.entry(&block.end).or_default().push(protected_id);
            starts.entry(&block.handler_start).or_default().push(handler_id);
            ends.entry(&block.handler_end).or_default().push(handler_id);
        }

        // Sweep the blocks in offset order, keeping the set of active
        // regions up to date at every block boundary.
        let blocks: Vec<CfgNodeId> = graph.basic_blocks().map(|node| node.id).collect();
        let mut active: Vec<RegionId> = Vec::new();
        let mut headed: FxHashSet<RegionId> = FxHashSet::default();

        for &id in &blocks {
            let label = graph
                .node(id)
                .start_label()
                .expect("basic blocks are never empty")
                .to_owned();

            if let Some(ending) = ends.get(&label) {
                active.retain(|region| !ending.contains(region));
            }
            if let Some(starting) = starts.get(&label) {
                for &region in starting {
                    active.push(region);
                }
            }
            for &region in &active {
                if headed.insert(region) {
                    graph.region_mut(region).header = id;
                }
                graph.region_mut(region).nodes.insert(id);
            }
        }

        // Every node of a protected region may transfer control to its
        // handler's header.
        let mut exceptional_edges: Vec<(CfgNodeId, CfgNodeId)> = Vec::new();
        for region in graph.regions() {
            if let RegionKind::Protected { handler } = region.kind {
                let handler_header = graph.region(handler).header;
                if headed.contains(&handler) {
                    for &node in &region.nodes {
                        exceptional_edges.push((node, handler_header));
                    }
                }
            }
        }
        for (from, to) in exceptional_edges {
            graph.connect(from, to);
        }
        Ok(())
    }
}

/// Dummy region id used before the real pair is patched in.
fn placeholder_region() -> RegionId {
    RegionId(u32::MAX)
}

/// Remove every instruction inside a handler span, leaving only normal
/// control flow. A handler whose start label is absent from the body is a
/// malformed precondition and reported as such.
fn filter_exception_handlers(body: &MethodBody) -> AnalysisResult<Vec<Instruction>> {
    if body.exceptions.is_empty() {
        return Ok(body.instructions.clone());
    }

    let index_of_label: FxHashMap<&Label, usize> = body
        .instructions
        .iter()
        .enumerate()
        .map(|(index, instruction)| (&instruction.label, index))
        .collect();

    let mut skip = vec![false; body.instructions.len()];
    for block in body.exceptions.iter() {
        let start = match &block.handler {
            Handler::Filter { filter_start } => filter_start,
            _ => &block.handler_start,
        };
        let Some(&start_index) = index_of_label.get(start) else {
            return Err(AnalysisError::MalformedHandlerRange {
                method: body.method.to_string(),
                start: start.clone(),
                end: block.handler_end.clone(),
            });
        };
        let end_index = index_of_label
            .get(&block.handler_end)
            .copied()
            .unwrap_or(body.instructions.len());
        for flag in &mut skip[start_index..end_index] {
            *flag = true;
        }
    }

    Ok(body
        .instructions
        .iter()
        .zip(&skip)
        .filter(|(_, &skipped)| !skipped)
        .map(|(instruction, _)| instruction.clone())
        .collect())
}
