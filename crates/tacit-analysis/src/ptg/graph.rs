//! The points-to graph
//!
//! A directed multigraph of abstract heap locations with field-labeled
//! edges, plus a root map from variables to the nodes they may point to.
//! The node table is insertion-ordered so clones and unions iterate
//! identically.
//!
//! Invariants, maintained by every operation:
//! - the null node is always present (handle 0);
//! - `sources` is the exact inverse of `targets`;
//! - `node.variables` is the exact inverse of the root map;
//! - node identity is the [`PtgId`]; equal ids are merged, never
//!   duplicated.

use super::node::{PtgId, PtgNode, PtgNodeId, PtgNodeKind};
use crate::ir::Variable;
use crate::util::MultiMap;
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use std::collections::VecDeque;
use tacit_il::{FieldRef, IlType};

/// A field-sensitive points-to graph.
#[derive(Debug, Clone)]
pub struct PointsToGraph {
    nodes: IndexMap<PtgNodeId, PtgNode, FxBuildHasher>,
    ids: FxHashMap<PtgId, PtgNodeId>,
    roots: MultiMap<Variable, PtgNodeId>,
    frames: Vec<MultiMap<Variable, PtgNodeId>>,
    next_handle: u32,
}

impl PointsToGraph {
    /// Create a graph holding only the null node.
    pub fn new() -> Self {
        let mut graph = Self {
            nodes: IndexMap::default(),
            ids: FxHashMap::default(),
            roots: MultiMap::new(),
            frames: Vec::new(),
            next_handle: 0,
        };
        let null = graph.get_or_insert_node(PtgId::null(), IlType::Unknown, PtgNodeKind::Null);
        debug_assert_eq!(null, PtgNodeId::NULL);
        graph
    }

    /// Look up or create the node with the given identity.
    ///
    /// Idempotent by id. Two nodes with equal ids but incompatible kind
    /// or type indicate an id-collision bug upstream; that contract
    /// violation is fatal.
    pub fn get_or_insert_node(
        &mut self,
        id: PtgId,
        ty: IlType,
        kind: PtgNodeKind,
    ) -> PtgNodeId {
        if let Some(&handle) = self.ids.get(&id) {
            let node = self.nodes.get_mut(&handle).unwrap();
            assert!(
                node.kind.compatible(&kind) && node.ty == ty,
                "points-to node id collision: {} already exists with a different kind or type",
                id
            );
            node.kind.merge(&kind);
            return handle;
        }
        let handle = PtgNodeId(self.next_handle);
        self.next_handle += 1;
        self.ids.insert(id.clone(), handle);
        self.nodes.insert(handle, PtgNode::new(id, kind, ty));
        handle
    }

    /// The handle of a node id, if the graph has it.
    pub fn handle_of(&self, id: &PtgId) -> Option<PtgNodeId> {
        self.ids.get(id).copied()
    }

    /// Borrow a node.
    pub fn node(&self, handle: PtgNodeId) -> &PtgNode {
        &self.nodes[&handle]
    }

    /// The handle of the global static-storage node, creating it on first
    /// use.
    pub fn global_node(&mut self) -> PtgNodeId {
        self.get_or_insert_node(PtgId::global(), IlType::Unknown, PtgNodeKind::Global)
    }

    /// Iterate node handles in insertion order.
    pub fn node_handles(&self) -> impl Iterator<Item = PtgNodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Iterate nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &PtgNode> {
        self.nodes.values()
    }

    /// Number of nodes, the null node included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Register a variable with no targets.
    pub fn add_variable(&mut self, variable: Variable) {
        self.roots.add_key(variable);
    }

    /// Unregister a variable and drop all of its root edges.
    pub fn remove_variable(&mut self, variable: &Variable) {
        if let Some(targets) = self.roots.remove_key(variable) {
            for handle in targets {
                self.nodes.get_mut(&handle).unwrap().variables.remove(variable);
            }
        }
    }

    /// Whether a variable is registered.
    pub fn has_variable(&self, variable: &Variable) -> bool {
        self.roots.contains_key(variable)
    }

    /// Iterate the registered variables.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.roots.keys()
    }

    /// Add the root edge `variable -> node`.
    pub fn points_to(&mut self, variable: Variable, node: PtgNodeId) {
        self.nodes
            .get_mut(&node)
            .unwrap()
            .variables
            .insert(variable.clone());
        self.roots.insert(variable, node);
    }

    /// Add the field edge `source --field--> destination`.
    ///
    /// A lone null edge on the field is displaced first: pointing at null
    /// is the "know nothing yet" state and yields the moment any real
    /// target is learned.
    pub fn points_to_field(&mut self, source: PtgNodeId, field: &FieldRef, destination: PtgNodeId) {
        if destination != PtgNodeId::NULL {
            let only_null = self
                .nodes[&source]
                .targets
                .get(field)
                .is_some_and(|set| set.len() == 1 && set.contains(&PtgNodeId::NULL));
            if only_null {
                self.remove_field_edge(source, field, PtgNodeId::NULL);
            }
        }
        self.insert_field_edge(source, field, destination);
    }

    /// Insert a field edge with no displacement (the raw form union
    /// uses).
    fn insert_field_edge(&mut self, source: PtgNodeId, field: &FieldRef, destination: PtgNodeId) {
        self.nodes
            .get_mut(&source)
            .unwrap()
            .targets
            .entry(field.clone())
            .or_default()
            .insert(destination);
        self.nodes
            .get_mut(&destination)
            .unwrap()
            .sources
            .entry(field.clone())
            .or_default()
            .insert(source);
    }

    fn remove_field_edge(&mut self, source: PtgNodeId, field: &FieldRef, destination: PtgNodeId) {
        if let Some(set) = self.nodes.get_mut(&source).unwrap().targets.get_mut(field) {
            set.remove(&destination);
            if set.is_empty() {
                self.nodes.get_mut(&source).unwrap().targets.remove(field);
            }
        }
        if let Some(set) = self
            .nodes
            .get_mut(&destination)
            .unwrap()
            .sources
            .get_mut(field)
        {
            set.remove(&source);
            if set.is_empty() {
                self.nodes
                    .get_mut(&destination)
                    .unwrap()
                    .sources
                    .remove(field);
            }
        }
    }

    /// The nodes a variable may point to.
    pub fn get_targets(&self, variable: &Variable) -> FxHashSet<PtgNodeId> {
        self.roots
            .get(variable)
            .cloned()
            .unwrap_or_default()
    }

    /// The nodes reachable through one field hop from a variable's
    /// targets.
    pub fn get_field_targets(&self, variable: &Variable, field: &FieldRef) -> FxHashSet<PtgNodeId> {
        let mut out = FxHashSet::default();
        for handle in self.get_targets(variable) {
            if let Some(set) = self.nodes[&handle].targets.get(field) {
                out.extend(set.iter().copied());
            }
        }
        out
    }

    /// Bind a delegate node's receiver. No-op for other node kinds.
    pub fn retarget_delegate(&mut self, handle: PtgNodeId, instance: Variable) {
        if let PtgNodeKind::Delegate {
            instance: receiver, ..
        } = &mut self.nodes.get_mut(&handle).unwrap().kind
        {
            *receiver = Some(instance);
        }
    }

    /// Drop a variable's root edges but keep it registered.
    pub fn remove_edges(&mut self, variable: &Variable) {
        if let Some(targets) = self.roots.remove_key(variable) {
            for handle in targets {
                self.nodes.get_mut(&handle).unwrap().variables.remove(variable);
            }
        }
        self.roots.add_key(variable.clone());
    }

    /// Nodes reachable from a variable over field edges, not traversing
    /// through null.
    pub fn reachable_from(&self, variable: &Variable) -> FxHashSet<PtgNodeId> {
        let mut visited = self.get_targets(variable);
        let mut queue: VecDeque<PtgNodeId> = visited.iter().copied().collect();
        while let Some(handle) = queue.pop_front() {
            if handle == PtgNodeId::NULL {
                continue;
            }
            for target in self.nodes[&handle].all_targets() {
                if visited.insert(target) {
                    queue.push_back(target);
                }
            }
        }
        visited
    }

    /// Whether `node` is reachable from `variable`.
    pub fn is_reachable(&self, variable: &Variable, node: PtgNodeId) -> bool {
        self.reachable_from(variable).contains(&node)
    }

    /// Pointwise union with another graph.
    ///
    /// Nodes are joined by id; missing nodes are added, then every node's
    /// variables and edges are unioned into the local counterpart. No
    /// null displacement applies: union only ever grows the graph, which
    /// keeps it idempotent, commutative, and associative.
    pub fn union(&mut self, other: &PointsToGraph) {
        let mut translate: FxHashMap<PtgNodeId, PtgNodeId> =
            FxHashMap::with_capacity_and_hasher(other.node_count(), FxBuildHasher);
        for (&other_handle, other_node) in &other.nodes {
            let local = self.get_or_insert_node(
                other_node.id.clone(),
                other_node.ty.clone(),
                other_node.kind.clone(),
            );
            translate.insert(other_handle, local);
        }

        for (&other_handle, other_node) in &other.nodes {
            let local = translate[&other_handle];
            for (field, destinations) in &other_node.targets {
                for destination in destinations {
                    self.insert_field_edge(local, field, translate[destination]);
                }
            }
        }

        for (variable, targets) in other.roots.iter() {
            self.add_variable(variable.clone());
            for target in targets {
                self.points_to(variable.clone(), translate[target]);
            }
        }
    }

    /// Structural equality by node identity: equal root maps, equal node
    /// sets, and identical edges on every node.
    pub fn graph_equals(&self, other: &PointsToGraph) -> bool {
        if self.nodes.len() != other.nodes.len() || self.roots.len() != other.roots.len() {
            return false;
        }

        // Roots must map every variable to the same ids on both sides.
        for (variable, targets) in self.roots.iter() {
            let Some(other_targets) = other.roots.get(variable) else {
                return false;
            };
            let ours: FxHashSet<&PtgId> =
                targets.iter().map(|handle| &self.nodes[handle].id).collect();
            let theirs: FxHashSet<&PtgId> = other_targets
                .iter()
                .map(|handle| &other.nodes[handle].id)
                .collect();
            if ours != theirs {
                return false;
            }
        }

        for node in self.nodes.values() {
            let Some(other_handle) = other.ids.get(&node.id) else {
                return false;
            };
            let other_node = &other.nodes[other_handle];
            if !node.kind.compatible(&other_node.kind) || node.ty != other_node.ty {
                return false;
            }
            if node.variables != other_node.variables {
                return false;
            }
            if !edges_equal(self, &node.targets, other, &other_node.targets)
                || !edges_equal(self, &node.sources, other, &other_node.sources)
            {
                return false;
            }
        }
        true
    }

    /// Push the current roots and start an empty frame; the node graph is
    /// shared across frames.
    pub fn new_frame(&mut self) {
        let previous = std::mem::take(&mut self.roots);
        for (_, node) in self.nodes.iter_mut() {
            node.variables.clear();
        }
        self.frames.push(previous);
    }

    /// Push a frame and bind each callee formal to the targets of the
    /// corresponding caller actual.
    pub fn new_frame_with(&mut self, binding: &[(Variable, Variable)]) {
        let bound: Vec<(Variable, FxHashSet<PtgNodeId>)> = binding
            .iter()
            .map(|(formal, actual)| (formal.clone(), self.get_targets(actual)))
            .collect();
        self.new_frame();
        for (formal, targets) in bound {
            self.add_variable(formal.clone());
            for target in targets {
                self.points_to(formal.clone(), target);
            }
        }
    }

    /// Pop the top frame, re-link the restored roots, optionally route
    /// the callee's return targets into a caller variable, then collect
    /// every node no longer reachable from any root.
    pub fn restore_frame(&mut self, return_value: Option<(&Variable, &Variable)>) {
        let return_targets =
            return_value.map(|(callee_return, _)| self.get_targets(callee_return));

        let restored = self.frames.pop().unwrap_or_default();
        self.roots = restored;
        for (_, node) in self.nodes.iter_mut() {
            node.variables.clear();
        }
        let links: Vec<(Variable, PtgNodeId)> = self
            .roots
            .iter()
            .flat_map(|(variable, targets)| {
                targets.iter().map(move |&target| (variable.clone(), target))
            })
            .collect();
        for (variable, target) in links {
            self.nodes
                .get_mut(&target)
                .unwrap()
                .variables
                .insert(variable);
        }

        if let (Some(targets), Some((_, destination))) = (return_targets, return_value) {
            self.remove_edges(destination);
            for target in targets {
                self.points_to(destination.clone(), target);
            }
        }

        self.collect_garbage();
    }

    /// Remove every node unreachable from the current roots. The null
    /// and global singletons are anchors and always survive.
    fn collect_garbage(&mut self) {
        let mut live: FxHashSet<PtgNodeId> = FxHashSet::default();
        live.insert(PtgNodeId::NULL);
        if let Some(global) = self.handle_of(&PtgId::global()) {
            live.insert(global);
        }
        let mut queue: VecDeque<PtgNodeId> = live.iter().copied().collect();
        for (_, targets) in self.roots.iter() {
            for &target in targets {
                if live.insert(target) {
                    queue.push_back(target);
                }
            }
        }
        while let Some(handle) = queue.pop_front() {
            for target in self.nodes[&handle].all_targets() {
                if live.insert(target) {
                    queue.push_back(target);
                }
            }
        }

        let dead: Vec<PtgNodeId> = self
            .nodes
            .keys()
            .copied()
            .filter(|handle| !live.contains(handle))
            .collect();
        for handle in dead {
            let node = self.nodes.shift_remove(&handle).unwrap();
            self.ids.remove(&node.id);
            for (field, destinations) in &node.targets {
                for destination in destinations {
                    if let Some(survivor) = self.nodes.get_mut(destination) {
                        if let Some(set) = survivor.sources.get_mut(field) {
                            set.remove(&handle);
                            if set.is_empty() {
                                survivor.sources.remove(field);
                            }
                        }
                    }
                }
            }
            for (field, origins) in &node.sources {
                for origin in origins {
                    if let Some(survivor) = self.nodes.get_mut(origin) {
                        if let Some(set) = survivor.targets.get_mut(field) {
                            set.remove(&handle);
                            if set.is_empty() {
                                survivor.targets.remove(field);
                            }
                        }
                    }
                }
            }
        }
    }
}

impl Default for PointsToGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare two edge maps by node identity.
fn edges_equal(
    graph: &PointsToGraph,
    edges: &FxHashMap<FieldRef, FxHashSet<PtgNodeId>>,
    other_graph: &PointsToGraph,
    other_edges: &FxHashMap<FieldRef, FxHashSet<PtgNodeId>>,
) -> bool {
    if edges.len() != other_edges.len() {
        return false;
    }
    edges.iter().all(|(field, handles)| {
        let Some(other_handles) = other_edges.get(field) else {
            return false;
        };
        let ours: FxHashSet<&PtgId> = handles
            .iter()
            .map(|handle| &graph.node(*handle).id)
            .collect();
        let theirs: FxHashSet<&PtgId> = other_handles
            .iter()
            .map(|handle| &other_graph.node(*handle).id)
            .collect();
        ours == theirs
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tacit_il::{MethodRef, TypeRef};

    fn method() -> MethodRef {
        MethodRef::static_method(TypeRef::new("C"), "M", IlType::named("System.Void"))
    }

    fn node_ty() -> IlType {
        IlType::named("Node")
    }

    fn next_field() -> FieldRef {
        FieldRef::instance(TypeRef::new("Node"), "next", node_ty())
    }

    fn var(name: &str) -> Variable {
        Variable::local(name, node_ty())
    }

    #[test]
    fn test_null_node_always_present() {
        let graph = PointsToGraph::new();
        assert_eq!(graph.node_count(), 1);
        assert!(graph.node(PtgNodeId::NULL).is_null());
    }

    #[test]
    fn test_get_or_insert_is_idempotent() {
        let mut graph = PointsToGraph::new();
        let id = PtgId::at_offset(method(), 4);
        let first = graph.get_or_insert_node(id.clone(), node_ty(), PtgNodeKind::Object);
        let second = graph.get_or_insert_node(id, node_ty(), PtgNodeKind::Object);
        assert_eq!(first, second);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    #[should_panic(expected = "id collision")]
    fn test_id_collision_is_fatal() {
        let mut graph = PointsToGraph::new();
        let id = PtgId::at_offset(method(), 4);
        graph.get_or_insert_node(id.clone(), node_ty(), PtgNodeKind::Object);
        graph.get_or_insert_node(id, node_ty(), PtgNodeKind::Unknown);
    }

    #[test]
    fn test_root_coherence() {
        let mut graph = PointsToGraph::new();
        let obj = graph.get_or_insert_node(
            PtgId::at_offset(method(), 4),
            node_ty(),
            PtgNodeKind::Object,
        );
        let p = var("p");
        graph.points_to(p.clone(), obj);

        assert!(graph.get_targets(&p).contains(&obj));
        assert!(graph.node(obj).variables.contains(&p));

        graph.remove_edges(&p);
        assert!(graph.get_targets(&p).is_empty());
        assert!(graph.has_variable(&p));
        assert!(!graph.node(obj).variables.contains(&p));
    }

    #[test]
    fn test_edge_symmetry() {
        let mut graph = PointsToGraph::new();
        let a = graph.get_or_insert_node(
            PtgId::at_offset(method(), 0),
            node_ty(),
            PtgNodeKind::Object,
        );
        let b = graph.get_or_insert_node(
            PtgId::at_offset(method(), 8),
            node_ty(),
            PtgNodeKind::Object,
        );
        let field = next_field();
        graph.points_to_field(a, &field, b);

        assert!(graph.node(a).targets[&field].contains(&b));
        assert!(graph.node(b).sources[&field].contains(&a));
    }

    #[test]
    fn test_null_displacement() {
        let mut graph = PointsToGraph::new();
        let a = graph.get_or_insert_node(
            PtgId::at_offset(method(), 0),
            node_ty(),
            PtgNodeKind::Object,
        );
        let b = graph.get_or_insert_node(
            PtgId::at_offset(method(), 8),
            node_ty(),
            PtgNodeKind::Object,
        );
        let field = next_field();

        graph.points_to_field(a, &field, PtgNodeId::NULL);
        assert!(graph.node(a).targets[&field].contains(&PtgNodeId::NULL));

        // The first real target displaces the lone null edge.
        graph.points_to_field(a, &field, b);
        assert!(!graph.node(a).targets[&field].contains(&PtgNodeId::NULL));
        assert!(graph.node(a).targets[&field].contains(&b));
        assert!(!graph.node(PtgNodeId::NULL).sources.contains_key(&field));

        // Further targets accumulate: this is a may-analysis.
        graph.points_to_field(a, &field, PtgNodeId::NULL);
        assert_eq!(graph.node(a).targets[&field].len(), 2);
    }

    #[test]
    fn test_clone_preserves_identity_and_equality() {
        let mut graph = PointsToGraph::new();
        let obj = graph.get_or_insert_node(
            PtgId::at_offset(method(), 4),
            node_ty(),
            PtgNodeKind::Object,
        );
        graph.points_to(var("p"), obj);
        graph.points_to_field(obj, &next_field(), PtgNodeId::NULL);

        let copy = graph.clone();
        assert!(graph.graph_equals(&copy));
        assert!(copy.graph_equals(&graph));
    }

    #[test]
    fn test_union_is_idempotent_and_commutative() {
        let mut left = PointsToGraph::new();
        let a = left.get_or_insert_node(
            PtgId::at_offset(method(), 0),
            node_ty(),
            PtgNodeKind::Object,
        );
        left.points_to(var("p"), a);

        let mut right = PointsToGraph::new();
        let b = right.get_or_insert_node(
            PtgId::at_offset(method(), 8),
            node_ty(),
            PtgNodeKind::Object,
        );
        right.points_to(var("p"), b);
        right.points_to_field(b, &next_field(), PtgNodeId::NULL);

        let mut left_right = left.clone();
        left_right.union(&right);
        let mut right_left = right.clone();
        right_left.union(&left);
        assert!(left_right.graph_equals(&right_left));

        // Unioning again changes nothing.
        let mut again = left_right.clone();
        again.union(&right);
        assert!(again.graph_equals(&left_right));

        // p now points to both allocation sites.
        assert_eq!(left_right.get_targets(&var("p")).len(), 2);
    }

    #[test]
    fn test_union_does_not_displace_null() {
        // a.f = {null} on one side, a.f = {b} on the other: union keeps
        // both, because union is not a store.
        let mut left = PointsToGraph::new();
        let a_left = left.get_or_insert_node(
            PtgId::at_offset(method(), 0),
            node_ty(),
            PtgNodeKind::Object,
        );
        left.points_to_field(a_left, &next_field(), PtgNodeId::NULL);

        let mut right = PointsToGraph::new();
        let a_right = right.get_or_insert_node(
            PtgId::at_offset(method(), 0),
            node_ty(),
            PtgNodeKind::Object,
        );
        let b = right.get_or_insert_node(
            PtgId::at_offset(method(), 8),
            node_ty(),
            PtgNodeKind::Object,
        );
        right.points_to_field(a_right, &next_field(), b);

        left.union(&right);
        assert_eq!(left.node(a_left).targets[&next_field()].len(), 2);
    }

    #[test]
    fn test_frames_restore_and_collect() {
        let mut graph = PointsToGraph::new();
        let caller_obj = graph.get_or_insert_node(
            PtgId::at_offset(method(), 0),
            node_ty(),
            PtgNodeKind::Object,
        );
        let p = var("p");
        graph.points_to(p.clone(), caller_obj);

        // Enter a callee binding formal q to actual p.
        let q = var("q");
        graph.new_frame_with(&[(q.clone(), p.clone())]);
        assert!(graph.get_targets(&p).is_empty());
        assert_eq!(graph.get_targets(&q), {
            let mut set = FxHashSet::default();
            set.insert(caller_obj);
            set
        });

        // The callee allocates and returns a fresh object.
        let callee_method =
            MethodRef::static_method(TypeRef::new("C"), "Callee", node_ty());
        let fresh = graph.get_or_insert_node(
            PtgId::at_offset(callee_method.clone(), 4),
            node_ty(),
            PtgNodeKind::Object,
        );
        let rv = Variable::result_variable(node_ty());
        graph.points_to(rv.clone(), fresh);

        // A callee-private allocation that escapes nowhere.
        let garbage = graph.get_or_insert_node(
            PtgId::at_offset(callee_method, 8),
            node_ty(),
            PtgNodeKind::Object,
        );
        let local = var("t");
        graph.points_to(local, garbage);
        graph.remove_edges(&var("t"));

        let dest = var("r");
        graph.restore_frame(Some((&rv, &dest)));

        // Caller roots are back, the return value reached `r`, and the
        // dead callee allocation is gone.
        assert!(graph.get_targets(&p).contains(&caller_obj));
        assert!(graph.get_targets(&dest).contains(&fresh));
        assert!(graph.handle_of(&PtgId::at_offset(
            MethodRef::static_method(TypeRef::new("C"), "Callee", node_ty()),
            8
        ))
        .is_none());
    }

    #[test]
    fn test_reachability_stops_at_null() {
        let mut graph = PointsToGraph::new();
        let a = graph.get_or_insert_node(
            PtgId::at_offset(method(), 0),
            node_ty(),
            PtgNodeKind::Object,
        );
        let b = graph.get_or_insert_node(
            PtgId::at_offset(method(), 8),
            node_ty(),
            PtgNodeKind::Object,
        );
        let p = var("p");
        graph.points_to(p.clone(), a);
        graph.points_to_field(a, &next_field(), b);
        graph.points_to_field(b, &next_field(), PtgNodeId::NULL);

        let reachable = graph.reachable_from(&p);
        assert!(reachable.contains(&a));
        assert!(reachable.contains(&b));
        assert!(reachable.contains(&PtgNodeId::NULL));
        assert!(graph.is_reachable(&p, b));
    }
}
