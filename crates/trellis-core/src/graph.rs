//! Module dependency graph using petgraph::StableDiGraph keyed by ModuleId

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::model::ModuleId;

/// A circular dependency, reported as a closed walk (first id == last id).
/// Derived on demand by `detect_cycles`, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircularDependency {
    pub cycle: Vec<ModuleId>,
}

impl CircularDependency {
    /// The cycle as a `→`-joined chain of file names, for diagnostics.
    pub fn chain(&self) -> String {
        cycle_chain(&self.cycle)
    }
}

/// Format a module chain as `a.fsm → b.fsm → a.fsm`.
pub fn cycle_chain(cycle: &[ModuleId]) -> String {
    cycle
        .iter()
        .map(|id| id.file_name().to_string())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Directed dependency graph over module identifiers.
///
/// An edge A→B means "A requires symbols from B". Every mutation preserves
/// the symmetry between a node's outgoing dependencies and its neighbors'
/// incoming dependents.
pub struct DependencyGraph {
    inner: StableDiGraph<ModuleId, ()>,
    index: HashMap<ModuleId, NodeIndex>,
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("module_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph {
            inner: StableDiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Add a module node. Returns false if it was already present.
    pub fn add_module(&mut self, id: &ModuleId) -> bool {
        if self.index.contains_key(id) {
            return false;
        }
        let idx = self.inner.add_node(id.clone());
        self.index.insert(id.clone(), idx);
        true
    }

    /// Record that `from` depends on `to`, creating either node as needed.
    /// Duplicate edges collapse to one.
    pub fn add_dependency(&mut self, from: &ModuleId, to: &ModuleId) {
        self.add_module(from);
        self.add_module(to);
        let a = self.index[from];
        let b = self.index[to];
        if self.inner.find_edge(a, b).is_none() {
            self.inner.add_edge(a, b, ());
        }
    }

    /// Remove the `from` → `to` edge if present.
    pub fn remove_dependency(&mut self, from: &ModuleId, to: &ModuleId) {
        let (Some(&a), Some(&b)) = (self.index.get(from), self.index.get(to)) else {
            return;
        };
        if let Some(edge) = self.inner.find_edge(a, b) {
            self.inner.remove_edge(edge);
        }
    }

    /// Remove a module and every edge referencing it in either direction.
    pub fn remove_module(&mut self, id: &ModuleId) -> bool {
        match self.index.remove(id) {
            Some(idx) => {
                self.inner.remove_node(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.index.contains_key(id)
    }

    pub fn module_count(&self) -> usize {
        self.inner.node_count()
    }

    /// All module ids, in insertion order.
    pub fn modules(&self) -> Vec<ModuleId> {
        self.inner
            .node_indices()
            .filter_map(|idx| self.inner.node_weight(idx).cloned())
            .collect()
    }

    /// Modules that `id` depends on.
    pub fn dependencies(&self, id: &ModuleId) -> Vec<ModuleId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Modules that depend on `id`.
    pub fn dependents(&self, id: &ModuleId) -> Vec<ModuleId> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &ModuleId, direction: Direction) -> Vec<ModuleId> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        self.inner
            .neighbors_directed(idx, direction)
            .filter_map(|n| self.inner.node_weight(n).cloned())
            .collect()
    }

    /// Find every cycle reachable in the graph.
    ///
    /// Depth-first search with an explicit recursion stack: hitting a node
    /// already on the stack yields the stack slice from that node's first
    /// occurrence, closed by re-appending it. Traversal continues after
    /// recording a cycle so independent cycles all surface. A self-loop is a
    /// valid length-1 cycle.
    pub fn detect_cycles(&self) -> Vec<CircularDependency> {
        let mut cycles = Vec::new();
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut on_stack: HashSet<NodeIndex> = HashSet::new();
        let mut stack: Vec<NodeIndex> = Vec::new();

        for root in self.inner.node_indices() {
            if !visited.contains(&root) {
                self.cycle_dfs(root, &mut visited, &mut on_stack, &mut stack, &mut cycles);
            }
        }
        cycles
    }

    fn cycle_dfs(
        &self,
        node: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        on_stack: &mut HashSet<NodeIndex>,
        stack: &mut Vec<NodeIndex>,
        cycles: &mut Vec<CircularDependency>,
    ) {
        on_stack.insert(node);
        stack.push(node);

        for next in self.inner.neighbors_directed(node, Direction::Outgoing) {
            if on_stack.contains(&next) {
                let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                let mut cycle: Vec<ModuleId> = stack[start..]
                    .iter()
                    .filter_map(|&n| self.inner.node_weight(n).cloned())
                    .collect();
                if let Some(weight) = self.inner.node_weight(next) {
                    cycle.push(weight.clone());
                }
                cycles.push(CircularDependency { cycle });
            } else if !visited.contains(&next) {
                self.cycle_dfs(next, visited, on_stack, stack, cycles);
            }
        }

        stack.pop();
        on_stack.remove(&node);
        visited.insert(node);
    }

    /// Dependency-safe processing order: every module appears after all
    /// modules it depends on. Returns `None` whenever `detect_cycles()` is
    /// non-empty — the cycle check is authoritative and runs first.
    pub fn topological_sort(&self) -> Option<Vec<ModuleId>> {
        if !self.detect_cycles().is_empty() {
            return None;
        }
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut order: Vec<ModuleId> = Vec::new();
        for root in self.inner.node_indices() {
            self.post_order(root, &mut visited, &mut order);
        }
        Some(order)
    }

    fn post_order(
        &self,
        node: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        order: &mut Vec<ModuleId>,
    ) {
        if !visited.insert(node) {
            return;
        }
        for next in self.inner.neighbors_directed(node, Direction::Outgoing) {
            self.post_order(next, visited, order);
        }
        if let Some(weight) = self.inner.node_weight(node) {
            order.push(weight.clone());
        }
    }

    /// Whether `to` is reachable from `from` over dependency edges.
    /// Every module trivially reaches itself.
    pub fn has_path(&self, from: &ModuleId, to: &ModuleId) -> bool {
        if from == to {
            return self.contains(from);
        }
        let (Some(&start), Some(&goal)) = (self.index.get(from), self.index.get(to)) else {
            return false;
        };
        let mut seen: HashSet<NodeIndex> = HashSet::new();
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();
        seen.insert(start);
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            for next in self.inner.neighbors_directed(current, Direction::Outgoing) {
                if next == goal {
                    return true;
                }
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
