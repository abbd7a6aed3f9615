//! Adjacency-list graph over schedulable node ids
//!
//! Edges point from prerequisite to dependent. Node order is insertion
//! order, so traversals and topological orders are deterministic.

use std::collections::{HashMap, HashSet, VecDeque};

use promo_core::error::StructuralError;
use promo_core::traits::Id;
use promo_models::dependency::{Dependency, DependencyType};

/// A typed, lagged edge `prerequisite -> dependent`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub prerequisite: Id,
    pub dependent: Id,
    pub dependency_type: DependencyType,
    pub lag_days: u32,
}

impl Edge {
    pub fn new(prerequisite: Id, dependent: Id) -> Self {
        Self {
            prerequisite,
            dependent,
            dependency_type: DependencyType::FinishToStart,
            lag_days: 0,
        }
    }
}

impl<N> From<&Dependency<N>> for Edge {
    fn from(dep: &Dependency<N>) -> Self {
        Self {
            prerequisite: dep.prerequisite_id,
            dependent: dep.dependent_id,
            dependency_type: dep.dependency_type,
            lag_days: dep.lag_days,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<Id>,
    known: HashSet<Id>,
    edges: Vec<Edge>,
    successors: HashMap<Id, Vec<usize>>,
    predecessors: HashMap<Id, Vec<usize>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from stored dependencies; nodes are implied by edges.
    pub fn from_dependencies<'a, N: 'a>(deps: impl IntoIterator<Item = &'a Dependency<N>>) -> Self {
        let mut graph = Self::new();
        for dep in deps {
            graph.add_edge(Edge::from(dep));
        }
        graph
    }

    pub fn add_node(&mut self, id: Id) {
        if self.known.insert(id) {
            self.nodes.push(id);
        }
    }

    /// Insert an edge without any check; endpoints are added as needed.
    pub fn add_edge(&mut self, edge: Edge) {
        self.add_node(edge.prerequisite);
        self.add_node(edge.dependent);
        let index = self.edges.len();
        self.edges.push(edge);
        self.successors
            .entry(edge.prerequisite)
            .or_default()
            .push(index);
        self.predecessors
            .entry(edge.dependent)
            .or_default()
            .push(index);
    }

    pub fn contains_node(&self, id: Id) -> bool {
        self.known.contains(&id)
    }

    pub fn has_edge(&self, prerequisite: Id, dependent: Id) -> bool {
        self.successors(prerequisite).any(|e| e.dependent == dependent)
    }

    pub fn nodes(&self) -> &[Id] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges leaving `id` (towards the nodes that depend on it)
    pub fn successors(&self, id: Id) -> impl Iterator<Item = &Edge> {
        self.successors
            .get(&id)
            .into_iter()
            .flatten()
            .map(move |&i| &self.edges[i])
    }

    /// Edges entering `id` (from its prerequisites)
    pub fn predecessors(&self, id: Id) -> impl Iterator<Item = &Edge> {
        self.predecessors
            .get(&id)
            .into_iter()
            .flatten()
            .map(move |&i| &self.edges[i])
    }

    pub fn is_source(&self, id: Id) -> bool {
        self.predecessors(id).next().is_none()
    }

    pub fn is_sink(&self, id: Id) -> bool {
        self.successors(id).next().is_none()
    }

    /// Shortest chain `from -> ... -> to` following edge direction.
    ///
    /// Breadth-first with a visited set, so diamonds are walked once.
    pub fn path_between(&self, from: Id, to: Id) -> Option<Vec<Id>> {
        if from == to {
            return Some(vec![from]);
        }
        let mut parent: HashMap<Id, Id> = HashMap::new();
        let mut visited: HashSet<Id> = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            for edge in self.successors(current) {
                let next = edge.dependent;
                if !visited.insert(next) {
                    continue;
                }
                parent.insert(next, current);
                if next == to {
                    let mut path = vec![to];
                    let mut cursor = to;
                    while let Some(&p) = parent.get(&cursor) {
                        path.push(p);
                        cursor = p;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }

    /// All nodes that transitively depend on `id`, breadth-first.
    pub fn descendants(&self, id: Id) -> Vec<Id> {
        let mut visited: HashSet<Id> = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        let mut out = Vec::new();
        while let Some(current) = queue.pop_front() {
            for edge in self.successors(current) {
                if visited.insert(edge.dependent) {
                    out.push(edge.dependent);
                    queue.push_back(edge.dependent);
                }
            }
        }
        out
    }

    /// Kahn's algorithm: repeatedly emit nodes with no unresolved prerequisite.
    ///
    /// Fails with the nodes left unresolved when the graph holds a cycle.
    pub fn topological_order(&self) -> Result<Vec<Id>, StructuralError> {
        let mut in_degree: HashMap<Id, usize> = self
            .nodes
            .iter()
            .map(|&id| (id, self.predecessors(id).count()))
            .collect();

        let mut ready: VecDeque<Id> = self
            .nodes
            .iter()
            .copied()
            .filter(|id| in_degree.get(id) == Some(&0))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = ready.pop_front() {
            order.push(id);
            for edge in self.successors(id) {
                if let Some(degree) = in_degree.get_mut(&edge.dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push_back(edge.dependent);
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            let nodes = self
                .nodes
                .iter()
                .copied()
                .filter(|id| in_degree.get(id).is_some_and(|&d| d > 0))
                .collect();
            return Err(StructuralError::CyclicGraph { nodes });
        }
        Ok(order)
    }
}
