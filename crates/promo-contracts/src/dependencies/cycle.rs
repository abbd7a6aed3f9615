//! Insertion-time structural checks for a proposed dependency

use promo_core::error::StructuralError;
use promo_core::traits::Id;
use promo_models::dependency::NodeRef;
use tracing::debug;

use super::graph::DependencyGraph;

/// Answers "would `prerequisite -> dependent` close a cycle?" over an
/// existing, acyclic edge set.
pub struct CycleDetector<'g> {
    graph: &'g DependencyGraph,
}

impl<'g> CycleDetector<'g> {
    pub fn new(graph: &'g DependencyGraph) -> Self {
        Self { graph }
    }

    /// Walks forward from `dependent` through the nodes that already depend
    /// on it. Reaching `prerequisite` means the new edge closes a loop.
    pub fn would_create_cycle(&self, prerequisite: Id, dependent: Id) -> bool {
        self.cycle_path(prerequisite, dependent).is_some()
    }

    /// The existing chain `dependent -> ... -> prerequisite`, if any
    pub fn cycle_path(&self, prerequisite: Id, dependent: Id) -> Option<Vec<Id>> {
        self.graph.path_between(dependent, prerequisite)
    }
}

/// Validate a new edge against the existing graph.
///
/// Checks run in order: self-loop, cross-project pairing, cycle. Nothing is
/// mutated; the caller stores the edge only on `Ok`.
pub fn validate_new_edge(
    prerequisite: &NodeRef,
    dependent: &NodeRef,
    existing: &DependencyGraph,
) -> Result<(), StructuralError> {
    if prerequisite.id == dependent.id {
        return Err(StructuralError::SelfLoop {
            node_id: prerequisite.id,
        });
    }

    if prerequisite.project_id != dependent.project_id {
        return Err(StructuralError::CrossProject {
            prerequisite_id: prerequisite.id,
            prerequisite_project: prerequisite.project_id,
            dependent_id: dependent.id,
            dependent_project: dependent.project_id,
        });
    }

    if let Some(path) = CycleDetector::new(existing).cycle_path(prerequisite.id, dependent.id) {
        debug!(
            prerequisite = prerequisite.id,
            dependent = dependent.id,
            ?path,
            "rejecting dependency that closes a cycle"
        );
        return Err(StructuralError::Cycle {
            prerequisite_id: prerequisite.id,
            dependent_id: dependent.id,
            path,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependencies::graph::Edge;

    fn node(id: Id) -> NodeRef {
        NodeRef::new(id, 1)
    }

    fn graph(edges: &[(Id, Id)]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for &(p, d) in edges {
            g.add_edge(Edge::new(p, d));
        }
        g
    }

    #[test]
    fn test_self_loop_rejected_regardless_of_edges() {
        for existing in [graph(&[]), graph(&[(1, 2), (2, 3)])] {
            assert_eq!(
                validate_new_edge(&node(2), &node(2), &existing),
                Err(StructuralError::SelfLoop { node_id: 2 })
            );
        }
    }

    #[test]
    fn test_cross_project_rejected() {
        let err = validate_new_edge(&NodeRef::new(1, 1), &NodeRef::new(2, 2), &graph(&[]))
            .unwrap_err();
        assert!(matches!(err, StructuralError::CrossProject { .. }));
    }

    #[test]
    fn test_closing_edge_rejected_with_path() {
        // A -> B -> C, proposing C -> A
        let existing = graph(&[(1, 2), (2, 3)]);
        assert_eq!(
            validate_new_edge(&node(3), &node(1), &existing),
            Err(StructuralError::Cycle {
                prerequisite_id: 3,
                dependent_id: 1,
                path: vec![1, 2, 3],
            })
        );
    }

    #[test]
    fn test_parallel_edge_is_accepted() {
        // A -> B -> C, proposing A -> C is redundant but acyclic
        let existing = graph(&[(1, 2), (2, 3)]);
        assert!(validate_new_edge(&node(1), &node(3), &existing).is_ok());
    }

    #[test]
    fn test_diamond_terminates() {
        let existing = graph(&[(1, 2), (1, 3), (2, 4), (3, 4), (4, 5)]);
        let detector = CycleDetector::new(&existing);
        assert!(detector.would_create_cycle(5, 1));
        assert!(!detector.would_create_cycle(1, 5));
        assert!(!detector.would_create_cycle(2, 3));
    }

    #[test]
    fn test_unknown_nodes_cannot_close_a_cycle() {
        let existing = graph(&[(1, 2)]);
        assert!(validate_new_edge(&node(8), &node(9), &existing).is_ok());
    }
}
