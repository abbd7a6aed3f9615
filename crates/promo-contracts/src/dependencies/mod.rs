//! Dependency contracts
//!
//! Graph representation, cycle detection and the create contract for
//! phase-to-phase and task-to-task dependencies.

pub mod create;
pub mod cycle;
pub mod graph;

use std::collections::HashMap;

use promo_core::traits::Id;
use promo_models::dependency::{NodeKind, NodeRef, PhaseNode, TaskNode};
use promo_models::project::Project;

pub use create::CreateDependencyContract;
pub use cycle::{validate_new_edge, CycleDetector};
pub use graph::{DependencyGraph, Edge};

/// Resolves a node id of kind `N` to its owning project
pub trait NodeLookup<N: NodeKind>: Send + Sync {
    fn node_ref(&self, id: Id) -> Option<NodeRef>;
}

impl NodeLookup<PhaseNode> for Project {
    fn node_ref(&self, id: Id) -> Option<NodeRef> {
        self.phase_ref(id)
    }
}

impl NodeLookup<TaskNode> for Project {
    fn node_ref(&self, id: Id) -> Option<NodeRef> {
        self.task_ref(id)
    }
}

impl<N: NodeKind> NodeLookup<N> for HashMap<Id, NodeRef> {
    fn node_ref(&self, id: Id) -> Option<NodeRef> {
        self.get(&id).copied()
    }
}
