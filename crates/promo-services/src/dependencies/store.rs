//! Dependency storage seam
//!
//! The persistence layer owns the dependency tables; the engine only needs
//! to read a project's edge set and insert one edge. Pair uniqueness is the
//! store's invariant, acyclicity is the engine's.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::RwLock;
use promo_core::error::PromoError;
use promo_core::result::PromoResult;
use promo_core::traits::Id;
use promo_models::dependency::{Dependency, NodeKind};
use tracing::warn;

pub trait DependencyStore<N: NodeKind>: Send + Sync {
    /// Every edge currently stored for the project
    fn list_for_project(&self, project_id: Id) -> PromoResult<Vec<Dependency<N>>>;

    /// Store a new edge; a second edge for the same pair is a conflict
    fn insert(&self, project_id: Id, dependency: Dependency<N>) -> PromoResult<Dependency<N>>;

    fn delete(&self, project_id: Id, prerequisite_id: Id, dependent_id: Id) -> PromoResult<()>;
}

/// In-memory dependency store (for development/testing)
pub struct MemoryDependencyStore<N> {
    edges: RwLock<HashMap<Id, Vec<Dependency<N>>>>,
    next_id: AtomicI64,
}

impl<N: NodeKind> Default for MemoryDependencyStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: NodeKind> MemoryDependencyStore<N> {
    pub fn new() -> Self {
        Self {
            edges: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Seed a project's edges as already persisted
    pub fn with_edges(project_id: Id, edges: Vec<Dependency<N>>) -> Self {
        let store = Self::new();
        // Seeding skips the contract; a duplicate pair keeps its first edge.
        for edge in edges {
            let (prerequisite, dependent) = edge.pair();
            if let Err(e) = store.insert(project_id, edge) {
                warn!(project_id, prerequisite, dependent, error = %e, "snapshot edge skipped");
            }
        }
        store
    }

    pub fn count(&self, project_id: Id) -> usize {
        self.edges.read().get(&project_id).map_or(0, Vec::len)
    }
}

impl<N: NodeKind> DependencyStore<N> for MemoryDependencyStore<N> {
    fn list_for_project(&self, project_id: Id) -> PromoResult<Vec<Dependency<N>>> {
        Ok(self
            .edges
            .read()
            .get(&project_id)
            .cloned()
            .unwrap_or_default())
    }

    fn insert(&self, project_id: Id, dependency: Dependency<N>) -> PromoResult<Dependency<N>> {
        let mut edges = self.edges.write();
        let project_edges = edges.entry(project_id).or_default();
        if project_edges.iter().any(|e| e.pair() == dependency.pair()) {
            return Err(PromoError::Conflict {
                message: format!(
                    "{} dependency {} -> {} already exists",
                    N::NAME,
                    dependency.prerequisite_id,
                    dependency.dependent_id
                ),
            });
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = dependency.with_id(id);
        project_edges.push(stored.clone());
        Ok(stored)
    }

    fn delete(&self, project_id: Id, prerequisite_id: Id, dependent_id: Id) -> PromoResult<()> {
        let mut edges = self.edges.write();
        let project_edges = edges.entry(project_id).or_default();
        let before = project_edges.len();
        project_edges.retain(|e| e.pair() != (prerequisite_id, dependent_id));
        if project_edges.len() == before {
            return Err(PromoError::NotFound {
                entity: "Dependency",
                field: "pair",
                value: format!("{prerequisite_id}->{dependent_id}"),
            });
        }
        Ok(())
    }
}
