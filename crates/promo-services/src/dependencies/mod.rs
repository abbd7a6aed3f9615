//! Dependency services
//!
//! Creation of phase-to-phase and task-to-task dependencies, serialized
//! per project.

mod create;
mod locks;
mod store;

pub use create::CreateDependencyService;
pub use locks::ProjectLocks;
pub use store::{DependencyStore, MemoryDependencyStore};

use promo_core::traits::Id;
use promo_models::dependency::{Dependency, DependencyType, NodeKind};

/// Dependency service params
#[derive(Debug, Clone, Default)]
pub struct DependencyParams {
    pub project_id: Id,
    pub prerequisite_id: Id,
    pub dependent_id: Id,
    pub dependency_type: Option<DependencyType>,
    pub lag_days: Option<u32>,
}

impl DependencyParams {
    pub fn new(project_id: Id, prerequisite_id: Id, dependent_id: Id) -> Self {
        Self {
            project_id,
            prerequisite_id,
            dependent_id,
            ..Default::default()
        }
    }

    pub fn with_type(mut self, dependency_type: DependencyType) -> Self {
        self.dependency_type = Some(dependency_type);
        self
    }

    pub fn with_lag(mut self, lag_days: u32) -> Self {
        self.lag_days = Some(lag_days);
        self
    }

    pub fn to_dependency<N: NodeKind>(&self) -> Dependency<N> {
        Dependency::new(self.prerequisite_id, self.dependent_id)
            .with_type(self.dependency_type.unwrap_or_default())
            .with_lag(self.lag_days.unwrap_or(0))
    }
}
