//! Create service for dependencies

use std::marker::PhantomData;

use promo_contracts::base::Contract;
use promo_contracts::dependencies::{CreateDependencyContract, NodeLookup};
use promo_core::error::{StructuralError, ValidationErrors};
use promo_core::result::ServiceResult;
use promo_core::traits::Id;
use promo_models::dependency::{Dependency, NodeKind};
use tracing::{info, instrument, warn};

use super::locks::ProjectLocks;
use super::store::DependencyStore;
use super::DependencyParams;
use crate::base::Callable;

/// Service for adding a dependency to a project.
///
/// The project's edge set is read, validated against and written to while
/// the project's lock is held, so the cycle check always sees a consistent
/// set of edges.
///
/// # Example
/// ```ignore
/// let service = CreateDependencyService::<PhaseNode, _, _>::new(&store, &project, &locks);
/// let result = service.call(DependencyParams::new(1, 10, 11).with_lag(5));
/// ```
pub struct CreateDependencyService<'a, N, S, L> {
    store: &'a S,
    nodes: &'a L,
    locks: &'a ProjectLocks,
    kind: PhantomData<N>,
}

impl<'a, N, S, L> CreateDependencyService<'a, N, S, L>
where
    N: NodeKind,
    S: DependencyStore<N>,
    L: NodeLookup<N>,
{
    pub fn new(store: &'a S, nodes: &'a L, locks: &'a ProjectLocks) -> Self {
        Self {
            store,
            nodes,
            locks,
            kind: PhantomData,
        }
    }

    /// Both endpoints, when they exist, must belong to the project the
    /// edge is filed under; otherwise the wrong lock and edge set are used.
    fn check_scope(&self, params: &DependencyParams) -> Result<(), ValidationErrors> {
        let project_of = |id: Id| self.nodes.node_ref(id).map(|node| node.project_id);
        let prerequisite_project = project_of(params.prerequisite_id);
        let dependent_project = project_of(params.dependent_id);
        let foreign = [prerequisite_project, dependent_project]
            .into_iter()
            .flatten()
            .any(|project| project != params.project_id);
        if !foreign {
            return Ok(());
        }
        Err(StructuralError::CrossProject {
            prerequisite_id: params.prerequisite_id,
            prerequisite_project: prerequisite_project.unwrap_or(params.project_id),
            dependent_id: params.dependent_id,
            dependent_project: dependent_project.unwrap_or(params.project_id),
        }
        .into())
    }
}

impl<'a, N, S, L> Callable<DependencyParams, Dependency<N>> for CreateDependencyService<'a, N, S, L>
where
    N: NodeKind,
    S: DependencyStore<N>,
    L: NodeLookup<N>,
{
    #[instrument(skip(self), fields(kind = N::NAME))]
    fn call(&self, params: DependencyParams) -> ServiceResult<Dependency<N>> {
        if let Err(errors) = self.check_scope(&params) {
            warn!(project_id = params.project_id, "dependency filed under a foreign project");
            return ServiceResult::failure(errors);
        }
        let dependency: Dependency<N> = params.to_dependency();

        self.locks.with_lock(params.project_id, || -> ServiceResult<Dependency<N>> {
            let existing = match self.store.list_for_project(params.project_id) {
                Ok(edges) => edges,
                Err(e) => return Err::<Dependency<N>, _>(e).into(),
            };

            let contract = CreateDependencyContract::new(self.nodes, &existing);
            if let Err(errors) = contract.validate(&dependency) {
                warn!(errors = ?errors.full_messages(), "dependency rejected");
                return ServiceResult::failure(errors);
            }

            match self.store.insert(params.project_id, dependency) {
                Ok(saved) => {
                    info!(
                        id = ?saved.id,
                        prerequisite = saved.prerequisite_id,
                        dependent = saved.dependent_id,
                        dependency_type = %saved.dependency_type,
                        "dependency created"
                    );
                    ServiceResult::success(saved)
                }
                Err(e) => Err::<Dependency<N>, _>(e).into(),
            }
        })
    }
}
