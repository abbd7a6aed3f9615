//! Create contract for dependencies

use promo_core::error::ValidationErrors;
use promo_models::dependency::{Dependency, NodeKind, MAX_LAG_DAYS};

use super::cycle::validate_new_edge;
use super::graph::DependencyGraph;
use super::NodeLookup;
use crate::base::{into_result, Contract, ValidationResult};

/// Contract for adding a dependency to a project's existing edge set.
///
/// `existing` must be the complete edge set of the project as read under
/// the project's insertion lock.
pub struct CreateDependencyContract<'a, N: NodeKind, L: NodeLookup<N>> {
    nodes: &'a L,
    existing: &'a [Dependency<N>],
}

impl<'a, N: NodeKind, L: NodeLookup<N>> CreateDependencyContract<'a, N, L> {
    pub fn new(nodes: &'a L, existing: &'a [Dependency<N>]) -> Self {
        Self { nodes, existing }
    }

    fn validate_lag(&self, lag_days: u32, errors: &mut ValidationErrors) {
        if lag_days > MAX_LAG_DAYS {
            errors.add(
                "lag_days",
                format!("must be less than or equal to {MAX_LAG_DAYS}"),
            );
        }
    }
}

impl<'a, N: NodeKind, L: NodeLookup<N>> Contract<Dependency<N>>
    for CreateDependencyContract<'a, N, L>
{
    fn validate(&self, entity: &Dependency<N>) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        self.validate_lag(entity.lag_days, &mut errors);

        let prerequisite = self.nodes.node_ref(entity.prerequisite_id);
        let dependent = self.nodes.node_ref(entity.dependent_id);
        if prerequisite.is_none() {
            errors.add("prerequisite_id", format!("{} does not exist", N::NAME));
        }
        if dependent.is_none() {
            errors.add("dependent_id", format!("{} does not exist", N::NAME));
        }

        if let (Some(prerequisite), Some(dependent)) = (prerequisite, dependent) {
            let graph = DependencyGraph::from_dependencies(self.existing);
            if let Err(structural) = validate_new_edge(&prerequisite, &dependent, &graph) {
                errors.merge(structural.into());
            }
        }

        into_result(errors)
    }
}
