//! What-if planning for moving a phase's start date

use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate};
use promo_contracts::dependencies::{DependencyGraph, Edge};
use promo_core::error::PromoError;
use promo_core::result::PromoResult;
use promo_core::traits::Id;
use promo_models::dependency::DependencyType;
use promo_models::phase::Phase;
use promo_models::project::Project;
use serde::Serialize;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseShift {
    pub phase_id: Id,
    pub original_start: NaiveDate,
    pub new_start: NaiveDate,
    pub new_end: Option<NaiveDate>,
    pub shift_days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReschedulePlan {
    pub phase_id: Id,
    pub original_start: Option<NaiveDate>,
    pub new_start: NaiveDate,
    /// 0 when the phase had no start date
    pub shift_days: i64,
    /// Dependents pushed later by the move, in dependency order
    pub cascading: Vec<PhaseShift>,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    start: NaiveDate,
    duration: i64,
}

impl Window {
    fn of(phase: &Phase) -> Option<Self> {
        let start = phase.start_date?;
        let duration = phase.end_date.map_or(0, |end| (end - start).num_days().max(0));
        Some(Self { start, duration })
    }

    fn end(&self) -> NaiveDate {
        self.start + Duration::days(self.duration)
    }
}

/// Earliest start `edge` allows for its dependent, in calendar days
fn required_start(edge: &Edge, prerequisite: Window, dependent_duration: i64) -> NaiveDate {
    let lag = Duration::days(i64::from(edge.lag_days));
    let own = Duration::days(dependent_duration);
    match edge.dependency_type {
        DependencyType::FinishToStart => prerequisite.end() + lag,
        DependencyType::StartToStart => prerequisite.start + lag,
        DependencyType::FinishToFinish => prerequisite.end() + lag - own,
        DependencyType::StartToFinish => prerequisite.start + lag - own,
    }
}

/// Move `phase_id` to `new_start` and push its transitive dependents.
///
/// Only dependents whose start has to move later are reported. Phases
/// without a start date are left alone.
#[instrument(skip(project), fields(project_id = project.id))]
pub fn plan_reschedule(
    project: &Project,
    phase_id: Id,
    new_start: NaiveDate,
) -> PromoResult<ReschedulePlan> {
    let phase = project
        .find_phase(phase_id)
        .ok_or_else(|| PromoError::not_found("phase", phase_id))?;

    let graph = DependencyGraph::from_dependencies(&project.phase_dependencies);
    let affected: HashSet<Id> = graph.descendants(phase_id).into_iter().collect();

    let moved = Window {
        start: new_start,
        duration: Window::of(phase).map_or(0, |w| w.duration),
    };
    let mut planned: HashMap<Id, Window> = HashMap::from([(phase_id, moved)]);
    let mut cascading = Vec::new();

    for id in graph.topological_order()? {
        if !affected.contains(&id) {
            continue;
        }
        let Some(current) = project.find_phase(id).and_then(Window::of) else {
            debug!(phase_id = id, "dependent phase has no start date, not shifted");
            continue;
        };
        let required = graph
            .predecessors(id)
            .filter_map(|edge| {
                planned
                    .get(&edge.prerequisite)
                    .map(|&pre| required_start(edge, pre, current.duration))
            })
            .max();
        let Some(required) = required.filter(|&r| r > current.start) else {
            continue;
        };

        let shifted = Window {
            start: required,
            duration: current.duration,
        };
        planned.insert(id, shifted);
        cascading.push(PhaseShift {
            phase_id: id,
            original_start: current.start,
            new_start: required,
            new_end: project
                .find_phase(id)
                .and_then(|p| p.end_date)
                .map(|_| shifted.end()),
            shift_days: (required - current.start).num_days(),
        });
    }

    debug!(shifted = cascading.len(), "reschedule planned");
    Ok(ReschedulePlan {
        phase_id,
        original_start: phase.start_date,
        new_start,
        shift_days: phase.start_date.map_or(0, |s| (new_start - s).num_days()),
        cascading,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use promo_models::dependency::PhaseDependency;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn project() -> Project {
        let mut project = Project::new(1, "Les Terrasses");
        project.phases = vec![
            Phase::new(1, 1, "Études", 1).with_dates(d(2024, 1, 1), d(2024, 1, 31)),
            Phase::new(2, 1, "Permis", 2).with_dates(d(2024, 2, 5), d(2024, 3, 5)),
            Phase::new(3, 1, "Travaux", 3).with_dates(d(2024, 3, 10), d(2024, 6, 10)),
            Phase::new(4, 1, "Commercialisation", 4).with_dates(d(2024, 1, 15), d(2024, 12, 31)),
        ];
        project.phase_dependencies = vec![PhaseDependency::new(1, 2), PhaseDependency::new(2, 3)];
        project
    }

    #[test]
    fn test_shift_cascades_through_chain() {
        let plan = plan_reschedule(&project(), 1, d(2024, 1, 15)).unwrap();
        assert_eq!(plan.shift_days, 14);
        // phase 1 now ends 2024-02-14; phase 2 keeps its 29 days
        assert_eq!(
            plan.cascading,
            vec![
                PhaseShift {
                    phase_id: 2,
                    original_start: d(2024, 2, 5),
                    new_start: d(2024, 2, 14),
                    new_end: Some(d(2024, 3, 14)),
                    shift_days: 9,
                },
                PhaseShift {
                    phase_id: 3,
                    original_start: d(2024, 3, 10),
                    new_start: d(2024, 3, 14),
                    new_end: Some(d(2024, 6, 14)),
                    shift_days: 4,
                },
            ]
        );
    }

    #[test]
    fn test_small_move_absorbed_by_slack() {
        let plan = plan_reschedule(&project(), 1, d(2024, 1, 3)).unwrap();
        assert_eq!(plan.shift_days, 2);
        assert!(plan.cascading.is_empty());
    }

    #[test]
    fn test_unrelated_phase_is_untouched() {
        let plan = plan_reschedule(&project(), 1, d(2024, 3, 1)).unwrap();
        assert!(plan.cascading.iter().all(|s| s.phase_id != 4));
    }

    #[test]
    fn test_start_to_start_uses_prerequisite_start() {
        let mut project = project();
        project.phase_dependencies = vec![PhaseDependency::new(1, 2)
            .with_type(DependencyType::StartToStart)
            .with_lag(40)];
        let plan = plan_reschedule(&project, 1, d(2024, 1, 10)).unwrap();
        assert_eq!(plan.cascading.len(), 1);
        assert_eq!(plan.cascading[0].new_start, d(2024, 2, 19));
    }

    #[test]
    fn test_unknown_phase_is_not_found() {
        let err = plan_reschedule(&project(), 42, d(2024, 1, 1)).unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
