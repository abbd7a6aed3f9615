//! Project aggregate
//!
//! The root handed to the engine: phases (with their tasks and milestones),
//! the two dependency sets, permits, risks, budget lines and stakeholders.
//! The engine reads it; it never writes back.

use chrono::NaiveDate;
use promo_core::traits::{Entity, Id, Identifiable};
use promo_core::types::percentage;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::budget::BudgetLine;
use crate::dependency::{NodeRef, PhaseDependency, TaskDependency};
use crate::milestone::Milestone;
use crate::permit::{Permit, PermitType};
use crate::phase::Phase;
use crate::risk::Risk;
use crate::stakeholder::Stakeholder;
use crate::task::Task;

/// Site characteristics that decide which permits are needed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermitRequirements {
    pub requires_demolition: bool,
    pub requires_environmental_study: bool,
    pub requires_urban_planning: bool,
    pub is_modification: bool,
}

impl PermitRequirements {
    /// Permit types this project needs; construction is always required
    pub fn required_permit_types(&self) -> Vec<PermitType> {
        let mut types = Vec::new();
        if self.requires_demolition {
            types.push(PermitType::Demolition);
        }
        if self.requires_environmental_study {
            types.push(PermitType::Environmental);
        }
        if self.requires_urban_planning {
            types.push(PermitType::UrbanPlanning);
        }
        types.push(PermitType::Construction);
        if self.is_modification {
            types.push(PermitType::Modification);
        }
        types
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct Project {
    pub id: Id,

    #[validate(length(min = 1, max = 255))]
    pub name: String,

    pub reference: Option<String>,
    pub organization_id: Id,
    pub project_manager_id: Option<Id>,

    pub start_date: Option<NaiveDate>,
    /// Target end date, seeds the schedule's backward pass
    pub end_date: Option<NaiveDate>,

    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub total_budget: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub current_spent: f64,

    #[serde(default)]
    pub permit_requirements: PermitRequirements,

    #[serde(default)]
    #[validate]
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub phase_dependencies: Vec<PhaseDependency>,
    #[serde(default)]
    pub task_dependencies: Vec<TaskDependency>,
    #[serde(default)]
    pub permits: Vec<Permit>,
    #[serde(default)]
    #[validate]
    pub risks: Vec<Risk>,
    #[serde(default)]
    #[validate]
    pub budget_lines: Vec<BudgetLine>,
    #[serde(default)]
    pub stakeholders: Vec<Stakeholder>,
}

impl Identifiable for Project {
    fn id(&self) -> Id {
        self.id
    }
}

impl Entity for Project {
    const TYPE_NAME: &'static str = "Project";
}

impl Project {
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn with_budget(mut self, total_budget: f64, current_spent: f64) -> Self {
        self.total_budget = total_budget;
        self.current_spent = current_spent;
        self
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.phases.iter().flat_map(|p| p.tasks.iter())
    }

    pub fn milestones(&self) -> impl Iterator<Item = &Milestone> {
        self.phases.iter().flat_map(|p| p.milestones.iter())
    }

    pub fn find_phase(&self, id: Id) -> Option<&Phase> {
        self.phases.iter().find(|p| p.id == id)
    }

    pub fn find_task(&self, id: Id) -> Option<&Task> {
        self.tasks().find(|t| t.id == id)
    }

    pub fn find_risk(&self, id: Id) -> Option<&Risk> {
        self.risks.iter().find(|r| r.id == id)
    }

    pub fn phase_ref(&self, id: Id) -> Option<NodeRef> {
        self.find_phase(id).map(|p| NodeRef::new(p.id, p.project_id))
    }

    pub fn task_ref(&self, id: Id) -> Option<NodeRef> {
        self.find_task(id).map(|t| NodeRef::new(t.id, t.project_id))
    }

    /// Spent over planned budget, in percent (0 without a budget)
    pub fn budget_usage_pct(&self) -> f64 {
        percentage(self.current_spent, self.total_budget)
    }

    pub fn is_over_budget(&self) -> bool {
        self.total_budget > 0.0 && self.current_spent > self.total_budget
    }

    /// Sum of actual amounts over all budget lines
    pub fn actual_cost(&self) -> f64 {
        self.budget_lines.iter().map(|l| l.actual_amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_is_always_required() {
        let reqs = PermitRequirements::default();
        assert_eq!(reqs.required_permit_types(), vec![PermitType::Construction]);

        let reqs = PermitRequirements {
            requires_demolition: true,
            requires_urban_planning: true,
            is_modification: true,
            ..Default::default()
        };
        assert_eq!(
            reqs.required_permit_types(),
            vec![
                PermitType::Demolition,
                PermitType::UrbanPlanning,
                PermitType::Construction,
                PermitType::Modification,
            ]
        );
    }

    #[test]
    fn test_lookups_walk_into_phases() {
        let mut project = Project::new(1, "Les Terrasses");
        project.phases.push(
            Phase::new(10, 1, "Études", 1).with_tasks(vec![Task::new(100, 10, 1, "Relevé")]),
        );
        assert!(project.find_task(100).is_some());
        assert_eq!(project.task_ref(100), Some(NodeRef::new(100, 1)));
        assert_eq!(project.phase_ref(11), None);
    }

    #[test]
    fn test_budget_usage() {
        let project = Project::new(1, "Résidence").with_budget(800_000.0, 905_000.0);
        assert!(project.is_over_budget());
        assert!((project.budget_usage_pct() - 113.125).abs() < 1e-9);
        assert_eq!(Project::new(2, "Vide").budget_usage_pct(), 0.0);
    }

    #[test]
    fn test_validation_rejects_empty_name() {
        let project = Project::new(1, "");
        assert!(project.validate().is_err());
    }
}
