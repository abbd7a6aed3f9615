//! Permit workflow generation for a project

use chrono::NaiveDate;
use promo_core::traits::Id;
use promo_models::permit::{Complexity, Permit, PermitStatus, PermitType};
use promo_models::project::Project;
use serde::Serialize;
use tracing::{instrument, warn};

use super::catalog::PermitCatalog;

/// Review period after each major permit
pub const CHECKPOINT_REVIEW_DAYS: u32 = 5;

const MAJOR_PERMITS: [PermitType; 3] = [
    PermitType::UrbanPlanning,
    PermitType::Environmental,
    PermitType::Construction,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermitStep {
    pub name: String,
    pub permit_type: PermitType,
    pub position: usize,
    pub estimated_duration_days: u32,
    pub complexity: Complexity,
    pub public_consultation: bool,
    pub prerequisites: Vec<PermitType>,
    pub deliverables: Vec<String>,
    pub stakeholders: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Checkpoint {
    pub name: String,
    pub after: PermitType,
    /// Sits between the permit step and the next one
    pub position: f64,
    pub review_days: u32,
    pub required_actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowEntry {
    Permit(PermitStep),
    Checkpoint(Checkpoint),
}

impl WorkflowEntry {
    pub fn position(&self) -> f64 {
        match self {
            Self::Permit(step) => step.position as f64,
            Self::Checkpoint(checkpoint) => checkpoint.position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermitWorkflow {
    pub steps: Vec<PermitStep>,
    pub checkpoints: Vec<Checkpoint>,
    /// Types placed by the circular-prerequisite fallback
    pub unresolved: Vec<PermitType>,
}

impl PermitWorkflow {
    /// Steps and checkpoints interleaved by position
    pub fn entries(&self) -> Vec<WorkflowEntry> {
        let mut entries: Vec<WorkflowEntry> = self
            .steps
            .iter()
            .cloned()
            .map(WorkflowEntry::Permit)
            .chain(self.checkpoints.iter().cloned().map(WorkflowEntry::Checkpoint))
            .collect();
        entries.sort_by(|a, b| a.position().total_cmp(&b.position()));
        entries
    }

    pub fn total_duration_days(&self) -> u32 {
        self.steps.iter().map(|s| s.estimated_duration_days).sum::<u32>()
            + self.checkpoints.iter().map(|c| c.review_days).sum::<u32>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurationEstimate {
    pub permit_type: PermitType,
    pub estimated_days: u32,
    pub min_days: u32,
    pub max_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingImpact {
    Critical,
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockingPermit {
    pub permit_id: Id,
    pub permit_type: PermitType,
    pub blocked_by: PermitType,
    pub blocker_id: Id,
    pub blocker_status: PermitStatus,
    pub impact: BlockingImpact,
}

pub struct PermitWorkflowGenerator<'c> {
    catalog: &'c PermitCatalog,
}

impl Default for PermitWorkflowGenerator<'static> {
    fn default() -> Self {
        Self::new(PermitCatalog::standard())
    }
}

impl<'c> PermitWorkflowGenerator<'c> {
    pub fn new(catalog: &'c PermitCatalog) -> Self {
        Self { catalog }
    }

    /// Workflow for the permits the project's characteristics require
    #[instrument(skip(self, project), fields(project_id = project.id))]
    pub fn generate(&self, project: &Project) -> PermitWorkflow {
        self.generate_for(&project.permit_requirements.required_permit_types())
    }

    pub fn generate_for(&self, requested: &[PermitType]) -> PermitWorkflow {
        let sorted = self.catalog.sort_by_dependencies(requested);
        let mut steps = Vec::with_capacity(sorted.order.len());
        let mut checkpoints = Vec::new();

        for (position, &permit_type) in sorted.order.iter().enumerate() {
            let Some(spec) = self.catalog.get(permit_type) else {
                warn!(permit_type = permit_type.as_str(), "permit type missing from catalog, no step generated");
                continue;
            };
            steps.push(PermitStep {
                name: permit_type.label().to_string(),
                permit_type,
                position,
                estimated_duration_days: spec.duration_days,
                complexity: spec.complexity,
                public_consultation: spec.public_consultation,
                prerequisites: spec.prerequisites.clone(),
                deliverables: spec.deliverables.clone(),
                stakeholders: spec.stakeholders.clone(),
            });
            if MAJOR_PERMITS.contains(&permit_type) {
                checkpoints.push(Checkpoint {
                    name: format!("{} review", permit_type.label()),
                    after: permit_type,
                    position: position as f64 + 0.5,
                    review_days: CHECKPOINT_REVIEW_DAYS,
                    required_actions: checkpoint_actions(permit_type),
                });
            }
        }

        PermitWorkflow {
            steps,
            checkpoints,
            unresolved: sorted.unresolved,
        }
    }

    /// Base duration scaled by the project's complexity, with a ±20% range
    pub fn estimate_duration(
        &self,
        permit_type: PermitType,
        project_complexity: Complexity,
    ) -> Option<DurationEstimate> {
        let spec = self.catalog.get(permit_type)?;
        let adjusted = (f64::from(spec.duration_days) * project_complexity.multiplier()).round();
        Some(DurationEstimate {
            permit_type,
            estimated_days: adjusted as u32,
            min_days: (adjusted * 0.8).round() as u32,
            max_days: (adjusted * 1.2).round() as u32,
        })
    }

    /// Permits held back by a prerequisite permit that is not approved yet
    pub fn blocking_permits(&self, project: &Project, today: NaiveDate) -> Vec<BlockingPermit> {
        let mut blocking = Vec::new();
        for permit in project.permits.iter().filter(|p| !p.is_approved()) {
            for &prerequisite in self.catalog.prerequisites(permit.permit_type) {
                let candidates: Vec<&Permit> = project
                    .permits
                    .iter()
                    .filter(|p| p.permit_type == prerequisite)
                    .collect();
                if candidates.is_empty() || candidates.iter().any(|p| p.is_approved()) {
                    continue;
                }
                for blocker in candidates {
                    blocking.push(BlockingPermit {
                        permit_id: permit.id,
                        permit_type: permit.permit_type,
                        blocked_by: prerequisite,
                        blocker_id: blocker.id,
                        blocker_status: blocker.status,
                        impact: blocking_impact(blocker, today),
                    });
                }
            }
        }
        blocking.sort_by_key(|b| b.impact);
        blocking
    }
}

fn blocking_impact(blocker: &Permit, today: NaiveDate) -> BlockingImpact {
    if blocker.status == PermitStatus::Denied {
        BlockingImpact::Critical
    } else if blocker.is_decision_overdue(today) {
        BlockingImpact::High
    } else {
        BlockingImpact::Medium
    }
}

fn checkpoint_actions(permit_type: PermitType) -> Vec<String> {
    let actions: &[&str] = match permit_type {
        PermitType::UrbanPlanning => &["Validate urban planning compliance", "Check planning requirements"],
        PermitType::Environmental => &["Validate environmental measures", "Confirm authorizations"],
        PermitType::Construction => &["Validate execution drawings", "Confirm technical compliance"],
        _ => &["General permit validation"],
    };
    actions.iter().map(|a| a.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use promo_models::project::PermitRequirements;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn project() -> Project {
        let mut project = Project::new(1, "Quai des Brumes");
        project.permit_requirements = PermitRequirements {
            requires_demolition: true,
            requires_urban_planning: true,
            ..Default::default()
        };
        project
    }

    #[test]
    fn test_workflow_orders_steps_and_checkpoints() {
        let workflow = PermitWorkflowGenerator::default().generate(&project());
        let types: Vec<_> = workflow.steps.iter().map(|s| s.permit_type).collect();
        assert_eq!(
            types,
            vec![
                PermitType::Demolition,
                PermitType::UrbanPlanning,
                PermitType::Construction,
            ]
        );
        assert_eq!(workflow.checkpoints.len(), 2);
        assert_eq!(workflow.checkpoints[0].position, 1.5);
        assert_eq!(workflow.checkpoints[1].after, PermitType::Construction);
        assert_eq!(workflow.total_duration_days(), 45 + 90 + 60 + 2 * CHECKPOINT_REVIEW_DAYS);

        let positions: Vec<f64> = workflow.entries().iter().map(|e| e.position()).collect();
        assert_eq!(positions, vec![0.0, 1.0, 1.5, 2.0, 2.5]);
    }

    #[test]
    fn test_steps_carry_deliverables_and_stakeholders() {
        let workflow = PermitWorkflowGenerator::default().generate_for(&[PermitType::Environmental]);
        let step = &workflow.steps[0];
        assert!(step.public_consultation);
        assert_eq!(step.deliverables.len(), 3);
        assert!(step.stakeholders.contains(&"Ecologist".to_string()));
        assert_eq!(
            workflow.checkpoints[0].required_actions,
            vec!["Validate environmental measures", "Confirm authorizations"]
        );
    }

    #[test]
    fn test_uncatalogued_type_has_no_step() {
        let workflow = PermitWorkflowGenerator::default()
            .generate_for(&[PermitType::Declaration, PermitType::Demolition]);
        assert_eq!(workflow.steps.len(), 1);
        assert_eq!(workflow.steps[0].position, 1);
    }

    #[test]
    fn test_duration_estimate() {
        let generator = PermitWorkflowGenerator::default();
        let high = generator
            .estimate_duration(PermitType::UrbanPlanning, Complexity::High)
            .unwrap();
        assert_eq!((high.estimated_days, high.min_days, high.max_days), (117, 94, 140));

        let low = generator
            .estimate_duration(PermitType::Modification, Complexity::Low)
            .unwrap();
        assert_eq!((low.estimated_days, low.min_days, low.max_days), (24, 19, 29));

        assert!(generator
            .estimate_duration(PermitType::Declaration, Complexity::Medium)
            .is_none());
    }

    #[test]
    fn test_blocking_permits_by_prerequisite_status() {
        let today = d(2024, 6, 1);
        let mut urban = Permit::new(1, 1, PermitType::UrbanPlanning).with_status(PermitStatus::UnderReview);
        urban.expected_decision_date = Some(d(2024, 5, 1));
        let construction = Permit::new(2, 1, PermitType::Construction);
        let modification = Permit::new(3, 1, PermitType::Modification);

        let mut project = project();
        project.permits = vec![urban, construction, modification];

        let blocking = PermitWorkflowGenerator::default().blocking_permits(&project, today);
        assert_eq!(blocking.len(), 2);
        assert_eq!(blocking[0].permit_id, 2);
        assert_eq!(blocking[0].impact, BlockingImpact::High);
        assert_eq!(blocking[1].blocked_by, PermitType::Construction);
        assert_eq!(blocking[1].impact, BlockingImpact::Medium);

        project.permits[0].status = PermitStatus::Denied;
        let blocking = PermitWorkflowGenerator::default().blocking_permits(&project, today);
        assert_eq!(blocking[0].impact, BlockingImpact::Critical);

        project.permits[0].status = PermitStatus::Approved;
        let blocking = PermitWorkflowGenerator::default().blocking_permits(&project, today);
        assert!(blocking.iter().all(|b| b.blocked_by != PermitType::UrbanPlanning));
    }
}
