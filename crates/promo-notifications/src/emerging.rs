//! Emerging-risk heuristics
//!
//! Advisory signals derived from the project snapshot, not from the risk
//! register. Every signal carries the indicators that triggered it so a
//! human can judge how much to trust it.

use chrono::NaiveDate;
use promo_core::config::RiskConfig;
use promo_core::types::round2;
use promo_models::project::Project;
use promo_services::progress::ProgressAggregator;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Critical milestones closer than this are reported as threatened
pub const MILESTONE_THREAT_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmergingRiskKind {
    #[serde(rename = "schedule_risk")]
    Schedule,
    #[serde(rename = "budget_risk")]
    Budget,
    #[serde(rename = "quality_risk")]
    Quality,
}

impl EmergingRiskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Schedule => "schedule_risk",
            Self::Budget => "budget_risk",
            Self::Quality => "quality_risk",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmergingRisk {
    pub kind: EmergingRiskKind,
    pub title: String,
    pub indicators: Vec<String>,
    pub recommended_action: String,
}

impl EmergingRisk {
    fn new(kind: EmergingRiskKind, indicators: Vec<String>) -> Self {
        let (title, recommended_action) = match kind {
            EmergingRiskKind::Schedule => (
                "Project delay risk",
                "Review the schedule and identify the causes",
            ),
            EmergingRiskKind::Budget => (
                "Budget overrun risk",
                "Analyze the overrunning budget lines",
            ),
            EmergingRiskKind::Quality => ("Non-compliance risk", "Strengthen quality controls"),
        };
        Self {
            kind,
            title: title.to_string(),
            indicators,
            recommended_action: recommended_action.to_string(),
        }
    }
}

/// Pluggable quality signal.
///
/// Returns the triggering indicators, or `None` when there is nothing to
/// report.
pub trait QualityRiskPredicate: Send + Sync {
    fn detect(&self, project: &Project, today: NaiveDate) -> Option<Vec<String>>;
}

/// Reports no quality risk
#[derive(Debug, Clone, Copy, Default)]
pub struct NoQualitySignal;

impl QualityRiskPredicate for NoQualitySignal {
    fn detect(&self, _project: &Project, _today: NaiveDate) -> Option<Vec<String>> {
        None
    }
}

impl<F> QualityRiskPredicate for F
where
    F: Fn(&Project, NaiveDate) -> Option<Vec<String>> + Send + Sync,
{
    fn detect(&self, project: &Project, today: NaiveDate) -> Option<Vec<String>> {
        self(project, today)
    }
}

pub struct EmergingRiskDetector<Q = NoQualitySignal> {
    config: RiskConfig,
    quality: Q,
}

impl EmergingRiskDetector {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            quality: NoQualitySignal,
        }
    }
}

impl<Q: QualityRiskPredicate> EmergingRiskDetector<Q> {
    pub fn with_quality_predicate<P: QualityRiskPredicate>(self, quality: P) -> EmergingRiskDetector<P> {
        EmergingRiskDetector {
            config: self.config,
            quality,
        }
    }

    pub fn detect(&self, project: &Project, today: NaiveDate) -> Vec<EmergingRisk> {
        let mut risks = Vec::new();
        if self.has_schedule_risk(project, today) {
            risks.push(EmergingRisk::new(
                EmergingRiskKind::Schedule,
                schedule_indicators(project, today),
            ));
        }
        if self.has_budget_risk(project, today) {
            risks.push(EmergingRisk::new(
                EmergingRiskKind::Budget,
                budget_indicators(project),
            ));
        }
        if let Some(indicators) = self.quality.detect(project, today) {
            risks.push(EmergingRisk::new(EmergingRiskKind::Quality, indicators));
        }
        debug!(project_id = project.id, count = risks.len(), "emerging risks detected");
        risks
    }

    /// A delayed phase, or too large a share of overdue tasks
    pub fn has_schedule_risk(&self, project: &Project, today: NaiveDate) -> bool {
        if project.phases.iter().any(|p| p.is_delayed(today)) {
            return true;
        }
        let total = project.tasks().count();
        if total == 0 {
            return false;
        }
        let overdue = project.tasks().filter(|t| t.is_overdue(today)).count();
        overdue as f64 / total as f64 > self.config.overdue_task_ratio
    }

    /// Budget mostly spent while the work is not
    pub fn has_budget_risk(&self, project: &Project, today: NaiveDate) -> bool {
        let completion = ProgressAggregator::new(today).project_progress(project);
        project.budget_usage_pct() > self.config.budget_usage_pct
            && completion < self.config.completion_pct
    }
}

fn schedule_indicators(project: &Project, today: NaiveDate) -> Vec<String> {
    let mut indicators = Vec::new();
    if project.phases.iter().any(|p| p.is_delayed(today)) {
        indicators.push("Delayed phases detected".to_string());
    }
    let overdue = project.tasks().filter(|t| t.is_overdue(today)).count();
    if overdue > 0 {
        indicators.push(format!("{overdue} overdue tasks"));
    }
    let threatened = project.milestones().any(|m| {
        m.is_critical
            && !m.is_completed()
            && m.target_date
                .is_some_and(|d| (d - today).num_days() < MILESTONE_THREAT_DAYS)
    });
    if threatened {
        indicators.push("Critical milestones threatened".to_string());
    }
    indicators
}

fn budget_indicators(project: &Project) -> Vec<String> {
    let mut indicators = vec![format!("Budget {}% consumed", round2(project.budget_usage_pct()))];
    if project.is_over_budget() {
        indicators.push("Budget overrun confirmed".to_string());
    }
    indicators
}

#[cfg(test)]
mod tests {
    use super::*;
    use promo_models::milestone::Milestone;
    use promo_models::phase::{Phase, PhaseStatus};
    use promo_models::task::{Task, TaskStatus};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn tasks(total: i64, overdue: i64) -> Vec<Task> {
        (0..total)
            .map(|i| {
                let status = if i < overdue {
                    TaskStatus::Overdue
                } else {
                    TaskStatus::InProgress
                };
                Task::new(i + 1, 1, 1, format!("Task {i}")).with_status(status)
            })
            .collect()
    }

    fn project_with_tasks(total: i64, overdue: i64) -> Project {
        let mut project = Project::new(1, "Résidence du Parc");
        project.phases = vec![Phase::new(1, 1, "Travaux", 1).with_tasks(tasks(total, overdue))];
        project
    }

    #[test]
    fn test_overdue_ratio_threshold() {
        let today = d(2024, 6, 1);
        let detector = EmergingRiskDetector::new(RiskConfig::default());
        // 3/20 = 15% is not above the threshold
        assert!(!detector.has_schedule_risk(&project_with_tasks(20, 3), today));
        assert!(detector.has_schedule_risk(&project_with_tasks(20, 4), today));
        assert!(!detector.has_schedule_risk(&project_with_tasks(0, 0), today));
    }

    #[test]
    fn test_schedule_risk_indicators() {
        let today = d(2024, 6, 1);
        let mut project = project_with_tasks(4, 1);
        project.phases[0].status = PhaseStatus::Delayed;
        let mut milestone = Milestone::new(1, 1, "Hors d'eau");
        milestone.is_critical = true;
        milestone.target_date = Some(d(2024, 6, 5));
        project.phases[0].milestones.push(milestone);

        let risks = EmergingRiskDetector::new(RiskConfig::default()).detect(&project, today);
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].kind, EmergingRiskKind::Schedule);
        assert_eq!(
            risks[0].indicators,
            vec![
                "Delayed phases detected",
                "1 overdue tasks",
                "Critical milestones threatened",
            ]
        );
    }

    #[test]
    fn test_budget_risk_needs_low_completion() {
        let today = d(2024, 6, 1);
        let mut project = project_with_tasks(4, 0).with_budget(100_000.0, 95_000.0);
        let detector = EmergingRiskDetector::new(RiskConfig::default());
        let risks = detector.detect(&project, today);
        assert_eq!(risks[0].kind, EmergingRiskKind::Budget);
        assert_eq!(risks[0].indicators, vec!["Budget 95% consumed"]);

        for task in &mut project.phases[0].tasks {
            task.status = TaskStatus::Completed;
        }
        assert!(!detector.has_budget_risk(&project, today));
    }

    #[test]
    fn test_overrun_is_reported() {
        let project = project_with_tasks(1, 0).with_budget(100_000.0, 120_000.0);
        let risks = EmergingRiskDetector::new(RiskConfig::default()).detect(&project, d(2024, 6, 1));
        assert_eq!(
            risks[0].indicators,
            vec!["Budget 120% consumed", "Budget overrun confirmed"]
        );
    }

    #[test]
    fn test_quality_predicate_is_pluggable() {
        let today = d(2024, 6, 1);
        let project = project_with_tasks(2, 0);
        assert!(EmergingRiskDetector::new(RiskConfig::default())
            .detect(&project, today)
            .is_empty());

        let detector = EmergingRiskDetector::new(RiskConfig::default())
            .with_quality_predicate(|_: &Project, _: NaiveDate| {
                Some(vec!["3 open non-conformities".to_string()])
            });
        let risks = detector.detect(&project, today);
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].kind, EmergingRiskKind::Quality);
        assert_eq!(risks[0].recommended_action, "Strengthen quality controls");
    }
}
