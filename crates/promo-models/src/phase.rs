//! Phase model
//!
//! A project is cut into ordered phases (studies, permits, construction,
//! delivery...). Each phase owns its tasks and milestones.

use chrono::NaiveDate;
use promo_core::traits::{Entity, Id, Identifiable, ProjectScoped, Schedulable};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::milestone::Milestone;
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Delayed,
    Cancelled,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Delayed => "delayed",
            Self::Cancelled => "cancelled",
        }
    }
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Phase {
    pub id: Id,
    pub project_id: Id,

    #[validate(length(min = 1, max = 255))]
    pub name: String,

    /// Unique within the project
    pub position: i32,

    #[serde(default)]
    pub status: PhaseStatus,

    /// Weight in the project progress rollup
    #[serde(default = "default_weight")]
    #[validate(range(min = 0.0))]
    pub weight: f64,

    #[serde(default)]
    pub is_critical: bool,

    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub actual_start_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,

    #[serde(default)]
    #[validate]
    pub tasks: Vec<Task>,

    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

impl Default for Phase {
    fn default() -> Self {
        Self {
            id: 0,
            project_id: 0,
            name: String::new(),
            position: 0,
            status: PhaseStatus::Pending,
            weight: default_weight(),
            is_critical: false,
            start_date: None,
            end_date: None,
            actual_start_date: None,
            actual_end_date: None,
            tasks: Vec::new(),
            milestones: Vec::new(),
        }
    }
}

impl Identifiable for Phase {
    fn id(&self) -> Id {
        self.id
    }
}

impl ProjectScoped for Phase {
    fn project_id(&self) -> Id {
        self.project_id
    }
}

impl Entity for Phase {
    const TYPE_NAME: &'static str = "Phase";
}

impl Schedulable for Phase {
    fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }
}

impl Phase {
    pub fn new(id: Id, project_id: Id, name: impl Into<String>, position: i32) -> Self {
        Self {
            id,
            project_id,
            name: name.into(),
            position,
            ..Default::default()
        }
    }

    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn with_status(mut self, status: PhaseStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_tasks(mut self, tasks: Vec<Task>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == PhaseStatus::Completed
    }

    /// Days behind the planned end date.
    ///
    /// A completed phase is measured on its actual end; an unfinished one
    /// on `today`. Phases without an end date are never delayed.
    pub fn delay_days(&self, today: NaiveDate) -> i64 {
        let Some(end) = self.end_date else {
            return 0;
        };
        if self.is_completed() {
            return self
                .actual_end_date
                .map(|actual| (actual - end).num_days().max(0))
                .unwrap_or(0);
        }
        if self.status == PhaseStatus::Cancelled {
            return 0;
        }
        (today - end).num_days().max(0)
    }

    pub fn is_delayed(&self, today: NaiveDate) -> bool {
        self.status == PhaseStatus::Delayed || self.delay_days(today) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_weight_defaults_to_one() {
        let phase: Phase = serde_json::from_str(
            r#"{"id": 1, "project_id": 1, "name": "Études", "position": 1,
                "start_date": null, "end_date": null,
                "actual_start_date": null, "actual_end_date": null}"#,
        )
        .unwrap();
        assert_eq!(phase.weight, 1.0);
        assert_eq!(phase.status, PhaseStatus::Pending);
        assert!(phase.tasks.is_empty());
    }

    #[test]
    fn test_delay_of_unfinished_phase() {
        let phase = Phase::new(1, 1, "Gros œuvre", 1)
            .with_dates(d(2024, 1, 1), d(2024, 3, 1))
            .with_status(PhaseStatus::InProgress);
        assert_eq!(phase.delay_days(d(2024, 3, 11)), 10);
        assert_eq!(phase.delay_days(d(2024, 2, 1)), 0);
        assert!(phase.is_delayed(d(2024, 3, 2)));
    }

    #[test]
    fn test_delay_of_completed_phase_uses_actual_end() {
        let mut phase = Phase::new(1, 1, "Permis", 1)
            .with_dates(d(2024, 1, 1), d(2024, 3, 1))
            .with_status(PhaseStatus::Completed);
        phase.actual_end_date = Some(d(2024, 3, 6));
        assert_eq!(phase.delay_days(d(2025, 1, 1)), 5);

        phase.actual_end_date = Some(d(2024, 2, 20));
        assert_eq!(phase.delay_days(d(2025, 1, 1)), 0);
    }

    #[test]
    fn test_phase_without_end_is_never_delayed() {
        let phase = Phase::new(1, 1, "Livraison", 4);
        assert!(!phase.is_delayed(d(2030, 1, 1)));
    }
}
