//! Task model
//!
//! A unit of work inside a phase. Tasks carry their project id so they can
//! be linked by dependencies without looking up the owning phase.

use chrono::NaiveDate;
use promo_core::traits::{Entity, Id, Identifiable, ProjectScoped, Schedulable};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Overdue,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct Task {
    pub id: Id,
    pub phase_id: Id,
    pub project_id: Id,

    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: TaskPriority,

    #[validate(range(min = 0.0))]
    pub estimated_hours: Option<f64>,
    #[validate(range(min = 0.0))]
    pub actual_hours: Option<f64>,

    pub assigned_to_id: Option<Id>,
    pub stakeholder_id: Option<Id>,

    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Identifiable for Task {
    fn id(&self) -> Id {
        self.id
    }
}

impl ProjectScoped for Task {
    fn project_id(&self) -> Id {
        self.project_id
    }
}

impl Entity for Task {
    const TYPE_NAME: &'static str = "Task";
}

impl Schedulable for Task {
    fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }
}

impl Task {
    pub fn new(id: Id, phase_id: Id, project_id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            phase_id,
            project_id,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Flagged overdue, or still open past its end date
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.status {
            TaskStatus::Overdue => true,
            s if s.is_closed() => false,
            _ => self.end_date.is_some_and(|end| end < today),
        }
    }
}
