//! Milestone model

use chrono::NaiveDate;
use promo_core::traits::Id;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Delayed,
}

impl MilestoneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Delayed => "delayed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Milestone {
    pub id: Id,
    pub phase_id: Id,
    pub name: String,
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: MilestoneStatus,
    #[serde(default)]
    pub is_critical: bool,
}

impl Milestone {
    pub fn new(id: Id, phase_id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            phase_id,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == MilestoneStatus::Completed
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_completed() && self.target_date.is_some_and(|d| d < today)
    }

    /// Days past the target date, 0 if not overdue
    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        match self.target_date {
            Some(d) if self.is_overdue(today) => (today - d).num_days(),
            _ => 0,
        }
    }
}
