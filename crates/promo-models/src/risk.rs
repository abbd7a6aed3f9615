//! Risk register model
//!
//! Probability and impact are five-step ordinal ratings; the score is
//! their product and the level is derived from score bands.

use chrono::NaiveDate;
use promo_core::traits::Id;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Five-step rating shared by probability and impact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskRating {
    VeryLow,
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
}

impl RiskRating {
    pub fn score(&self) -> u8 {
        match self {
            Self::VeryLow => 1,
            Self::Low => 2,
            Self::Medium => 3,
            Self::High => 4,
            Self::VeryHigh => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryLow => "very_low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very_high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Bands: 1-4 low, 5-12 medium, 13-20 high, 21-25 critical
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=4 => Self::Low,
            5..=12 => Self::Medium,
            13..=20 => Self::High,
            _ => Self::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskStatus {
    #[default]
    Identified,
    Active,
    Mitigated,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MitigationAction {
    pub id: Id,
    pub title: String,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: ActionStatus,
    /// User responsible for carrying out the action
    pub responsible_id: Option<Id>,
}

impl MitigationAction {
    /// Not completed and due before `today`
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != ActionStatus::Completed && self.due_date.is_some_and(|d| d < today)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Risk {
    pub id: Id,
    pub project_id: Id,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    pub probability: RiskRating,
    pub impact: RiskRating,
    #[serde(default)]
    pub status: RiskStatus,
    pub owner_id: Option<Id>,
    #[serde(default)]
    pub mitigation_actions: Vec<MitigationAction>,
}

impl Risk {
    pub fn new(
        id: Id,
        project_id: Id,
        title: impl Into<String>,
        probability: RiskRating,
        impact: RiskRating,
    ) -> Self {
        Self {
            id,
            project_id,
            title: title.into(),
            description: None,
            probability,
            impact,
            status: RiskStatus::Identified,
            owner_id: None,
            mitigation_actions: Vec::new(),
        }
    }

    /// `probability × impact`, 1..=25
    pub fn score(&self) -> u8 {
        self.probability.score() * self.impact.score()
    }

    pub fn level(&self) -> RiskLevel {
        RiskLevel::from_score(self.score())
    }

    pub fn is_closed(&self) -> bool {
        self.status == RiskStatus::Closed
    }

    pub fn overdue_actions(&self, today: NaiveDate) -> impl Iterator<Item = &MitigationAction> {
        self.mitigation_actions
            .iter()
            .filter(move |a| a.is_overdue(today))
    }
}
