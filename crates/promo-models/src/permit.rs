//! Administrative permits and the per-type catalog entry shape

use chrono::NaiveDate;
use promo_core::traits::Id;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermitType {
    UrbanPlanning,
    Construction,
    Demolition,
    Environmental,
    Modification,
    Declaration,
}

impl PermitType {
    pub const ALL: [PermitType; 6] = [
        Self::UrbanPlanning,
        Self::Construction,
        Self::Demolition,
        Self::Environmental,
        Self::Modification,
        Self::Declaration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UrbanPlanning => "urban_planning",
            Self::Construction => "construction",
            Self::Demolition => "demolition",
            Self::Environmental => "environmental",
            Self::Modification => "modification",
            Self::Declaration => "declaration",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::UrbanPlanning => "Urban planning permit",
            Self::Construction => "Construction permit",
            Self::Demolition => "Demolition permit",
            Self::Environmental => "Environmental authorization",
            Self::Modification => "Modification permit",
            Self::Declaration => "Prior declaration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PermitStatus {
    #[default]
    Draft,
    Submitted,
    UnderReview,
    AdditionalInfoRequested,
    Approved,
    Denied,
    Appeal,
}

impl PermitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::AdditionalInfoRequested => "additional_info_requested",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Appeal => "appeal",
        }
    }
}

/// Administrative complexity, drives the duration multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very_high",
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Low => 0.8,
            Self::Medium => 1.0,
            Self::High => 1.3,
            Self::VeryHigh => 1.6,
        }
    }
}

/// Static properties of a permit type.
///
/// Prerequisites are type-level: "construction needs urban planning",
/// whatever the concrete permit instances are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermitTypeSpec {
    pub permit_type: PermitType,
    pub duration_days: u32,
    pub complexity: Complexity,
    pub public_consultation: bool,
    pub prerequisites: Vec<PermitType>,
    #[serde(default)]
    pub deliverables: Vec<String>,
    #[serde(default)]
    pub stakeholders: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permit {
    pub id: Id,
    pub project_id: Id,
    pub permit_type: PermitType,
    #[serde(default)]
    pub status: PermitStatus,
    pub permit_number: Option<String>,
    pub submitted_date: Option<NaiveDate>,
    pub expected_decision_date: Option<NaiveDate>,
    pub approval_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
}

impl Permit {
    pub fn new(id: Id, project_id: Id, permit_type: PermitType) -> Self {
        Self {
            id,
            project_id,
            permit_type,
            status: PermitStatus::Draft,
            permit_number: None,
            submitted_date: None,
            expected_decision_date: None,
            approval_date: None,
            expiry_date: None,
        }
    }

    pub fn with_status(mut self, status: PermitStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_approved(&self) -> bool {
        self.status == PermitStatus::Approved
    }

    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiry_date.map(|d| (d - today).num_days())
    }

    /// Approved and expiring within `[today, today + days]`
    pub fn is_expiring_within(&self, today: NaiveDate, days: i64) -> bool {
        self.is_approved()
            && self
                .days_until_expiry(today)
                .is_some_and(|left| (0..=days).contains(&left))
    }

    /// Still waiting on the authority past the expected decision date
    pub fn is_decision_overdue(&self, today: NaiveDate) -> bool {
        matches!(
            self.status,
            PermitStatus::Submitted | PermitStatus::UnderReview | PermitStatus::AdditionalInfoRequested
        ) && self.expected_decision_date.is_some_and(|d| d < today)
    }
}
