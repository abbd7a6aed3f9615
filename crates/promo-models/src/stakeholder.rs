//! Stakeholders (architects, contractors, consultants...)

use promo_core::traits::Id;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeholderType {
    Architect,
    Engineer,
    Contractor,
    Subcontractor,
    Consultant,
    ControlOffice,
    Client,
    Investor,
    LegalAdvisor,
}

/// Role a stakeholder plays in the project's governance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StakeholderRole {
    Director,
    Manager,
    #[default]
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stakeholder {
    pub id: Id,
    pub name: String,
    pub stakeholder_type: StakeholderType,
    #[serde(default)]
    pub role: StakeholderRole,
    /// Platform user receiving notifications for this stakeholder
    pub user_id: Option<Id>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl Stakeholder {
    pub fn new(id: Id, name: impl Into<String>, stakeholder_type: StakeholderType) -> Self {
        Self {
            id,
            name: name.into(),
            stakeholder_type,
            role: StakeholderRole::Member,
            user_id: None,
            is_active: true,
        }
    }

    pub fn is_management(&self) -> bool {
        matches!(self.role, StakeholderRole::Director | StakeholderRole::Manager)
    }
}
