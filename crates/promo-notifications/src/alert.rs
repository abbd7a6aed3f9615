//! Alert model
//!
//! Alerts are produced by the risk engine and handed to a dispatcher. They
//! carry their own recipients and a de-duplication key used by the send
//! throttling policy.

use chrono::{DateTime, NaiveDate, Utc};
use promo_core::traits::Id;
use promo_models::risk::{RiskLevel, RiskRating};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::emerging::EmergingRiskKind;

/// Alert level, ordered most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    /// Immediate action required
    Critical,
    /// Overdue mitigation work
    Warning,
    /// Emerging risk heuristics
    Info,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    RiskAlert,
    OverdueActions,
    EmergingRisk,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RiskAlert => "risk_alert",
            Self::OverdueActions => "overdue_actions",
            Self::EmergingRisk => "emerging_risk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionUrgency {
    Immediate,
    High,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertActionKind {
    ScheduleCrisisMeeting,
    NotifyManagement,
    ScheduleReview,
    ViewRiskDetails,
}

/// Follow-up suggested to the recipients of an alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertAction {
    pub label: String,
    pub action: AlertActionKind,
    pub urgency: ActionUrgency,
}

impl AlertAction {
    pub fn new(label: impl Into<String>, action: AlertActionKind, urgency: ActionUrgency) -> Self {
        Self {
            label: label.into(),
            action,
            urgency,
        }
    }
}

/// Type-specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertDetails {
    Risk {
        probability: RiskRating,
        impact: RiskRating,
        score: u8,
        level: RiskLevel,
    },
    OverdueActions {
        overdue_count: usize,
        oldest_overdue: Option<NaiveDate>,
    },
    EmergingRisk {
        risk_kind: EmergingRiskKind,
        indicators: Vec<String>,
        recommended_action: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub project_id: Id,
    /// Register entry this alert is about; emerging risks have none
    pub risk_id: Option<Id>,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub level: AlertLevel,
    pub title: String,
    pub message: String,
    pub actions: Vec<AlertAction>,
    /// User ids, de-duplicated in insertion order
    pub recipients: Vec<Id>,
    pub created_at: DateTime<Utc>,
    pub details: AlertDetails,
}

impl Alert {
    pub fn new(
        project_id: Id,
        alert_type: AlertType,
        level: AlertLevel,
        title: impl Into<String>,
        message: impl Into<String>,
        details: AlertDetails,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            risk_id: None,
            alert_type,
            level,
            title: title.into(),
            message: message.into(),
            actions: Vec::new(),
            recipients: Vec::new(),
            created_at,
            details,
        }
    }

    /// Set the risk
    pub fn with_risk(mut self, risk_id: Id) -> Self {
        self.risk_id = Some(risk_id);
        self
    }

    pub fn with_actions(mut self, actions: Vec<AlertAction>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_recipients(mut self, recipients: Vec<Id>) -> Self {
        self.recipients = recipients;
        self
    }

    /// Identifies "the same alert" across engine runs.
    ///
    /// Two alerts with equal keys are equivalent for throttling, whatever
    /// their ids and timestamps.
    pub fn dedup_key(&self) -> String {
        let subject = match (&self.details, self.risk_id) {
            (AlertDetails::EmergingRisk { risk_kind, .. }, _) => risk_kind.as_str().to_string(),
            (_, Some(risk_id)) => risk_id.to_string(),
            (_, None) => "-".to_string(),
        };
        format!("{}:{}:{}", self.project_id, self.alert_type.as_str(), subject)
    }

    pub fn is_critical(&self) -> bool {
        self.level == AlertLevel::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overdue_alert() -> Alert {
        Alert::new(
            7,
            AlertType::OverdueActions,
            AlertLevel::Warning,
            "Overdue actions for: Retard permis",
            "1 overdue mitigation action(s)",
            AlertDetails::OverdueActions {
                overdue_count: 1,
                oldest_overdue: NaiveDate::from_ymd_opt(2024, 5, 1),
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_dedup_key_ignores_identity() {
        let a = overdue_alert().with_risk(3);
        let b = overdue_alert().with_risk(3);
        assert_ne!(a.id, b.id);
        assert_eq!(a.dedup_key(), "7:overdue_actions:3");
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_emerging_key_uses_risk_kind() {
        let alert = Alert::new(
            7,
            AlertType::EmergingRisk,
            AlertLevel::Info,
            "Budget overrun risk",
            "Emerging risk detected",
            AlertDetails::EmergingRisk {
                risk_kind: EmergingRiskKind::Budget,
                indicators: vec![],
                recommended_action: String::new(),
            },
            Utc::now(),
        );
        assert_eq!(alert.dedup_key(), "7:emerging_risk:budget_risk");
    }

    #[test]
    fn test_levels_sort_most_severe_first() {
        let mut levels = vec![AlertLevel::Info, AlertLevel::Critical, AlertLevel::Warning];
        levels.sort();
        assert_eq!(
            levels,
            vec![AlertLevel::Critical, AlertLevel::Warning, AlertLevel::Info]
        );
    }

    #[test]
    fn test_alert_json_shape() {
        let json = serde_json::to_value(overdue_alert().with_risk(3)).unwrap();
        assert_eq!(json["type"], "overdue_actions");
        assert_eq!(json["level"], "warning");
        assert_eq!(json["details"]["kind"], "overdue_actions");
        assert_eq!(json["details"]["oldest_overdue"], "2024-05-01");
    }
}
