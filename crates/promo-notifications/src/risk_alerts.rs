//! Risk alert engine
//!
//! Turns the risk register and the emerging-risk heuristics into alerts:
//! critical risks, risks with overdue mitigation actions, emerging risks.

use chrono::{DateTime, NaiveDate, Utc};
use promo_core::config::RiskConfig;
use promo_core::traits::Id;
use promo_models::project::Project;
use promo_models::risk::{Risk, RiskLevel, RiskRating};
use tracing::{debug, instrument};

use crate::alert::{
    ActionUrgency, Alert, AlertAction, AlertActionKind, AlertDetails, AlertLevel, AlertType,
};
use crate::emerging::{EmergingRisk, EmergingRiskDetector, NoQualitySignal, QualityRiskPredicate};

pub struct RiskAlertEngine<Q = NoQualitySignal> {
    detector: EmergingRiskDetector<Q>,
}

impl RiskAlertEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            detector: EmergingRiskDetector::new(config),
        }
    }
}

impl<Q: QualityRiskPredicate> RiskAlertEngine<Q> {
    pub fn with_detector(detector: EmergingRiskDetector<Q>) -> Self {
        Self { detector }
    }

    /// Every alert for the project, most severe first.
    ///
    /// Closed risks never alert. A risk can raise both a critical alert and
    /// an overdue-actions alert.
    #[instrument(skip(self, project), fields(project_id = project.id))]
    pub fn alerts(&self, project: &Project, today: NaiveDate, now: DateTime<Utc>) -> Vec<Alert> {
        let open: Vec<&Risk> = project.risks.iter().filter(|r| !r.is_closed()).collect();
        let mut alerts: Vec<Alert> = open
            .iter()
            .filter(|r| is_critical(r))
            .map(|r| self.critical_alert(project, r, now))
            .collect();
        alerts.extend(
            open.iter()
                .filter_map(|r| self.overdue_alert(project, r, today, now)),
        );
        alerts.extend(
            self.detector
                .detect(project, today)
                .iter()
                .map(|risk| self.emerging_alert(project, risk, now)),
        );
        alerts.sort_by_key(|a| a.level);
        debug!(count = alerts.len(), "risk alerts built");
        alerts
    }

    pub fn critical_alert(&self, project: &Project, risk: &Risk, now: DateTime<Utc>) -> Alert {
        let base = risk.description.as_deref().unwrap_or(&risk.title);
        Alert::new(
            project.id,
            AlertType::RiskAlert,
            AlertLevel::Critical,
            format!("CRITICAL ALERT: {}", risk.title),
            format!(
                "Immediate action required. {base}. Impact: {}. Probability: {}.",
                risk.impact.as_str(),
                risk.probability.as_str()
            ),
            AlertDetails::Risk {
                probability: risk.probability,
                impact: risk.impact,
                score: risk.score(),
                level: risk.level(),
            },
            now,
        )
        .with_risk(risk.id)
        .with_actions(suggested_actions(AlertLevel::Critical))
        .with_recipients(recipients(project, AlertLevel::Critical, Some(risk)))
    }

    /// `None` when no mitigation action of the risk is overdue
    pub fn overdue_alert(
        &self,
        project: &Project,
        risk: &Risk,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Option<Alert> {
        let overdue: Vec<_> = risk.overdue_actions(today).collect();
        if overdue.is_empty() {
            return None;
        }
        let alert = Alert::new(
            project.id,
            AlertType::OverdueActions,
            AlertLevel::Warning,
            format!("Overdue actions for: {}", risk.title),
            format!("{} overdue mitigation action(s)", overdue.len()),
            AlertDetails::OverdueActions {
                overdue_count: overdue.len(),
                oldest_overdue: overdue.iter().filter_map(|a| a.due_date).min(),
            },
            now,
        )
        .with_risk(risk.id)
        .with_actions(suggested_actions(AlertLevel::Warning))
        .with_recipients(recipients(project, AlertLevel::Warning, Some(risk)));
        Some(alert)
    }

    pub fn emerging_alert(&self, project: &Project, risk: &EmergingRisk, now: DateTime<Utc>) -> Alert {
        Alert::new(
            project.id,
            AlertType::EmergingRisk,
            AlertLevel::Info,
            risk.title.clone(),
            format!("Emerging risk detected: {}", risk.indicators.join(", ")),
            AlertDetails::EmergingRisk {
                risk_kind: risk.kind,
                indicators: risk.indicators.clone(),
                recommended_action: risk.recommended_action.clone(),
            },
            now,
        )
        .with_actions(suggested_actions(AlertLevel::Info))
        .with_recipients(recipients(project, AlertLevel::Info, None))
    }
}

/// Critical level, or a very likely risk whatever its impact
pub fn is_critical(risk: &Risk) -> bool {
    risk.level() == RiskLevel::Critical || risk.probability == RiskRating::VeryHigh
}

/// Who receives an alert of `level`.
///
/// Critical goes to the project manager and management stakeholders,
/// warning to the project manager and the risk's owners, info to the risk's
/// owners only. Owners are the risk owner plus every action responsible.
pub fn recipients(project: &Project, level: AlertLevel, risk: Option<&Risk>) -> Vec<Id> {
    let mut candidates: Vec<Id> = Vec::new();
    match level {
        AlertLevel::Critical => {
            candidates.extend(project.project_manager_id);
            candidates.extend(
                project
                    .stakeholders
                    .iter()
                    .filter(|s| s.is_active && s.is_management())
                    .filter_map(|s| s.user_id),
            );
        }
        AlertLevel::Warning => {
            candidates.extend(project.project_manager_id);
            candidates.extend(risk.map(risk_owners).unwrap_or_default());
        }
        AlertLevel::Info => candidates.extend(risk.map(risk_owners).unwrap_or_default()),
    }

    let mut unique = Vec::with_capacity(candidates.len());
    for id in candidates {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}

fn risk_owners(risk: &Risk) -> Vec<Id> {
    risk.owner_id
        .into_iter()
        .chain(risk.mitigation_actions.iter().filter_map(|a| a.responsible_id))
        .collect()
}

fn suggested_actions(level: AlertLevel) -> Vec<AlertAction> {
    let mut actions = match level {
        AlertLevel::Critical => vec![
            AlertAction::new(
                "Call a crisis meeting",
                AlertActionKind::ScheduleCrisisMeeting,
                ActionUrgency::Immediate,
            ),
            AlertAction::new(
                "Notify management",
                AlertActionKind::NotifyManagement,
                ActionUrgency::Immediate,
            ),
        ],
        AlertLevel::Warning => vec![AlertAction::new(
            "Schedule a review",
            AlertActionKind::ScheduleReview,
            ActionUrgency::High,
        )],
        AlertLevel::Info => Vec::new(),
    };
    actions.push(AlertAction::new(
        "View risk details",
        AlertActionKind::ViewRiskDetails,
        ActionUrgency::Normal,
    ));
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use promo_models::risk::{ActionStatus, MitigationAction, RiskStatus};
    use promo_models::stakeholder::{Stakeholder, StakeholderRole, StakeholderType};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn action(id: Id, due: NaiveDate, responsible: Id) -> MitigationAction {
        MitigationAction {
            id,
            title: format!("Action {id}"),
            due_date: Some(due),
            status: ActionStatus::InProgress,
            responsible_id: Some(responsible),
        }
    }

    fn project() -> Project {
        let mut project = Project::new(1, "Les Jardins de Seine");
        project.project_manager_id = Some(10);

        let mut director = Stakeholder::new(1, "Direction", StakeholderType::Client);
        director.role = StakeholderRole::Director;
        director.user_id = Some(20);
        let mut manager = Stakeholder::new(2, "Maîtrise d'oeuvre", StakeholderType::Architect);
        manager.role = StakeholderRole::Manager;
        manager.user_id = Some(10);
        let mut member = Stakeholder::new(3, "Plombier", StakeholderType::Subcontractor);
        member.user_id = Some(30);
        project.stakeholders = vec![director, manager, member];
        project
    }

    #[test]
    fn test_critical_risk_alert() {
        let mut project = project();
        let mut risk = Risk::new(5, 1, "Faillite entreprise", RiskRating::VeryHigh, RiskRating::VeryHigh);
        risk.description = Some("Le gros oeuvre est en redressement".into());
        project.risks.push(risk);

        let alerts = RiskAlertEngine::new(RiskConfig::default()).alerts(&project, d(2024, 6, 1), Utc::now());
        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.level, AlertLevel::Critical);
        assert_eq!(alert.risk_id, Some(5));
        assert_eq!(alert.title, "CRITICAL ALERT: Faillite entreprise");
        assert_eq!(
            alert.message,
            "Immediate action required. Le gros oeuvre est en redressement. Impact: very_high. Probability: very_high."
        );
        // Project manager first, then management, duplicates dropped
        assert_eq!(alert.recipients, vec![10, 20]);
        let kinds: Vec<_> = alert.actions.iter().map(|a| a.action).collect();
        assert_eq!(
            kinds,
            vec![
                AlertActionKind::ScheduleCrisisMeeting,
                AlertActionKind::NotifyManagement,
                AlertActionKind::ViewRiskDetails,
            ]
        );
        assert!(matches!(alert.details, AlertDetails::Risk { score: 25, .. }));
    }

    #[test]
    fn test_very_likely_risk_is_critical_whatever_impact() {
        let likely = Risk::new(1, 1, "Intempéries", RiskRating::VeryHigh, RiskRating::Low);
        assert_eq!(likely.level(), RiskLevel::Medium);
        assert!(is_critical(&likely));
        let high = Risk::new(2, 1, "Retard permis", RiskRating::High, RiskRating::High);
        assert!(!is_critical(&high));
    }

    #[test]
    fn test_overdue_actions_alert() {
        let today = d(2024, 6, 1);
        let mut project = project();
        let mut risk = Risk::new(7, 1, "Retard permis", RiskRating::High, RiskRating::High);
        risk.owner_id = Some(40);
        risk.mitigation_actions = vec![
            action(1, d(2024, 5, 20), 41),
            action(2, d(2024, 4, 2), 10),
            action(3, d(2024, 7, 1), 42),
        ];
        let mut done = action(4, d(2024, 3, 1), 43);
        done.status = ActionStatus::Completed;
        risk.mitigation_actions.push(done);
        project.risks.push(risk);

        let alerts = RiskAlertEngine::new(RiskConfig::default()).alerts(&project, today, Utc::now());
        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.level, AlertLevel::Warning);
        assert_eq!(alert.title, "Overdue actions for: Retard permis");
        assert_eq!(alert.message, "2 overdue mitigation action(s)");
        assert_eq!(
            alert.details,
            AlertDetails::OverdueActions {
                overdue_count: 2,
                oldest_overdue: Some(d(2024, 4, 2)),
            }
        );
        assert_eq!(alert.recipients, vec![10, 40, 41, 42, 43]);
        assert_eq!(alert.actions[0].urgency, ActionUrgency::High);
    }

    #[test]
    fn test_closed_risks_never_alert() {
        let mut project = project();
        let mut risk = Risk::new(5, 1, "Faillite entreprise", RiskRating::VeryHigh, RiskRating::VeryHigh);
        risk.status = RiskStatus::Closed;
        risk.mitigation_actions = vec![action(1, d(2024, 1, 1), 41)];
        project.risks.push(risk);

        let alerts = RiskAlertEngine::new(RiskConfig::default()).alerts(&project, d(2024, 6, 1), Utc::now());
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_alerts_sorted_by_level() {
        let today = d(2024, 6, 1);
        let mut project = project().with_budget(100_000.0, 95_000.0);
        let mut overdue = Risk::new(1, 1, "Retard permis", RiskRating::Medium, RiskRating::High);
        overdue.mitigation_actions = vec![action(1, d(2024, 5, 1), 41)];
        let critical = Risk::new(2, 1, "Pollution du sol", RiskRating::VeryHigh, RiskRating::High);
        project.risks = vec![overdue, critical];

        let alerts = RiskAlertEngine::new(RiskConfig::default()).alerts(&project, today, Utc::now());
        let levels: Vec<_> = alerts.iter().map(|a| a.level).collect();
        assert_eq!(
            levels,
            vec![AlertLevel::Critical, AlertLevel::Warning, AlertLevel::Info]
        );
        let info = &alerts[2];
        assert_eq!(info.alert_type, AlertType::EmergingRisk);
        assert_eq!(info.message, "Emerging risk detected: Budget 95% consumed");
        assert!(info.recipients.is_empty());
        assert_eq!(info.actions.len(), 1);
    }
}
