//! Date-driven schedule alerts: milestones, expiring permits, late phases

use chrono::NaiveDate;
use promo_core::config::ScheduleConfig;
use promo_core::traits::Id;
use promo_models::milestone::MilestoneStatus;
use promo_models::project::Project;
use serde::Serialize;
use tracing::{debug, instrument};

/// Ordered so that sorting puts the most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Danger,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleAlertKind {
    MilestoneOverdue,
    MilestoneUpcoming,
    PermitExpiring,
    PhaseDelayed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleAlert {
    pub severity: AlertSeverity,
    pub kind: ScheduleAlertKind,
    pub title: String,
    pub message: String,
    /// Milestone, permit or phase id depending on `kind`
    pub resource_id: Id,
    /// Days overdue, days left or days of delay depending on `kind`
    pub days: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleAlertService {
    config: ScheduleConfig,
}

impl ScheduleAlertService {
    pub fn new(config: ScheduleConfig) -> Self {
        Self { config }
    }

    /// All schedule alerts for `today`, most severe first.
    #[instrument(skip(self, project), fields(project_id = project.id))]
    pub fn alerts(&self, project: &Project, today: NaiveDate) -> Vec<ScheduleAlert> {
        let mut alerts = Vec::new();
        alerts.extend(self.overdue_milestones(project, today));
        alerts.extend(self.upcoming_critical_milestones(project, today));
        alerts.extend(self.expiring_permits(project, today));
        alerts.extend(self.delayed_phases(project, today));
        alerts.sort_by_key(|a| a.severity);
        debug!(count = alerts.len(), "schedule alerts computed");
        alerts
    }

    pub fn overdue_milestones(&self, project: &Project, today: NaiveDate) -> Vec<ScheduleAlert> {
        project
            .milestones()
            .filter(|m| m.is_overdue(today))
            .map(|m| {
                let days = m.days_overdue(today);
                ScheduleAlert {
                    severity: AlertSeverity::Danger,
                    kind: ScheduleAlertKind::MilestoneOverdue,
                    title: "Milestone overdue".to_string(),
                    message: format!(
                        "{} is {} days overdue (due {})",
                        m.name,
                        days,
                        fmt_date(m.target_date)
                    ),
                    resource_id: m.id,
                    days,
                }
            })
            .collect()
    }

    pub fn upcoming_critical_milestones(
        &self,
        project: &Project,
        today: NaiveDate,
    ) -> Vec<ScheduleAlert> {
        project
            .milestones()
            .filter(|m| m.is_critical && m.status == MilestoneStatus::Pending)
            .filter_map(|m| {
                let days = (m.target_date? - today).num_days();
                (0..=self.config.upcoming_milestone_days)
                    .contains(&days)
                    .then(|| ScheduleAlert {
                        severity: AlertSeverity::Warning,
                        kind: ScheduleAlertKind::MilestoneUpcoming,
                        title: "Critical milestone approaching".to_string(),
                        message: format!(
                            "{} due in {} days ({})",
                            m.name,
                            days,
                            fmt_date(m.target_date)
                        ),
                        resource_id: m.id,
                        days,
                    })
            })
            .collect()
    }

    pub fn expiring_permits(&self, project: &Project, today: NaiveDate) -> Vec<ScheduleAlert> {
        project
            .permits
            .iter()
            .filter(|p| p.is_expiring_within(today, self.config.permit_expiry_days))
            .map(|p| {
                let days = p.days_until_expiry(today).unwrap_or(0);
                ScheduleAlert {
                    severity: AlertSeverity::Warning,
                    kind: ScheduleAlertKind::PermitExpiring,
                    title: "Permit expiring soon".to_string(),
                    message: format!(
                        "{} expires in {} days ({})",
                        p.permit_type.label(),
                        days,
                        fmt_date(p.expiry_date)
                    ),
                    resource_id: p.id,
                    days,
                }
            })
            .collect()
    }

    pub fn delayed_phases(&self, project: &Project, today: NaiveDate) -> Vec<ScheduleAlert> {
        project
            .phases
            .iter()
            .filter(|p| p.is_delayed(today))
            .map(|p| {
                let days = p.delay_days(today);
                ScheduleAlert {
                    severity: AlertSeverity::Danger,
                    kind: ScheduleAlertKind::PhaseDelayed,
                    title: "Phase delayed".to_string(),
                    message: format!("{} is {} days behind schedule", p.name, days),
                    resource_id: p.id,
                    days,
                }
            })
            .collect()
    }
}

fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_default()
}
