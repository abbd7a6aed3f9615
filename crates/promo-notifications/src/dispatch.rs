//! Alert dispatch
//!
//! Applies the throttling policy, hands each alert to a notifier once per
//! recipient and records what went out in the alert log.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use promo_core::traits::Id;
use promo_models::project::Project;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::alert::Alert;
use crate::throttle::{AlertLog, ThrottlePolicy};

/// Notifier errors
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(Id),
}

pub type NotifyResult<T> = Result<T, NotifyError>;

/// Delivery transport, owned by the caller
pub trait AlertNotifier: Send + Sync {
    fn notify(&self, recipient: Id, alert: &Alert, project: &Project) -> NotifyResult<()>;
}

/// Logs each delivery instead of sending it
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl AlertNotifier for TracingNotifier {
    fn notify(&self, recipient: Id, alert: &Alert, project: &Project) -> NotifyResult<()> {
        info!(
            project_id = project.id,
            recipient,
            alert_id = %alert.id,
            level = alert.level.as_str(),
            title = %alert.title,
            "alert delivered"
        );
        Ok(())
    }
}

/// Keeps every delivery in memory (for development/testing)
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    deliveries: Mutex<Vec<(Id, Uuid)>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(recipient, alert id)` pairs in delivery order
    pub fn deliveries(&self) -> Vec<(Id, Uuid)> {
        self.deliveries.lock().clone()
    }
}

impl AlertNotifier for MemoryNotifier {
    fn notify(&self, recipient: Id, alert: &Alert, _project: &Project) -> NotifyResult<()> {
        self.deliveries.lock().push((recipient, alert.id));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Delivered to at least one recipient and recorded as sent
    Sent { delivered: usize, failed: usize },
    /// An equivalent alert went out within the level's window
    Suppressed,
    /// Nobody to deliver to; not recorded
    NoRecipients,
    /// Every delivery failed; not recorded so the next run retries
    Failed { failed: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub outcomes: Vec<(Uuid, DispatchOutcome)>,
}

impl DispatchReport {
    pub fn sent_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, DispatchOutcome::Sent { .. }))
            .count()
    }

    pub fn suppressed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == DispatchOutcome::Suppressed)
            .count()
    }

    pub fn outcome(&self, alert_id: Uuid) -> Option<&DispatchOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| *id == alert_id)
            .map(|(_, o)| o)
    }
}

pub struct AlertDispatcher<L: AlertLog, N: AlertNotifier> {
    policy: ThrottlePolicy,
    log: L,
    notifier: N,
}

impl<L: AlertLog, N: AlertNotifier> AlertDispatcher<L, N> {
    pub fn new(policy: ThrottlePolicy, log: L, notifier: N) -> Self {
        Self {
            policy,
            log,
            notifier,
        }
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn dispatch(&self, project: &Project, alerts: &[Alert], now: DateTime<Utc>) -> DispatchReport {
        let outcomes = alerts
            .iter()
            .map(|alert| (alert.id, self.dispatch_one(project, alert, now)))
            .collect();
        DispatchReport { outcomes }
    }

    fn dispatch_one(&self, project: &Project, alert: &Alert, now: DateTime<Utc>) -> DispatchOutcome {
        if !self.policy.should_send(alert, &self.log, now) {
            debug!(key = %alert.dedup_key(), "alert sent recently, suppressed");
            return DispatchOutcome::Suppressed;
        }
        if alert.recipients.is_empty() {
            debug!(key = %alert.dedup_key(), "alert has no recipients");
            return DispatchOutcome::NoRecipients;
        }

        let mut delivered = 0;
        let mut failed = 0;
        for &recipient in &alert.recipients {
            match self.notifier.notify(recipient, alert, project) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(recipient, alert_id = %alert.id, error = %e, "alert delivery failed");
                    failed += 1;
                }
            }
        }
        if delivered == 0 {
            return DispatchOutcome::Failed { failed };
        }
        self.log.record_sent(&alert.dedup_key(), now);
        DispatchOutcome::Sent { delivered, failed }
    }
}
