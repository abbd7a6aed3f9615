//! # promo-notifications
//!
//! Risk alerts for the Immo Promo engine.
//!
//! ## Features
//!
//! - Critical and overdue-action alerts from the risk register
//! - Emerging-risk heuristics with a pluggable quality signal
//! - Per-level send throttling backed by a caller-owned alert log
//! - Dispatch to a caller-owned notifier

pub mod alert;
pub mod dispatch;
pub mod emerging;
pub mod risk_alerts;
pub mod throttle;

pub use alert::{
    ActionUrgency, Alert, AlertAction, AlertActionKind, AlertDetails, AlertLevel, AlertType,
};
pub use dispatch::{
    AlertDispatcher, AlertNotifier, DispatchOutcome, DispatchReport, MemoryNotifier, NotifyError,
    NotifyResult, TracingNotifier,
};
pub use emerging::{
    EmergingRisk, EmergingRiskDetector, EmergingRiskKind, NoQualitySignal, QualityRiskPredicate,
};
pub use risk_alerts::{is_critical, recipients, RiskAlertEngine};
pub use throttle::{AlertLog, AlwaysSend, MemoryAlertLog, ThrottlePolicy};
