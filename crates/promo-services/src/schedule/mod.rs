//! Schedule services
//!
//! Critical path analysis, schedule alerts, reschedule planning and the
//! project-level schedule metrics that combine them with progress.

mod alerts;
mod critical_path;
mod metrics;
mod reschedule;

pub use alerts::{AlertSeverity, ScheduleAlert, ScheduleAlertKind, ScheduleAlertService};
pub use critical_path::{
    Bottleneck, CriticalPathAnalysis, CriticalPathCalculator, NodeSchedule, PassBounds,
    ScheduleNetwork, ScheduleNode,
};
pub use metrics::{ProjectScheduleMetrics, ScheduleMetricsService};
pub use reschedule::{plan_reschedule, PhaseShift, ReschedulePlan};
