//! Project-level schedule metrics

use chrono::NaiveDate;
use promo_core::error::StructuralError;
use promo_models::project::Project;
use serde::Serialize;
use tracing::instrument;

use super::critical_path::CriticalPathCalculator;
use crate::progress::ProgressAggregator;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectScheduleMetrics {
    pub critical_path_duration: i64,
    pub progress_pct: f64,
    pub delay_days: i64,
    pub estimated_completion_date: Option<NaiveDate>,
    pub cpi: f64,
    pub spi: f64,
}

pub struct ScheduleMetricsService {
    calculator: CriticalPathCalculator,
    progress: ProgressAggregator,
}

impl ScheduleMetricsService {
    pub fn new(calculator: CriticalPathCalculator, as_of: NaiveDate) -> Self {
        Self {
            calculator,
            progress: ProgressAggregator::new(as_of),
        }
    }

    /// Critical path of the phase network combined with progress rollups
    #[instrument(skip(self, project), fields(project_id = project.id))]
    pub fn compute(&self, project: &Project) -> Result<ProjectScheduleMetrics, StructuralError> {
        let cpm = self.calculator.analyze_phases(project, None)?;
        let earned = self.progress.earned_value(project);
        Ok(ProjectScheduleMetrics {
            critical_path_duration: cpm.critical_path_duration,
            progress_pct: self.progress.project_progress(project),
            delay_days: self.progress.delay_days(project),
            estimated_completion_date: self.progress.estimated_completion_date(project),
            cpi: earned.cpi,
            spi: earned.spi,
        })
    }
}
