//! Progress rollups and earned-value metrics
//!
//! Task completion rolls up into phase completion, phases into the project
//! through their weights. Every figure degrades to a safe default (0, 1.0
//! or the planned end date) when dates, tasks or budget are missing.

use chrono::{NaiveDate, TimeDelta};
use promo_core::traits::Id;
use promo_core::types::{clamp_pct, percentage, round2};
use promo_models::phase::{Phase, PhaseStatus};
use promo_models::project::Project;
use promo_models::task::TaskStatus;
use serde::Serialize;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressHealth {
    OnTrack,
    AtRisk,
    Delayed,
}

impl ProgressHealth {
    pub fn from_spi(spi: f64) -> Self {
        if spi >= 0.95 {
            Self::OnTrack
        } else if spi >= 0.85 {
            Self::AtRisk
        } else {
            Self::Delayed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnTrack => "on_track",
            Self::AtRisk => "at_risk",
            Self::Delayed => "delayed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EarnedValue {
    pub earned_value: f64,
    pub planned_value: f64,
    pub actual_cost: f64,
    /// Cost performance index, 1.0 without actual cost
    pub cpi: f64,
    /// Schedule performance index, 1.0 without planned value
    pub spi: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskCounts {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub overdue: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseProgress {
    pub phase_id: Id,
    pub name: String,
    pub status: PhaseStatus,
    pub progress: f64,
    pub weight: f64,
    pub tasks: TaskCounts,
    pub is_delayed: bool,
    pub delay_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MilestoneSummary {
    pub total: usize,
    pub completed: usize,
    pub overdue: usize,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub as_of: NaiveDate,
    pub progress: f64,
    pub timeline_progress: f64,
    pub delay_days: i64,
    pub overall_delay_days: i64,
    pub estimated_completion_date: Option<NaiveDate>,
    pub earned_value: EarnedValue,
    pub health: ProgressHealth,
    pub phases: Vec<PhaseProgress>,
    pub milestones: MilestoneSummary,
}

/// Rollups evaluated as of a given day
#[derive(Debug, Clone, Copy)]
pub struct ProgressAggregator {
    as_of: NaiveDate,
}

impl ProgressAggregator {
    pub fn new(as_of: NaiveDate) -> Self {
        Self { as_of }
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Completed tasks over all tasks, in percent; 0 without tasks
    pub fn phase_progress(&self, phase: &Phase) -> f64 {
        round2(raw_phase_progress(phase))
    }

    /// Weighted average of phase progress; 0 without phases or weight
    pub fn project_progress(&self, project: &Project) -> f64 {
        let (weighted, weights) = project
            .phases
            .iter()
            .fold((0.0, 0.0), |(sum, weights), phase| {
                let weight = phase.weight.max(0.0);
                (sum + raw_phase_progress(phase) * weight, weights + weight)
            });
        if weights == 0.0 {
            return 0.0;
        }
        round2(clamp_pct(weighted / weights))
    }

    /// Elapsed calendar days over planned calendar days, in `[0, 100]`
    pub fn timeline_progress(&self, project: &Project) -> f64 {
        let (Some(start), Some(end)) = (project.start_date, project.end_date) else {
            return 0.0;
        };
        let total = (end - start).num_days();
        let elapsed = (self.as_of - start).num_days();
        if total <= 0 {
            return if elapsed >= 0 { 100.0 } else { 0.0 };
        }
        round2(clamp_pct(elapsed as f64 / total as f64 * 100.0))
    }

    /// Planned duration share by which actual progress trails the timeline
    pub fn delay_days(&self, project: &Project) -> i64 {
        let (Some(start), Some(end)) = (project.start_date, project.end_date) else {
            return 0;
        };
        let actual = self.project_progress(project);
        let timeline = self.timeline_progress(project);
        if actual >= timeline {
            return 0;
        }
        let total = (end - start).num_days().max(0) as f64;
        (total * (timeline - actual) / 100.0).round() as i64
    }

    /// Linear extrapolation of the current velocity.
    ///
    /// Falls back to the planned end date when there is no measurable
    /// velocity yet, the project is already complete, or the extrapolated
    /// date is out of the calendar's range.
    pub fn estimated_completion_date(&self, project: &Project) -> Option<NaiveDate> {
        let start = project.start_date?;
        let progress = self.project_progress(project);
        let elapsed = (self.as_of - start).num_days();
        if progress >= 100.0 || elapsed <= 0 {
            return project.end_date;
        }
        let velocity = progress / elapsed as f64;
        if velocity <= 0.0 {
            return project.end_date;
        }
        let remaining = ((100.0 - progress) / velocity).ceil() as i64;
        TimeDelta::try_days(remaining)
            .and_then(|delta| self.as_of.checked_add_signed(delta))
            .or(project.end_date)
    }

    pub fn earned_value(&self, project: &Project) -> EarnedValue {
        let earned_value = self.project_progress(project) / 100.0 * project.total_budget;
        let planned_value = self.timeline_progress(project) / 100.0 * project.total_budget;
        let actual_cost = project.actual_cost();
        let cpi = if actual_cost == 0.0 {
            1.0
        } else {
            earned_value / actual_cost
        };
        let spi = if planned_value == 0.0 {
            1.0
        } else {
            earned_value / planned_value
        };
        EarnedValue {
            earned_value: round2(earned_value),
            planned_value: round2(planned_value),
            actual_cost: round2(actual_cost),
            cpi: round2(cpi),
            spi: round2(spi),
        }
    }

    pub fn health(&self, project: &Project) -> ProgressHealth {
        ProgressHealth::from_spi(self.earned_value(project).spi)
    }

    pub fn phase_progress_details(&self, project: &Project) -> Vec<PhaseProgress> {
        project
            .phases
            .iter()
            .map(|phase| PhaseProgress {
                phase_id: phase.id,
                name: phase.name.clone(),
                status: phase.status,
                progress: self.phase_progress(phase),
                weight: phase.weight,
                tasks: self.task_counts(phase),
                is_delayed: phase.is_delayed(self.as_of),
                delay_days: phase.delay_days(self.as_of),
            })
            .collect()
    }

    fn task_counts(&self, phase: &Phase) -> TaskCounts {
        phase
            .tasks
            .iter()
            .fold(TaskCounts::default(), |mut counts, task| {
                counts.total += 1;
                match task.status {
                    TaskStatus::Completed => counts.completed += 1,
                    TaskStatus::InProgress => counts.in_progress += 1,
                    TaskStatus::Pending => counts.pending += 1,
                    TaskStatus::Overdue | TaskStatus::Cancelled => {}
                }
                if task.is_overdue(self.as_of) {
                    counts.overdue += 1;
                }
                counts
            })
    }

    pub fn milestone_summary(&self, project: &Project) -> MilestoneSummary {
        let (total, completed, overdue) =
            project
                .milestones()
                .fold((0, 0, 0), |(total, completed, overdue), m| {
                    (
                        total + 1,
                        completed + usize::from(m.is_completed()),
                        overdue + usize::from(m.is_overdue(self.as_of)),
                    )
                });
        MilestoneSummary {
            total,
            completed,
            overdue,
            completion_rate: round2(percentage(completed as f64, total as f64)),
        }
    }

    /// Latest planned phase end past the project end, in calendar days
    pub fn overall_delay_days(&self, project: &Project) -> i64 {
        let Some(project_end) = project.end_date else {
            return 0;
        };
        project
            .phases
            .iter()
            .filter_map(|p| p.end_date)
            .max()
            .map_or(0, |latest| (latest - project_end).num_days().max(0))
    }

    #[instrument(skip(self, project), fields(project_id = project.id, as_of = %self.as_of))]
    pub fn report(&self, project: &Project) -> ProgressReport {
        let earned_value = self.earned_value(project);
        let report = ProgressReport {
            as_of: self.as_of,
            progress: self.project_progress(project),
            timeline_progress: self.timeline_progress(project),
            delay_days: self.delay_days(project),
            overall_delay_days: self.overall_delay_days(project),
            estimated_completion_date: self.estimated_completion_date(project),
            earned_value,
            health: ProgressHealth::from_spi(earned_value.spi),
            phases: self.phase_progress_details(project),
            milestones: self.milestone_summary(project),
        };
        debug!(
            progress = report.progress,
            timeline = report.timeline_progress,
            spi = earned_value.spi,
            "progress computed"
        );
        report
    }
}

fn raw_phase_progress(phase: &Phase) -> f64 {
    let completed = phase.tasks.iter().filter(|t| t.is_completed()).count();
    percentage(completed as f64, phase.tasks.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use promo_models::budget::BudgetLine;
    use promo_models::milestone::{Milestone, MilestoneStatus};
    use promo_models::task::Task;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn tasks(phase_id: Id, completed: usize, open: usize) -> Vec<Task> {
        (0..completed + open)
            .map(|i| {
                let task = Task::new(phase_id * 100 + i as Id, phase_id, 1, format!("Tâche {i}"));
                if i < completed {
                    task.with_status(TaskStatus::Completed)
                } else {
                    task.with_status(TaskStatus::InProgress)
                }
            })
            .collect()
    }

    /// 100-day project, day 50, budget 1M
    fn project() -> Project {
        let mut project = Project::new(1, "Villa Horizon")
            .with_dates(d(2024, 1, 1), d(2024, 4, 10))
            .with_budget(1_000_000.0, 0.0);
        project.phases = vec![
            Phase::new(1, 1, "Études", 1).with_tasks(tasks(1, 4, 0)),
            Phase::new(2, 1, "Travaux", 2)
                .with_weight(3.0)
                .with_tasks(tasks(2, 1, 3)),
        ];
        project
    }

    fn at_day_50() -> ProgressAggregator {
        ProgressAggregator::new(d(2024, 2, 20))
    }

    #[test]
    fn test_phase_progress() {
        let agg = at_day_50();
        let project = project();
        assert_eq!(agg.phase_progress(&project.phases[0]), 100.0);
        assert_eq!(agg.phase_progress(&project.phases[1]), 25.0);
        assert_eq!(agg.phase_progress(&Phase::new(3, 1, "Vide", 3)), 0.0);
    }

    #[test]
    fn test_weighted_project_progress() {
        // (100 * 1 + 25 * 3) / 4
        assert_eq!(at_day_50().project_progress(&project()), 43.75);
    }

    #[test]
    fn test_zero_weights_give_zero() {
        let mut project = project();
        for phase in &mut project.phases {
            phase.weight = 0.0;
        }
        assert_eq!(at_day_50().project_progress(&project), 0.0);
    }

    #[test]
    fn test_timeline_progress_is_clamped() {
        let project = project();
        assert_eq!(at_day_50().timeline_progress(&project), 50.0);
        assert_eq!(ProgressAggregator::new(d(2023, 12, 1)).timeline_progress(&project), 0.0);
        assert_eq!(ProgressAggregator::new(d(2025, 1, 1)).timeline_progress(&project), 100.0);
    }

    #[test]
    fn test_zero_duration_project_does_not_divide_by_zero() {
        let project = Project::new(1, "Instantané").with_dates(d(2024, 1, 1), d(2024, 1, 1));
        let agg = ProgressAggregator::new(d(2024, 1, 1));
        assert_eq!(agg.timeline_progress(&project), 100.0);
        assert_eq!(agg.project_progress(&project), 0.0);
        assert_eq!(agg.delay_days(&project), 0);
    }

    #[test]
    fn test_delay_days() {
        // 100 days * (50 - 43.75) / 100 = 6.25
        assert_eq!(at_day_50().delay_days(&project()), 6);
    }

    #[test]
    fn test_estimated_completion_extrapolates_velocity() {
        // velocity 43.75 / 50 = 0.875 %/day; 56.25 / 0.875 = 64.3 -> 65 days
        assert_eq!(
            at_day_50().estimated_completion_date(&project()),
            Some(d(2024, 4, 25))
        );
    }

    #[test]
    fn test_estimated_completion_falls_back_to_plan() {
        let mut project = project();
        project.phases[1].tasks.clear();
        project.phases[0].tasks = tasks(1, 0, 3);
        assert_eq!(
            at_day_50().estimated_completion_date(&project),
            Some(d(2024, 4, 10))
        );
        assert_eq!(
            ProgressAggregator::new(d(2024, 1, 1)).estimated_completion_date(&self::project()),
            Some(d(2024, 4, 10))
        );
    }

    #[test]
    fn test_estimated_completion_out_of_range_falls_back_to_plan() {
        let mut project = Project::new(1, "Tour Sirius").with_dates(d(1990, 1, 1), d(1995, 1, 1));
        project.phases = vec![Phase::new(1, 1, "Travaux", 1).with_tasks(tasks(1, 1, 9_999))];
        let agg = ProgressAggregator::new(d(2026, 1, 1));
        assert_eq!(agg.estimated_completion_date(&project), Some(d(1995, 1, 1)));
        assert_eq!(agg.report(&project).estimated_completion_date, Some(d(1995, 1, 1)));
    }

    #[test]
    fn test_earned_value_indices() {
        let mut project = project();
        project.budget_lines = vec![BudgetLine::new(1, "travaux", 500_000.0, 350_000.0)];
        let ev = at_day_50().earned_value(&project);
        assert_eq!(ev.earned_value, 437_500.0);
        assert_eq!(ev.planned_value, 500_000.0);
        assert_eq!(ev.actual_cost, 350_000.0);
        assert_eq!(ev.cpi, 1.25);
        assert_eq!(ev.spi, 0.88);
        assert_eq!(at_day_50().health(&project), ProgressHealth::AtRisk);
    }

    #[test]
    fn test_earned_value_defaults_without_cost_or_plan() {
        let project = Project::new(1, "Sans budget");
        let ev = at_day_50().earned_value(&project);
        assert_eq!(ev.cpi, 1.0);
        assert_eq!(ev.spi, 1.0);
        assert_eq!(ProgressHealth::from_spi(ev.spi), ProgressHealth::OnTrack);
    }

    #[test]
    fn test_health_bands() {
        assert_eq!(ProgressHealth::from_spi(0.95), ProgressHealth::OnTrack);
        assert_eq!(ProgressHealth::from_spi(0.85), ProgressHealth::AtRisk);
        assert_eq!(ProgressHealth::from_spi(0.84), ProgressHealth::Delayed);
    }

    #[test]
    fn test_milestone_summary() {
        let mut project = project();
        let mut done = Milestone::new(1, 1, "Dépôt PC");
        done.status = MilestoneStatus::Completed;
        let mut late = Milestone::new(2, 2, "Hors d'eau");
        late.target_date = Some(d(2024, 2, 1));
        project.phases[0].milestones = vec![done];
        project.phases[1].milestones = vec![late, Milestone::new(3, 2, "Livraison")];

        let summary = at_day_50().milestone_summary(&project);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.overdue, 1);
        assert_eq!(summary.completion_rate, 33.33);
    }

    #[test]
    fn test_overall_delay_days() {
        let mut project = project();
        project.phases[1].end_date = Some(d(2024, 4, 25));
        assert_eq!(at_day_50().overall_delay_days(&project), 15);
        project.phases[1].end_date = Some(d(2024, 3, 1));
        assert_eq!(at_day_50().overall_delay_days(&project), 0);
    }

    #[test]
    fn test_report_collects_phase_details() {
        let report = at_day_50().report(&project());
        assert_eq!(report.phases.len(), 2);
        assert_eq!(report.phases[1].tasks.in_progress, 3);
        assert_eq!(report.phases[1].tasks.completed, 1);
        assert!(report.progress >= 0.0 && report.progress <= 100.0);
    }
}
