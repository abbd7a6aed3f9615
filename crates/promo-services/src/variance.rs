//! Budget variance classification
//!
//! Percentages are rounded to two decimals before they are classified, so
//! a report never shows a value on one side of a threshold while its
//! status says the other.

use promo_core::config::VarianceConfig;
use promo_core::traits::Id;
use promo_core::types::{percentage, round2};
use promo_models::budget::BudgetLine;
use promo_models::project::Project;
use serde::Serialize;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceStatus {
    OnTrack,
    Warning,
    Critical,
}

impl VarianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnTrack => "on_track",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// Per-line labels for the same three bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCategory {
    Acceptable,
    Concerning,
    Critical,
}

impl From<VarianceStatus> for LineCategory {
    fn from(status: VarianceStatus) -> Self {
        match status {
            VarianceStatus::OnTrack => Self::Acceptable,
            VarianceStatus::Warning => Self::Concerning,
            VarianceStatus::Critical => Self::Critical,
        }
    }
}

/// Sign and magnitude band that selects drivers and actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceBand {
    Overrun,
    Underrun,
    Moderate,
    Nominal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Stable,
    Deteriorating,
    Improving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPriority {
    High,
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Responsible {
    ProjectManager,
    FinanceManager,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectiveAction {
    pub priority: ActionPriority,
    pub action: String,
    pub timeline: String,
    pub responsible: Responsible,
}

impl CorrectiveAction {
    fn new(priority: ActionPriority, action: &str, timeline: &str, responsible: Responsible) -> Self {
        Self {
            priority,
            action: action.to_string(),
            timeline: timeline.to_string(),
            responsible,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectImpact {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineImpact {
    PotentialDelay,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineImpact {
    pub project_impact: ProjectImpact,
    pub timeline_impact: TimelineImpact,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineVariance {
    pub line_id: Id,
    pub category: String,
    pub planned_amount: f64,
    pub actual_amount: f64,
    pub variance: f64,
    pub variance_pct: f64,
    pub status: LineCategory,
    pub impact: LineImpact,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarianceReport {
    pub total_budget: f64,
    pub current_spent: f64,
    pub variance: f64,
    pub variance_pct: f64,
    pub status: VarianceStatus,
    pub band: VarianceBand,
    pub by_line: Vec<LineVariance>,
    pub drivers: Vec<String>,
    pub corrective_actions: Vec<CorrectiveAction>,
}

#[derive(Debug, Clone, Default)]
pub struct VarianceAnalyzer {
    config: VarianceConfig,
}

impl VarianceAnalyzer {
    pub fn new(config: VarianceConfig) -> Self {
        Self { config }
    }

    #[instrument(skip(self, project), fields(project_id = project.id))]
    pub fn analyze(&self, project: &Project) -> VarianceReport {
        let variance = project.current_spent - project.total_budget;
        let variance_pct = round2(percentage(variance, project.total_budget));
        let status = self.status(variance_pct);
        let band = self.band(variance_pct);
        let by_line: Vec<LineVariance> = project
            .budget_lines
            .iter()
            .map(|line| self.analyze_line(line))
            .collect();

        debug!(variance, variance_pct, status = status.as_str(), "variance analyzed");

        VarianceReport {
            total_budget: project.total_budget,
            current_spent: project.current_spent,
            variance: round2(variance),
            variance_pct,
            status,
            band,
            by_line,
            drivers: self.drivers(band),
            corrective_actions: self.corrective_actions(band),
        }
    }

    /// Band of `|pct|`, inclusive on the lower side
    pub fn status(&self, variance_pct: f64) -> VarianceStatus {
        let magnitude = variance_pct.abs();
        if magnitude <= self.config.on_track_pct {
            VarianceStatus::OnTrack
        } else if magnitude <= self.config.warning_pct {
            VarianceStatus::Warning
        } else {
            VarianceStatus::Critical
        }
    }

    pub fn band(&self, variance_pct: f64) -> VarianceBand {
        if variance_pct > self.config.warning_pct {
            VarianceBand::Overrun
        } else if variance_pct <= -self.config.warning_pct {
            VarianceBand::Underrun
        } else if variance_pct.abs() > self.config.on_track_pct {
            VarianceBand::Moderate
        } else {
            VarianceBand::Nominal
        }
    }

    pub fn analyze_line(&self, line: &BudgetLine) -> LineVariance {
        let variance = line.variance();
        let variance_pct = round2(percentage(variance, line.planned_amount));
        LineVariance {
            line_id: line.id,
            category: line.category.clone(),
            planned_amount: line.planned_amount,
            actual_amount: line.actual_amount,
            variance: round2(variance),
            variance_pct,
            status: self.status(variance_pct).into(),
            impact: self.assess_line_impact(variance, variance_pct),
            explanation: line_explanation(line, variance_pct),
        }
    }

    pub fn assess_line_impact(&self, variance: f64, variance_pct: f64) -> LineImpact {
        LineImpact {
            project_impact: if variance.abs() > self.config.high_impact_amount {
                ProjectImpact::High
            } else {
                ProjectImpact::Low
            },
            timeline_impact: if variance_pct < self.config.delay_risk_pct {
                TimelineImpact::PotentialDelay
            } else {
                TimelineImpact::None
            },
        }
    }

    pub fn drivers(&self, band: VarianceBand) -> Vec<String> {
        let drivers: &[&str] = match band {
            VarianceBand::Overrun => &["Significant budget overrun", "Cost estimates need revision"],
            VarianceBand::Underrun => &[
                "Spending well below plan",
                "Work may be running behind schedule",
            ],
            VarianceBand::Moderate => &[
                "Accelerated budget consumption",
                "Closer monitoring recommended",
            ],
            VarianceBand::Nominal => &[],
        };
        drivers.iter().map(|d| d.to_string()).collect()
    }

    pub fn corrective_actions(&self, band: VarianceBand) -> Vec<CorrectiveAction> {
        use ActionPriority::*;
        use Responsible::*;
        match band {
            VarianceBand::Overrun => vec![
                CorrectiveAction::new(High, "Revise the remaining budget in depth", "1 week", FinanceManager),
                CorrectiveAction::new(High, "Freeze non-essential spending", "immediate", FinanceManager),
            ],
            VarianceBand::Underrun => vec![
                CorrectiveAction::new(Medium, "Accelerate work packages lagging behind plan", "2 weeks", ProjectManager),
                CorrectiveAction::new(Medium, "Reallocate unused budget", "1 month", FinanceManager),
            ],
            VarianceBand::Moderate => vec![CorrectiveAction::new(
                Medium,
                "Analyze new expenses before approval",
                "immediate",
                FinanceManager,
            )],
            VarianceBand::Nominal => Vec::new(),
        }
    }

    /// Direction between two successive period variances
    pub fn trend_direction(&self, current: f64, previous: f64) -> TrendDirection {
        let delta = current - previous;
        if delta.abs() < self.config.trend_stable_band {
            TrendDirection::Stable
        } else if delta > 0.0 {
            TrendDirection::Deteriorating
        } else {
            TrendDirection::Improving
        }
    }

    /// One direction per period, each compared with its predecessor by sign.
    ///
    /// The first period has nothing to compare with and is stable.
    pub fn analyze_variance_trends(&self, history: &[f64]) -> Vec<TrendDirection> {
        let mut trends = Vec::with_capacity(history.len());
        if history.is_empty() {
            return trends;
        }
        trends.push(TrendDirection::Stable);
        trends.extend(history.windows(2).map(|pair| {
            let delta = pair[1] - pair[0];
            if delta > 0.0 {
                TrendDirection::Deteriorating
            } else if delta < 0.0 {
                TrendDirection::Improving
            } else {
                TrendDirection::Stable
            }
        }));
        trends
    }
}

pub fn line_explanation(line: &BudgetLine, variance_pct: f64) -> String {
    let subject = line.description.as_deref().unwrap_or(&line.category);
    if variance_pct > 0.0 {
        format!("Overrun of {}% on {}", variance_pct.abs(), subject)
    } else if variance_pct < 0.0 {
        format!("Saving of {}% on {}", variance_pct.abs(), subject)
    } else {
        format!("{subject} is on budget")
    }
}
