//! Engine configuration types and loading
//!
//! Every threshold the analyzers use lives here with its default so that a
//! deployment can tune them without touching the computation code.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::WorkingCalendar;

/// Main engine configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub variance: VarianceConfig,
    pub alerts: AlertConfig,
    pub risk: RiskConfig,
    pub schedule: ScheduleConfig,
}

/// Budget variance thresholds, in percent of the planned amount
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct VarianceConfig {
    /// `|pct| <= on_track_pct` is on track / acceptable
    pub on_track_pct: f64,
    /// `|pct| <= warning_pct` is warning / concerning, above is critical
    pub warning_pct: f64,
    /// Absolute line variance above which the project impact is high
    pub high_impact_amount: f64,
    /// Line variance percentage under which a timeline delay is likely
    pub delay_risk_pct: f64,
    /// Period-over-period change considered noise
    pub trend_stable_band: f64,
}

impl Default for VarianceConfig {
    fn default() -> Self {
        Self {
            on_track_pct: 5.0,
            warning_pct: 15.0,
            high_impact_amount: 50_000.0,
            delay_risk_pct: -20.0,
            trend_stable_band: 2.0,
        }
    }
}

/// Longest accepted throttling window (ten years)
pub const MAX_WINDOW_HOURS: i64 = 24 * 365 * 10;

/// Send-throttling windows per alert level
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AlertConfig {
    pub warning_window_hours: i64,
    pub info_window_hours: i64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            warning_window_hours: 24,
            info_window_hours: 72,
        }
    }
}

/// Emerging-risk heuristics
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    /// Share of overdue tasks above which a schedule risk is flagged
    pub overdue_task_ratio: f64,
    /// Budget usage (percent) above which a budget risk may be flagged...
    pub budget_usage_pct: f64,
    /// ...while completion (percent) is still below this
    pub completion_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            overdue_task_ratio: 0.15,
            budget_usage_pct: 90.0,
            completion_pct: 80.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Critical milestones due within this many days raise a warning
    pub upcoming_milestone_days: i64,
    /// Permits expiring within this many days raise a warning
    pub permit_expiry_days: i64,
    /// Non-working dates on top of weekends
    pub holidays: Vec<NaiveDate>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            upcoming_milestone_days: 7,
            permit_expiry_days: 30,
            holidays: Vec::new(),
        }
    }
}

impl ScheduleConfig {
    pub fn calendar(&self) -> WorkingCalendar {
        WorkingCalendar::with_holidays(self.holidays.iter().copied())
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("Config file error: {0}")]
    FileError(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::FileError(err.to_string())
    }
}

impl EngineConfig {
    /// Load configuration from `PROMO_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = parse_env("PROMO_VARIANCE_ON_TRACK_PCT")? {
            config.variance.on_track_pct = v;
        }
        if let Some(v) = parse_env("PROMO_VARIANCE_WARNING_PCT")? {
            config.variance.warning_pct = v;
        }
        if let Some(v) = parse_env("PROMO_VARIANCE_HIGH_IMPACT_AMOUNT")? {
            config.variance.high_impact_amount = v;
        }
        if let Some(v) = parse_env("PROMO_VARIANCE_DELAY_RISK_PCT")? {
            config.variance.delay_risk_pct = v;
        }
        if let Some(v) = parse_env("PROMO_VARIANCE_TREND_STABLE_BAND")? {
            config.variance.trend_stable_band = v;
        }

        // Alerts
        if let Some(v) = parse_env("PROMO_ALERT_WARNING_WINDOW_HOURS")? {
            config.alerts.warning_window_hours = v;
        }
        if let Some(v) = parse_env("PROMO_ALERT_INFO_WINDOW_HOURS")? {
            config.alerts.info_window_hours = v;
        }

        // Risk heuristics
        if let Some(v) = parse_env("PROMO_RISK_OVERDUE_TASK_RATIO")? {
            config.risk.overdue_task_ratio = v;
        }
        if let Some(v) = parse_env("PROMO_RISK_BUDGET_USAGE_PCT")? {
            config.risk.budget_usage_pct = v;
        }
        if let Some(v) = parse_env("PROMO_RISK_COMPLETION_PCT")? {
            config.risk.completion_pct = v;
        }

        // Schedule
        if let Some(v) = parse_env("PROMO_SCHEDULE_UPCOMING_MILESTONE_DAYS")? {
            config.schedule.upcoming_milestone_days = v;
        }
        if let Some(v) = parse_env("PROMO_SCHEDULE_PERMIT_EXPIRY_DAYS")? {
            config.schedule.permit_expiry_days = v;
        }

        if let Ok(list) = std::env::var("PROMO_SCHEDULE_HOLIDAYS") {
            config.schedule.holidays = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<NaiveDate>().map_err(|e| ConfigError::InvalidValue {
                        key: "PROMO_SCHEDULE_HOLIDAYS".to_string(),
                        message: format!("{s}: {e}"),
                    })
                })
                .collect::<Result<_, _>>()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Layer an optional config file under `PROMO__SECTION__KEY` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let config: Self = builder
            .add_source(
                config::Environment::with_prefix("PROMO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.variance.on_track_pct < 0.0 || self.variance.on_track_pct > self.variance.warning_pct
        {
            return Err(ConfigError::InvalidValue {
                key: "variance.on_track_pct".to_string(),
                message: "must be between 0 and variance.warning_pct".to_string(),
            });
        }
        let window_range = 0..=MAX_WINDOW_HOURS;
        if !window_range.contains(&self.alerts.warning_window_hours)
            || !window_range.contains(&self.alerts.info_window_hours)
        {
            return Err(ConfigError::InvalidValue {
                key: "alerts".to_string(),
                message: format!("throttling windows must be between 0 and {MAX_WINDOW_HOURS} hours"),
            });
        }
        if !(0.0..=1.0).contains(&self.risk.overdue_task_ratio) {
            return Err(ConfigError::InvalidValue {
                key: "risk.overdue_task_ratio".to_string(),
                message: "must be a ratio between 0 and 1".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
