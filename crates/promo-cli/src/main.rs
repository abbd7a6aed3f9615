//! Immo Promo command-line caller
//!
//! Loads a project snapshot (JSON), runs one engine operation and prints
//! the report as JSON on stdout. Logs go to stderr.
//!
//! ## Commands
//!
//! - `schedule`: critical path, schedule metrics and date alerts
//! - `progress`: progress rollups and earned value
//! - `variance`: budget variance report and trend
//! - `alerts`: risk alerts, dispatched through the throttling policy
//! - `permits`: permit workflow, estimates and blocking permits
//! - `add-dependency`: validate and add a dependency to the snapshot
//! - `reschedule`: cascade a phase move to its dependents

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use validator::Validate;

use promo_contracts::dependencies::NodeLookup;
use promo_core::config::{AlertConfig, EngineConfig};
use promo_core::result::ServiceResult;
use promo_models::dependency::{Dependency, DependencyType, NodeKind, PhaseNode, TaskNode};
use promo_models::permit::Complexity;
use promo_models::project::Project;
use promo_notifications::{
    Alert, AlertDispatcher, DispatchReport, MemoryAlertLog, RiskAlertEngine, ThrottlePolicy,
    TracingNotifier,
};
use promo_services::dependencies::{
    CreateDependencyService, DependencyParams, MemoryDependencyStore, ProjectLocks,
};
use promo_services::permits::{PermitCatalog, PermitWorkflowGenerator};
use promo_services::progress::ProgressAggregator;
use promo_services::schedule::{
    plan_reschedule, CriticalPathCalculator, ScheduleAlertService, ScheduleMetricsService,
};
use promo_services::variance::VarianceAnalyzer;
use promo_services::Callable;

#[derive(Parser)]
#[command(name = "promo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Scheduling, variance and risk reports for real-estate projects", long_about = None)]
struct Cli {
    /// Engine configuration file (toml, yaml or json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Critical path analysis with schedule metrics and date alerts
    Schedule {
        /// Project snapshot (JSON)
        project: PathBuf,

        /// Analyze the task network instead of the phase network
        #[arg(long, value_enum, default_value_t = Level::Phases)]
        level: Level,

        /// Deadline used to rank bottlenecks
        #[arg(long)]
        deadline: Option<NaiveDate>,

        /// Reference date (default: today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Progress rollups, earned value and milestone summary
    Progress {
        project: PathBuf,

        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Budget variance report
    Variance {
        project: PathBuf,

        /// Past variance percentages, oldest first, for trend analysis
        #[arg(long, value_delimiter = ',')]
        history: Vec<f64>,
    },

    /// Risk alerts, dispatched to the log through the throttling policy
    Alerts {
        project: PathBuf,

        #[arg(long)]
        as_of: Option<NaiveDate>,

        /// Only print the alerts, do not dispatch them
        #[arg(long)]
        dry_run: bool,

        /// Sent-alert log (JSON) kept between runs for throttling
        #[arg(long)]
        log: Option<PathBuf>,
    },

    /// Permit workflow for the project's requirements
    Permits {
        project: PathBuf,

        /// Project complexity used for duration estimates
        #[arg(long, value_parser = parse_snake::<Complexity>, default_value = "medium")]
        complexity: Complexity,

        /// Fail instead of falling back on circular prerequisites
        #[arg(long)]
        strict: bool,

        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Validate a new dependency against the snapshot's existing ones
    AddDependency {
        project: PathBuf,

        #[arg(long)]
        prerequisite: i64,

        #[arg(long)]
        dependent: i64,

        #[arg(long, value_enum, default_value_t = Level::Phases)]
        level: Level,

        #[arg(long = "type", value_parser = parse_snake::<DependencyType>)]
        dependency_type: Option<DependencyType>,

        /// Lag in working days
        #[arg(long)]
        lag: Option<u32>,
    },

    /// Move a phase and cascade the shift to its dependents
    Reschedule {
        project: PathBuf,

        #[arg(long)]
        phase: i64,

        #[arg(long)]
        start: NaiveDate,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Level {
    Phases,
    Tasks,
}

/// Parse a snake_case value through the type's serde representation
fn parse_snake<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|e| format!("invalid value '{raw}': {e}"))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = EngineConfig::load(cli.config.as_deref()).context("loading engine configuration")?;
    debug!(?config, "configuration loaded");

    let today = Utc::now().date_naive();
    match cli.command {
        Commands::Schedule {
            project,
            level,
            deadline,
            as_of,
        } => {
            let project = load_project(&project)?;
            let as_of = as_of.unwrap_or(today);
            let calculator = CriticalPathCalculator::new(config.schedule.calendar());
            let analysis = match level {
                Level::Phases => calculator.analyze_phases(&project, deadline)?,
                Level::Tasks => calculator.analyze_tasks(&project, deadline)?,
            };
            let metrics = ScheduleMetricsService::new(calculator, as_of).compute(&project)?;
            let alerts = ScheduleAlertService::new(config.schedule.clone()).alerts(&project, as_of);
            print_json(&serde_json::json!({
                "critical_path": analysis,
                "metrics": metrics,
                "alerts": alerts,
            }))
        }
        Commands::Progress { project, as_of } => {
            let project = load_project(&project)?;
            print_json(&ProgressAggregator::new(as_of.unwrap_or(today)).report(&project))
        }
        Commands::Variance { project, history } => {
            let project = load_project(&project)?;
            let analyzer = VarianceAnalyzer::new(config.variance.clone());
            let report = analyzer.analyze(&project);
            let mut series = history;
            series.push(report.variance_pct);
            print_json(&serde_json::json!({
                "report": report,
                "trend": analyzer.analyze_variance_trends(&series),
            }))
        }
        Commands::Alerts {
            project,
            as_of,
            dry_run,
            log,
        } => {
            let project = load_project(&project)?;
            let now = Utc::now();
            let alerts = RiskAlertEngine::new(config.risk.clone()).alerts(
                &project,
                as_of.unwrap_or(today),
                now,
            );
            if dry_run {
                return print_json(&alerts);
            }
            let report = dispatch_alerts(&project, &alerts, &config.alerts, log.as_deref(), now)?;
            info!(
                sent = report.sent_count(),
                suppressed = report.suppressed_count(),
                "alerts dispatched"
            );
            print_json(&serde_json::json!({
                "alerts": alerts,
                "dispatch": report,
            }))
        }
        Commands::Permits {
            project,
            complexity,
            strict,
            as_of,
        } => {
            let project = load_project(&project)?;
            let catalog = PermitCatalog::standard();
            let required = project.permit_requirements.required_permit_types();
            if strict {
                catalog.sort_strict(&required)?;
            }
            let generator = PermitWorkflowGenerator::new(catalog);
            let workflow = generator.generate(&project);
            let estimates: Vec<_> = required
                .iter()
                .filter_map(|&t| generator.estimate_duration(t, complexity))
                .collect();
            print_json(&serde_json::json!({
                "workflow": workflow.entries(),
                "total_duration_days": workflow.total_duration_days(),
                "unresolved": workflow.unresolved,
                "estimates": estimates,
                "blocking": generator.blocking_permits(&project, as_of.unwrap_or(today)),
            }))
        }
        Commands::AddDependency {
            project,
            prerequisite,
            dependent,
            level,
            dependency_type,
            lag,
        } => {
            let project = load_project(&project)?;
            let mut params = DependencyParams::new(project.id, prerequisite, dependent);
            params.dependency_type = dependency_type;
            params.lag_days = lag;
            match level {
                Level::Phases => {
                    let existing = project.phase_dependencies.clone();
                    print_service_result(add_dependency::<PhaseNode>(&project, existing, params))
                }
                Level::Tasks => {
                    let existing = project.task_dependencies.clone();
                    print_service_result(add_dependency::<TaskNode>(&project, existing, params))
                }
            }
        }
        Commands::Reschedule {
            project,
            phase,
            start,
        } => {
            let project = load_project(&project)?;
            print_json(&plan_reschedule(&project, phase, start)?)
        }
    }
}

/// Dispatch through the throttling policy, reading and saving the sent-alert
/// log at `log_path` when one is given.
fn dispatch_alerts(
    project: &Project,
    alerts: &[Alert],
    config: &AlertConfig,
    log_path: Option<&Path>,
    now: DateTime<Utc>,
) -> Result<DispatchReport> {
    let log = match log_path {
        Some(path) => load_alert_log(path)?,
        None => MemoryAlertLog::new(),
    };
    let dispatcher = AlertDispatcher::new(ThrottlePolicy::from_config(config), log, TracingNotifier);
    let report = dispatcher.dispatch(project, alerts, now);
    if let Some(path) = log_path {
        save_alert_log(path, dispatcher.log())?;
    }
    Ok(report)
}

fn load_alert_log(path: &Path) -> Result<MemoryAlertLog> {
    if !path.exists() {
        debug!(path = %path.display(), "no alert log yet");
        return Ok(MemoryAlertLog::new());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading alert log {}", path.display()))?;
    let entries: HashMap<String, DateTime<Utc>> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing alert log {}", path.display()))?;
    Ok(MemoryAlertLog::from_entries(entries))
}

fn save_alert_log(path: &Path, log: &MemoryAlertLog) -> Result<()> {
    let raw = serde_json::to_string_pretty(&log.entries())?;
    std::fs::write(path, raw).with_context(|| format!("writing alert log {}", path.display()))
}

fn add_dependency<N>(
    project: &Project,
    existing: Vec<Dependency<N>>,
    params: DependencyParams,
) -> ServiceResult<Dependency<N>>
where
    N: NodeKind,
    Project: NodeLookup<N>,
{
    let store = MemoryDependencyStore::with_edges(project.id, existing);
    let locks = ProjectLocks::new();
    CreateDependencyService::new(&store, project, &locks).call(params)
}

fn print_service_result<N: NodeKind>(result: ServiceResult<Dependency<N>>) -> Result<()> {
    if let Some(dependency) = result.result() {
        return print_json(&serde_json::json!({ "success": true, "dependency": dependency }));
    }
    print_json(&serde_json::json!({
        "success": false,
        "errors": result.errors().full_messages(),
    }))?;
    anyhow::bail!("dependency rejected")
}

fn load_project(path: &Path) -> Result<Project> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading project snapshot {}", path.display()))?;
    let project: Project = serde_json::from_str(&raw)
        .with_context(|| format!("parsing project snapshot {}", path.display()))?;
    project
        .validate()
        .with_context(|| format!("invalid project snapshot {}", path.display()))?;
    info!(
        project_id = project.id,
        phases = project.phases.len(),
        risks = project.risks.len(),
        "project loaded"
    );
    Ok(project)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,promo_services=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use promo_notifications::{AlertDetails, AlertLevel, AlertType, DispatchOutcome};

    fn overdue_warning(now: DateTime<Utc>) -> Alert {
        Alert::new(
            1,
            AlertType::OverdueActions,
            AlertLevel::Warning,
            "Overdue actions for: Retard permis",
            "1 overdue mitigation action(s)",
            AlertDetails::OverdueActions {
                overdue_count: 1,
                oldest_overdue: None,
            },
            now,
        )
        .with_risk(3)
        .with_recipients(vec![10])
    }

    #[test]
    fn test_alert_log_throttles_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("alerts.json");
        let project = Project::new(1, "Les Docks");
        let config = AlertConfig::default();
        let now = Utc::now();

        let report =
            dispatch_alerts(&project, &[overdue_warning(now)], &config, Some(&log_path), now)
                .unwrap();
        assert_eq!(report.sent_count(), 1);
        assert!(log_path.exists());

        let later = now + Duration::hours(2);
        let again = overdue_warning(later);
        let report = dispatch_alerts(
            &project,
            std::slice::from_ref(&again),
            &config,
            Some(&log_path),
            later,
        )
        .unwrap();
        assert_eq!(report.outcome(again.id), Some(&DispatchOutcome::Suppressed));
    }

    #[test]
    fn test_without_log_every_run_sends() {
        let project = Project::new(1, "Les Docks");
        let config = AlertConfig::default();
        let now = Utc::now();
        for _ in 0..2 {
            let report =
                dispatch_alerts(&project, &[overdue_warning(now)], &config, None, now).unwrap();
            assert_eq!(report.sent_count(), 1);
        }
    }

    #[test]
    fn test_corrupt_alert_log_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("alerts.json");
        std::fs::write(&log_path, "not json").unwrap();
        let err = load_alert_log(&log_path).unwrap_err();
        assert!(err.to_string().contains("parsing alert log"));
    }
}
