//! # promo-models
//!
//! Domain models for the Immo Promo scheduling engine.
//!
//! Plain in-memory values handed to the engine by the persistence layer.
//! Schedulable nodes implement the core traits from `promo-core`.

pub use promo_core::traits::{Entity, Id, Identifiable, ProjectScoped, Schedulable};

pub mod budget;
pub mod dependency;
pub mod milestone;
pub mod permit;
pub mod phase;
pub mod project;
pub mod risk;
pub mod stakeholder;
pub mod task;

pub use budget::BudgetLine;
pub use dependency::{
    Dependency, DependencyType, NodeKind, NodeRef, PhaseDependency, PhaseNode, TaskDependency,
    TaskNode, MAX_LAG_DAYS,
};
pub use milestone::{Milestone, MilestoneStatus};
pub use permit::{Complexity, Permit, PermitStatus, PermitType, PermitTypeSpec};
pub use phase::{Phase, PhaseStatus};
pub use project::{PermitRequirements, Project};
pub use risk::{ActionStatus, MitigationAction, Risk, RiskLevel, RiskRating, RiskStatus};
pub use stakeholder::{Stakeholder, StakeholderRole, StakeholderType};
pub use task::{Task, TaskPriority, TaskStatus};
