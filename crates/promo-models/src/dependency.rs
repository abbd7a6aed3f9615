//! Typed, lagged dependencies between schedulable nodes
//!
//! The same edge type serves phase-to-phase and task-to-task links; the
//! node kind is carried in the type so the two can never be mixed up.

use std::fmt;
use std::marker::PhantomData;

use promo_core::traits::Id;
use serde::{Deserialize, Serialize};

/// Maximum lag value, in working days
pub const MAX_LAG_DAYS: u32 = 2000;

/// Which endpoint of the prerequisite gates which endpoint of the dependent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    #[default]
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FinishToStart => "finish_to_start",
            Self::StartToStart => "start_to_start",
            Self::FinishToFinish => "finish_to_finish",
            Self::StartToFinish => "start_to_finish",
        }
    }

    /// Whether the prerequisite's finish (rather than its start) is the reference point
    pub fn from_prerequisite_finish(&self) -> bool {
        matches!(self, Self::FinishToStart | Self::FinishToFinish)
    }

    /// Whether the dependent's finish (rather than its start) is constrained
    pub fn constrains_dependent_finish(&self) -> bool {
        matches!(self, Self::FinishToFinish | Self::StartToFinish)
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marker for the kind of node a dependency links
pub trait NodeKind: fmt::Debug + Clone + Copy + PartialEq + Eq + Send + Sync + 'static {
    const NAME: &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PhaseNode;

impl NodeKind for PhaseNode {
    const NAME: &'static str = "phase";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TaskNode;

impl NodeKind for TaskNode {
    const NAME: &'static str = "task";
}

/// `dependent` cannot proceed until `prerequisite` reaches the reference
/// point named by `dependency_type`, plus `lag_days`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Dependency<N> {
    #[serde(default)]
    pub id: Option<Id>,
    pub prerequisite_id: Id,
    pub dependent_id: Id,
    #[serde(default)]
    pub dependency_type: DependencyType,
    #[serde(default)]
    pub lag_days: u32,
    #[serde(skip)]
    kind: PhantomData<N>,
}

pub type PhaseDependency = Dependency<PhaseNode>;
pub type TaskDependency = Dependency<TaskNode>;

impl<N: NodeKind> Dependency<N> {
    /// Finish-to-start with no lag
    pub fn new(prerequisite_id: Id, dependent_id: Id) -> Self {
        Self {
            id: None,
            prerequisite_id,
            dependent_id,
            dependency_type: DependencyType::FinishToStart,
            lag_days: 0,
            kind: PhantomData,
        }
    }

    pub fn with_type(mut self, dependency_type: DependencyType) -> Self {
        self.dependency_type = dependency_type;
        self
    }

    pub fn with_lag(mut self, lag_days: u32) -> Self {
        self.lag_days = lag_days;
        self
    }

    pub fn with_id(mut self, id: Id) -> Self {
        self.id = Some(id);
        self
    }

    /// The unique storage key
    pub fn pair(&self) -> (Id, Id) {
        (self.prerequisite_id, self.dependent_id)
    }

    pub fn node_kind(&self) -> &'static str {
        N::NAME
    }
}

/// A node id together with the project that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub id: Id,
    pub project_id: Id,
}

impl NodeRef {
    pub fn new(id: Id, project_id: Id) -> Self {
        Self { id, project_id }
    }
}
