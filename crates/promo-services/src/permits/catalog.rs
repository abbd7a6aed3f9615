//! Permit type catalog and prerequisite ordering

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use promo_models::permit::{Complexity, PermitType, PermitTypeSpec};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

static STANDARD: Lazy<PermitCatalog> = Lazy::new(|| {
    PermitCatalog::new([
        spec(
            PermitType::UrbanPlanning,
            90,
            Complexity::High,
            true,
            &[],
            &["Site plan", "Ground plan", "Elevation drawings", "Descriptive notice"],
            &["Architect", "Urban planner", "Surveyor"],
        ),
        spec(
            PermitType::Construction,
            60,
            Complexity::Medium,
            false,
            &[PermitType::UrbanPlanning],
            &["Architectural drawings", "Technical drawings", "Soil survey", "Structural calculations"],
            &["Architect", "Engineering firm", "Quantity surveyor"],
        ),
        spec(
            PermitType::Environmental,
            120,
            Complexity::High,
            true,
            &[],
            &["Impact assessment", "Compensation measures", "Environmental management plan"],
            &["Environmental expert", "Ecologist", "Hydrogeologist"],
        ),
        spec(
            PermitType::Demolition,
            45,
            Complexity::Low,
            false,
            &[],
            &["Demolition drawings", "Safety procedures", "Waste management plan"],
            &["Safety coordinator", "Asbestos expert", "Waste manager"],
        ),
        spec(
            PermitType::Modification,
            30,
            Complexity::Low,
            false,
            &[PermitType::Construction],
            &["Amended drawings", "Justification of changes", "Impact on existing works"],
            &["Architect", "Engineering firm"],
        ),
    ])
});

fn spec(
    permit_type: PermitType,
    duration_days: u32,
    complexity: Complexity,
    public_consultation: bool,
    prerequisites: &[PermitType],
    deliverables: &[&str],
    stakeholders: &[&str],
) -> PermitTypeSpec {
    PermitTypeSpec {
        permit_type,
        duration_days,
        complexity,
        public_consultation,
        prerequisites: prerequisites.to_vec(),
        deliverables: deliverables.iter().map(|s| s.to_string()).collect(),
        stakeholders: stakeholders.iter().map(|s| s.to_string()).collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermitOrderError {
    #[error("permit prerequisites cannot be resolved for {}", format_types(.types))]
    Unresolved { types: Vec<PermitType> },
}

fn format_types(types: &[PermitType]) -> String {
    types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Prerequisite-respecting order, plus whatever could not be placed.
///
/// `unresolved` types are appended to `order` in request order. A non-empty
/// list means the ordering is degraded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermitOrder {
    pub order: Vec<PermitType>,
    pub unresolved: Vec<PermitType>,
}

impl PermitOrder {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PermitCatalog {
    specs: HashMap<PermitType, PermitTypeSpec>,
}

impl PermitCatalog {
    pub fn new(specs: impl IntoIterator<Item = PermitTypeSpec>) -> Self {
        Self {
            specs: specs.into_iter().map(|s| (s.permit_type, s)).collect(),
        }
    }

    /// Process-wide catalog of the regulated permit types
    pub fn standard() -> &'static PermitCatalog {
        &STANDARD
    }

    pub fn get(&self, permit_type: PermitType) -> Option<&PermitTypeSpec> {
        self.specs.get(&permit_type)
    }

    pub fn contains(&self, permit_type: PermitType) -> bool {
        self.specs.contains_key(&permit_type)
    }

    pub fn prerequisites(&self, permit_type: PermitType) -> &[PermitType] {
        self.get(permit_type)
            .map(|s| s.prerequisites.as_slice())
            .unwrap_or_default()
    }

    /// Kahn-style rounds: each round emits every requested type whose
    /// requested prerequisites are already placed.
    ///
    /// Prerequisites that were not requested do not hold a type back. If a
    /// round places nothing, the remaining types are appended as-is.
    pub fn sort_by_dependencies(&self, requested: &[PermitType]) -> PermitOrder {
        let mut remaining: Vec<PermitType> = Vec::with_capacity(requested.len());
        for &t in requested {
            if !remaining.contains(&t) {
                remaining.push(t);
            }
        }
        let wanted: HashSet<PermitType> = remaining.iter().copied().collect();
        let mut placed: HashSet<PermitType> = HashSet::new();
        let mut order = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let (ready, blocked): (Vec<_>, Vec<_>) = remaining.iter().copied().partition(|t| {
                self.prerequisites(*t)
                    .iter()
                    .all(|p| !wanted.contains(p) || placed.contains(p))
            });
            if ready.is_empty() {
                warn!(
                    unresolved = %format_types(&blocked),
                    "permit prerequisites are circular, appending remaining types"
                );
                order.extend(blocked.iter().copied());
                return PermitOrder {
                    order,
                    unresolved: blocked,
                };
            }
            placed.extend(ready.iter().copied());
            order.extend(ready);
            remaining = blocked;
        }

        debug!(order = %format_types(&order), "permits ordered");
        PermitOrder {
            order,
            unresolved: Vec::new(),
        }
    }

    /// Same as [`sort_by_dependencies`](Self::sort_by_dependencies) but
    /// refuses a degraded order.
    pub fn sort_strict(&self, requested: &[PermitType]) -> Result<Vec<PermitType>, PermitOrderError> {
        let sorted = self.sort_by_dependencies(requested);
        if sorted.is_complete() {
            Ok(sorted.order)
        } else {
            Err(PermitOrderError::Unresolved {
                types: sorted.unresolved,
            })
        }
    }
}
