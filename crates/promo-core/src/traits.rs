//! Core traits shared by the model and the engine

use chrono::NaiveDate;

/// Primary key type
pub type Id = i64;

/// Trait for entities that have a primary key
pub trait Identifiable {
    fn id(&self) -> Id;
}

/// Trait for entities that belong to a project
pub trait ProjectScoped {
    fn project_id(&self) -> Id;
}

/// Base trait for all domain entities
pub trait Entity: Identifiable + Send + Sync {
    /// Human-readable type name for error messages
    const TYPE_NAME: &'static str;
}

/// A node that can take part in a dependency graph and be scheduled.
///
/// Missing dates are tolerated everywhere: a node without both dates has a
/// zero duration and imposes no start constraint of its own.
pub trait Schedulable: Entity + ProjectScoped {
    fn start_date(&self) -> Option<NaiveDate>;
    fn end_date(&self) -> Option<NaiveDate>;

    fn has_dates(&self) -> bool {
        self.start_date().is_some() && self.end_date().is_some()
    }
}
