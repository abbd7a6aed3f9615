//! Per-project mutual exclusion for dependency insertion
//!
//! Two insertions that are each acyclic can jointly close a cycle, so the
//! read-check-insert sequence must not interleave within one project.
//! Different projects never contend.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use promo_core::traits::Id;

#[derive(Debug, Default)]
pub struct ProjectLocks {
    locks: DashMap<Id, Arc<Mutex<()>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex guarding `project_id`, created on first use
    pub fn lock_for(&self, project_id: Id) -> Arc<Mutex<()>> {
        self.locks.entry(project_id).or_default().clone()
    }

    /// Run `f` while holding the project's lock
    pub fn with_lock<T>(&self, project_id: Id, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(project_id);
        let _guard = lock.lock();
        f()
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
