//! # promo-services
//!
//! Engine services for Immo Promo projects.
//!
//! Dependency creation is the only mutating service; it runs under a
//! per-project lock. Everything else reads a project snapshot and returns
//! a report: critical path, progress rollups, budget variance, permit
//! workflows and schedule alerts.

pub mod base;
pub mod dependencies;
pub mod permits;
pub mod progress;
pub mod schedule;
pub mod variance;

pub use base::*;
