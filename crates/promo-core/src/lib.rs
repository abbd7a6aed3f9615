//! # promo-core
//!
//! Core types, traits, and utilities for the Immo Promo scheduling engine.
//!
//! This crate provides the foundational building blocks used across all other crates:
//! - Error taxonomy (structural rejections vs. validation messages)
//! - Result type aliases and the service result envelope
//! - Core traits (Entity, Identifiable, ProjectScoped, Schedulable)
//! - Working-day calendar and numeric helpers
//! - Engine configuration

pub mod calendar;
pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use calendar::*;
pub use error::*;
pub use result::*;
pub use traits::*;
pub use types::*;
