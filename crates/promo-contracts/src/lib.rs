//! # promo-contracts
//!
//! Contract validation for the Immo Promo scheduling engine.
//!
//! Contracts validate a proposed mutation before anything is written. The
//! dependency contract is the only authority on whether a new edge may
//! enter a project's graph: self-loops, cross-project pairs and cycles
//! are rejected here.

pub mod base;
pub mod dependencies;

pub use base::*;
pub use dependencies::{
    validate_new_edge, CreateDependencyContract, CycleDetector, DependencyGraph, Edge, NodeLookup,
};
