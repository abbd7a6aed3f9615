//! Permit workflow services
//!
//! A fixed catalog of permit types with type-level prerequisites, ordered
//! into a workflow with review checkpoints and duration estimates.

mod catalog;
mod workflow;

pub use catalog::{PermitCatalog, PermitOrder, PermitOrderError};
pub use workflow::{
    BlockingImpact, BlockingPermit, Checkpoint, DurationEstimate, PermitStep, PermitWorkflow,
    PermitWorkflowGenerator, WorkflowEntry, CHECKPOINT_REVIEW_DAYS,
};
