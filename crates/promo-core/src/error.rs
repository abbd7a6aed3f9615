//! Core error types for the scheduling engine
//!
//! Structural errors reject a mutation outright; validation errors collect
//! attribute-level messages for the caller's form.

use std::collections::HashMap;
use thiserror::Error;

use crate::traits::Id;

/// Core error type for all engine operations
#[derive(Error, Debug)]
pub enum PromoError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    Structural(#[from] StructuralError),

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PromoError {
    pub fn not_found(entity: &'static str, id: Id) -> Self {
        PromoError::NotFound {
            entity,
            field: "id",
            value: id.to_string(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            PromoError::NotFound { .. } => 404,
            PromoError::Validation(_) | PromoError::Structural(_) => 422,
            PromoError::Conflict { .. } => 409,
            PromoError::Config(_) | PromoError::Internal(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            PromoError::NotFound { .. } => "not_found",
            PromoError::Validation(_) => "validation_failed",
            PromoError::Structural(e) => e.error_code(),
            PromoError::Conflict { .. } => "conflict",
            PromoError::Config(_) => "configuration_error",
            PromoError::Internal(_) => "internal_error",
        }
    }
}

/// Rejection of a dependency that would break the graph's structure.
///
/// These are never corrected silently: the requested mutation is refused
/// and the message is meant to reach the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("an element cannot depend on itself (id {node_id})")]
    SelfLoop { node_id: Id },

    #[error(
        "dependencies must stay within one project \
         ({prerequisite_id} belongs to project {prerequisite_project}, \
         {dependent_id} to project {dependent_project})"
    )]
    CrossProject {
        prerequisite_id: Id,
        prerequisite_project: Id,
        dependent_id: Id,
        dependent_project: Id,
    },

    #[error("this dependency would create a circular reference ({})", format_path(.path))]
    Cycle {
        prerequisite_id: Id,
        dependent_id: Id,
        /// Existing chain from the dependent back to the prerequisite.
        path: Vec<Id>,
    },

    #[error("the dependency graph contains a cycle through {nodes:?}")]
    CyclicGraph { nodes: Vec<Id> },
}

fn format_path(path: &[Id]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl StructuralError {
    pub fn error_code(&self) -> &'static str {
        match self {
            StructuralError::SelfLoop { .. } => "self_loop",
            StructuralError::CrossProject { .. } => "cross_project",
            StructuralError::Cycle { .. } | StructuralError::CyclicGraph { .. } => {
                "circular_dependency"
            }
        }
    }

    /// Attribute the error should be reported against in a form.
    pub fn attribute(&self) -> &'static str {
        match self {
            StructuralError::SelfLoop { .. } => "prerequisite_id",
            StructuralError::CrossProject { .. } => "prerequisite_id",
            StructuralError::Cycle { .. } | StructuralError::CyclicGraph { .. } => "base",
        }
    }
}

/// Validation errors collection, keyed by attribute
#[derive(Error, Debug, Default, Clone)]
#[error("Validation errors: {errors:?}")]
pub struct ValidationErrors {
    /// Field-specific errors: field_name -> Vec<error_messages>
    pub errors: HashMap<String, Vec<String>>,
    /// Base errors not tied to a specific field
    pub base_errors: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_base(&mut self, message: impl Into<String>) {
        self.base_errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.base_errors.is_empty()
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.errors.get(field)
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
        self.base_errors.extend(other.base_errors);
    }

    pub fn full_messages(&self) -> Vec<String> {
        let mut messages = self.base_errors.clone();
        let mut fields: Vec<_> = self.errors.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        for (field, field_messages) in fields {
            for msg in field_messages {
                messages.push(format!("{} {}", field, msg));
            }
        }
        messages
    }
}

impl From<StructuralError> for ValidationErrors {
    fn from(err: StructuralError) -> Self {
        let mut errors = ValidationErrors::new();
        match err.attribute() {
            "base" => errors.add_base(err.to_string()),
            field => errors.add(field, err.to_string()),
        }
        errors
    }
}

impl From<validator::ValidationErrors> for ValidationErrors {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut errors = ValidationErrors::new();
        for (field, field_errors) in err.field_errors() {
            for e in field_errors {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("is invalid ({})", e.code));
                errors.add(field.to_string(), message);
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_path() {
        let err = StructuralError::Cycle {
            prerequisite_id: 3,
            dependent_id: 1,
            path: vec![1, 2, 3],
        };
        assert_eq!(
            err.to_string(),
            "this dependency would create a circular reference (1 -> 2 -> 3)"
        );
        assert_eq!(err.error_code(), "circular_dependency");
    }

    #[test]
    fn test_structural_error_into_validation_errors() {
        let errors: ValidationErrors = StructuralError::SelfLoop { node_id: 7 }.into();
        assert!(errors.has_error("prerequisite_id"));

        let errors: ValidationErrors = StructuralError::CyclicGraph { nodes: vec![1, 2] }.into();
        assert_eq!(errors.base_errors.len(), 1);
    }

    #[test]
    fn test_status_codes() {
        let err = PromoError::from(StructuralError::SelfLoop { node_id: 1 });
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.error_code(), "self_loop");
        assert_eq!(PromoError::not_found("phase", 4).status_code(), 404);
        assert_eq!(
            PromoError::Conflict {
                message: "duplicate".into()
            }
            .error_code(),
            "conflict"
        );
    }

    #[test]
    fn test_merge_and_full_messages() {
        let mut a = ValidationErrors::new();
        a.add("lag_days", "must be at most 2000");
        let mut b = ValidationErrors::new();
        b.add_base("would create a cycle");
        a.merge(b);
        assert_eq!(
            a.full_messages(),
            vec!["would create a cycle", "lag_days must be at most 2000"]
        );
    }
}
