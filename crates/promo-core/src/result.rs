//! Result type aliases and the service result envelope

use crate::error::{PromoError, ValidationErrors};

/// Standard Result type for engine operations
pub type PromoResult<T> = Result<T, PromoError>;

/// Outcome of a mutating service call.
///
/// A failure carries the collected validation errors so the caller can
/// render them next to the offending attributes.
#[derive(Debug)]
pub struct ServiceResult<T> {
    pub success: bool,
    pub result: Option<T>,
    pub errors: ValidationErrors,
    /// Optional human-readable note (e.g. what was rejected and why)
    pub message: Option<String>,
}

impl<T> ServiceResult<T> {
    pub fn success(result: T) -> Self {
        Self {
            success: true,
            result: Some(result),
            errors: ValidationErrors::new(),
            message: None,
        }
    }

    pub fn failure(errors: ValidationErrors) -> Self {
        Self {
            success: false,
            result: None,
            errors,
            message: None,
        }
    }

    pub fn failure_with_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let mut errors = ValidationErrors::new();
        errors.add_base(message.clone());
        Self {
            message: Some(message),
            ..Self::failure(errors)
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn is_failure(&self) -> bool {
        !self.success
    }

    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ServiceResult<U> {
        ServiceResult {
            success: self.success,
            result: self.result.map(f),
            errors: self.errors,
            message: self.message,
        }
    }

    /// Convert to standard Result
    pub fn into_result(self) -> PromoResult<T> {
        if self.success {
            self.result.ok_or_else(|| {
                PromoError::Internal("ServiceResult success but no result value".into())
            })
        } else {
            Err(PromoError::Validation(self.errors))
        }
    }
}

impl<T> From<PromoResult<T>> for ServiceResult<T> {
    fn from(result: PromoResult<T>) -> Self {
        match result {
            Ok(value) => ServiceResult::success(value),
            Err(PromoError::Validation(errors)) => ServiceResult::failure(errors),
            Err(PromoError::Structural(e)) => {
                let message = e.to_string();
                ServiceResult::failure(e.into()).with_message(message)
            }
            Err(e) => ServiceResult::failure_with_message(e.to_string()),
        }
    }
}
