//! Base service traits

use promo_core::result::ServiceResult;

/// Base trait for all callable services
pub trait Callable<Params, Output> {
    /// Execute the service
    fn call(&self, params: Params) -> ServiceResult<Output>;
}
