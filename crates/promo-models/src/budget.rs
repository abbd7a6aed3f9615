//! Budget lines
//!
//! Only planned and actual amounts are stored; variance is always
//! recomputed by the analyzer.

use promo_core::traits::Id;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct BudgetLine {
    pub id: Id,
    #[validate(length(min = 1, max = 255))]
    pub category: String,
    pub description: Option<String>,
    #[validate(range(min = 0.0))]
    pub planned_amount: f64,
    #[validate(range(min = 0.0))]
    pub actual_amount: f64,
}

impl BudgetLine {
    pub fn new(id: Id, category: impl Into<String>, planned_amount: f64, actual_amount: f64) -> Self {
        Self {
            id,
            category: category.into(),
            description: None,
            planned_amount,
            actual_amount,
        }
    }

    pub fn variance(&self) -> f64 {
        self.actual_amount - self.planned_amount
    }
}
