//! Data models
//!
//! Typed records for nutrients, foods, ingredients and formulations, plus the
//! plain serialization shape handed to persistence.

use rust_decimal::Decimal;
use thiserror::Error;

mod food;
mod formulation;
mod ingredient;
mod nutrient;
pub mod record;

pub use food::{DataType, Food};
pub use formulation::{Formulation, IngredientRow, QuantityMode};
pub use ingredient::{Ingredient, IngredientCost};
pub use nutrient::Nutrient;
pub use record::{FormulationRecord, RecordError};

/// Constructor-time validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Nutrient name cannot be empty")]
    EmptyNutrientName,

    #[error("Nutrient {name:?} has negative amount {amount}")]
    NegativeNutrientAmount { name: String, amount: Decimal },

    #[error("Food description cannot be empty")]
    EmptyDescription,

    #[error("External id must be positive for {data_type} foods (got {external_id})")]
    InvalidExternalId { external_id: i64, data_type: String },

    #[error("Duplicate nutrient {0:?} in food")]
    DuplicateNutrient(String),

    #[error("Ingredient amount must be non-negative (got {0})")]
    NegativeAmount(Decimal),

    #[error("Pack amount must be positive (got {0})")]
    InvalidPackAmount(Decimal),

    #[error("Pack price must be non-negative (got {0})")]
    NegativePrice(Decimal),
}
