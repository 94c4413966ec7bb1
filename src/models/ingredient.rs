//! Ingredient model
//!
//! A food placed in a formulation with an amount, a lock flag and the derived
//! percentage. Only the formulation service mutates ingredients.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use super::{Food, ModelError};
use crate::nutrition::units::{mass_to_grams, MassUnit};

/// Purchase price of an ingredient pack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngredientCost {
    pub pack_amount: Decimal,
    pub pack_unit: MassUnit,
    pub pack_price: Decimal,
    #[serde(skip)]
    cost_per_gram: Decimal,
}

impl IngredientCost {
    pub fn new(pack_amount: Decimal, pack_unit: MassUnit, pack_price: Decimal) -> Result<Self, ModelError> {
        if pack_amount <= Decimal::ZERO {
            return Err(ModelError::InvalidPackAmount(pack_amount));
        }
        if pack_price < Decimal::ZERO {
            return Err(ModelError::NegativePrice(pack_price));
        }
        let cost_per_gram = mass_to_grams(pack_amount, pack_unit)
            .filter(|g| !g.is_zero())
            .and_then(|g| pack_price.checked_div(g))
            .ok_or(ModelError::InvalidPackAmount(pack_amount))?;
        Ok(Self { pack_amount, pack_unit, pack_price, cost_per_gram })
    }

    /// Price per gram of ingredient
    pub fn cost_per_gram(&self) -> Decimal {
        self.cost_per_gram
    }
}

/// A food within a formulation
#[derive(Debug, Clone, PartialEq)]
pub struct Ingredient {
    food: Arc<Food>,
    amount_g: Decimal,
    locked: bool,
    percentage: Decimal,
    cost: Option<IngredientCost>,
}

impl Ingredient {
    /// New unlocked ingredient; percentage is filled in by the service
    pub fn new(food: Arc<Food>, amount_g: Decimal) -> Result<Self, ModelError> {
        if amount_g < Decimal::ZERO {
            return Err(ModelError::NegativeAmount(amount_g));
        }
        Ok(Self {
            food,
            amount_g,
            locked: false,
            percentage: Decimal::ZERO,
            cost: None,
        })
    }

    pub fn food(&self) -> &Arc<Food> {
        &self.food
    }

    pub fn amount_g(&self) -> Decimal {
        self.amount_g
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn percentage(&self) -> Decimal {
        self.percentage
    }

    pub fn cost(&self) -> Option<&IngredientCost> {
        self.cost.as_ref()
    }

    pub(crate) fn set_amount_g(&mut self, amount_g: Decimal) {
        self.amount_g = amount_g;
    }

    pub(crate) fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub(crate) fn set_percentage(&mut self, percentage: Decimal) {
        self.percentage = percentage;
    }

    pub(crate) fn set_cost(&mut self, cost: Option<IngredientCost>) {
        self.cost = cost;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataType;

    fn food() -> Arc<Food> {
        Arc::new(Food::new(1, "Oats", DataType::Foundation, None, vec![]).unwrap())
    }

    #[test]
    fn test_new_ingredient_defaults() {
        let ing = Ingredient::new(food(), Decimal::from(40)).unwrap();
        assert!(!ing.is_locked());
        assert_eq!(ing.amount_g(), Decimal::from(40));
        assert_eq!(ing.percentage(), Decimal::ZERO);
        assert!(ing.cost().is_none());
    }

    #[test]
    fn test_negative_amount_rejected() {
        assert_eq!(
            Ingredient::new(food(), Decimal::from(-1)),
            Err(ModelError::NegativeAmount(Decimal::from(-1)))
        );
    }

    #[test]
    fn test_cost_per_gram() {
        let cost = IngredientCost::new(Decimal::from(2), MassUnit::Kg, Decimal::from(50)).unwrap();
        assert_eq!(cost.cost_per_gram(), Decimal::new(25, 3));
        assert!(IngredientCost::new(Decimal::ZERO, MassUnit::G, Decimal::ONE).is_err());
        assert!(IngredientCost::new(Decimal::ONE, MassUnit::G, Decimal::from(-3)).is_err());
    }

    #[test]
    fn test_pack_amount_out_of_range_rejected() {
        assert_eq!(
            IngredientCost::new(Decimal::MAX, MassUnit::Kg, Decimal::ONE),
            Err(ModelError::InvalidPackAmount(Decimal::MAX))
        );
        // rounds to zero grams
        let tiny = Decimal::new(1, 28);
        assert!(IngredientCost::new(tiny, MassUnit::Mg, Decimal::ONE).is_err());
    }
}
