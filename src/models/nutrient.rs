//! Nutrient model
//!
//! A canonical measurement: name, unit and a non-negative decimal amount.

use rust_decimal::Decimal;
use serde::Serialize;

use super::ModelError;
use crate::nutrition::units::CanonicalUnit;

/// Canonical nutrient measurement (per 100 g of the owning food)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Nutrient {
    name: String,
    unit: CanonicalUnit,
    amount: Decimal,
}

impl Nutrient {
    pub fn new(name: impl Into<String>, unit: CanonicalUnit, amount: Decimal) -> Result<Self, ModelError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ModelError::EmptyNutrientName);
        }
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ModelError::NegativeNutrientAmount { name, amount });
        }

        Ok(Self {
            name,
            unit,
            amount: amount.normalize(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> CanonicalUnit {
        self.unit
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_valid_nutrient() {
        let n = Nutrient::new(" Protein ", CanonicalUnit::Gram, Decimal::from_str("12.50").unwrap()).unwrap();
        assert_eq!(n.name(), "Protein");
        assert_eq!(n.unit(), CanonicalUnit::Gram);
        assert_eq!(n.amount().to_string(), "12.5");
    }

    #[test]
    fn test_rejects_empty_name() {
        assert_eq!(
            Nutrient::new("  ", CanonicalUnit::Gram, Decimal::ONE),
            Err(ModelError::EmptyNutrientName)
        );
    }

    #[test]
    fn test_rejects_negative_amount() {
        let err = Nutrient::new("Sodium, Na", CanonicalUnit::Milligram, Decimal::from(-1)).unwrap_err();
        assert!(matches!(err, ModelError::NegativeNutrientAmount { .. }));
        assert!(Nutrient::new("Sodium, Na", CanonicalUnit::Milligram, Decimal::ZERO).is_ok());
    }
}
