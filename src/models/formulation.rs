//! Formulation model
//!
//! The aggregate root: an ordered ingredient list and its quantity mode.
//! Mutation goes through `crate::formulation`; this type only exposes reads
//! and crate-private building blocks.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Ingredient;

/// How the user edits quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityMode {
    /// Amounts are absolute; the batch weight follows the edits
    #[default]
    Grams,
    /// The batch weight is held; edits move mass between unlocked ingredients
    Percent,
}

impl QuantityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuantityMode::Grams => "grams",
            QuantityMode::Percent => "percent",
        }
    }

    /// Parse from string (accepts the "g" / "%" shorthand)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "grams" | "g" => Some(QuantityMode::Grams),
            "percent" | "%" => Some(QuantityMode::Percent),
            _ => None,
        }
    }
}

/// Flattened, presentation-ready ingredient row
#[derive(Debug, Clone, Serialize)]
pub struct IngredientRow {
    pub index: usize,
    pub external_id: i64,
    pub description: String,
    pub data_type: String,
    pub brand: Option<String>,
    pub amount_g: Decimal,
    pub percentage: Decimal,
    pub locked: bool,
    pub cost_per_g: Option<Decimal>,
}

/// Multi-ingredient formulation
#[derive(Debug, Clone, PartialEq)]
pub struct Formulation {
    name: String,
    ingredients: Vec<Ingredient>,
    quantity_mode: QuantityMode,
}

impl Formulation {
    /// Empty formulation in grams mode
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_mode(name, QuantityMode::Grams)
    }

    pub fn with_mode(name: impl Into<String>, quantity_mode: QuantityMode) -> Self {
        Self {
            name: name.into().trim().to_string(),
            ingredients: Vec::new(),
            quantity_mode,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity_mode(&self) -> QuantityMode {
        self.quantity_mode
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    pub fn ingredient(&self, index: usize) -> Option<&Ingredient> {
        self.ingredients.get(index)
    }

    pub fn len(&self) -> usize {
        self.ingredients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty()
    }

    /// Total batch weight in grams
    pub fn total_weight(&self) -> Decimal {
        self.ingredients.iter().map(Ingredient::amount_g).sum()
    }

    pub fn locked_weight(&self) -> Decimal {
        self.ingredients
            .iter()
            .filter(|i| i.is_locked())
            .map(Ingredient::amount_g)
            .sum()
    }

    pub fn unlocked_count(&self) -> usize {
        self.ingredients.iter().filter(|i| !i.is_locked()).count()
    }

    /// Indices of unlocked ingredients, in list order
    pub fn unlocked_indices(&self) -> Vec<usize> {
        self.ingredients
            .iter()
            .enumerate()
            .filter(|(_, i)| !i.is_locked())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Flatten the ingredient list for display or export
    pub fn ui_items(&self) -> Vec<IngredientRow> {
        self.ingredients
            .iter()
            .enumerate()
            .map(|(index, ing)| IngredientRow {
                index,
                external_id: ing.food().external_id(),
                description: ing.food().description().to_string(),
                data_type: ing.food().data_type().as_str().to_string(),
                brand: ing.food().brand().map(str::to_string),
                amount_g: ing.amount_g(),
                percentage: ing.percentage(),
                locked: ing.is_locked(),
                cost_per_g: ing.cost().map(|c| c.cost_per_gram()),
            })
            .collect()
    }

    pub(crate) fn ingredients_mut(&mut self) -> &mut Vec<Ingredient> {
        &mut self.ingredients
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_quantity_mode(&mut self, mode: QuantityMode) {
        self.quantity_mode = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::models::{DataType, Food};

    fn ingredient(id: i64, grams: i64, locked: bool) -> Ingredient {
        let food = Arc::new(Food::new(id, format!("Food {id}"), DataType::Foundation, None, vec![]).unwrap());
        let mut ing = Ingredient::new(food, Decimal::from(grams)).unwrap();
        ing.set_locked(locked);
        ing
    }

    #[test]
    fn test_quantity_mode_parse() {
        assert_eq!(QuantityMode::from_str("%"), Some(QuantityMode::Percent));
        assert_eq!(QuantityMode::from_str("Grams"), Some(QuantityMode::Grams));
        assert_eq!(QuantityMode::from_str("ounces"), None);
    }

    #[test]
    fn test_weights_and_indices() {
        let mut f = Formulation::new("Granola");
        f.ingredients_mut().push(ingredient(1, 100, false));
        f.ingredients_mut().push(ingredient(2, 50, true));
        f.ingredients_mut().push(ingredient(3, 25, false));

        assert_eq!(f.total_weight(), Decimal::from(175));
        assert_eq!(f.locked_weight(), Decimal::from(50));
        assert_eq!(f.unlocked_count(), 2);
        assert_eq!(f.unlocked_indices(), vec![0, 2]);
    }

    #[test]
    fn test_ui_items() {
        let mut f = Formulation::new("Granola");
        f.ingredients_mut().push(ingredient(9, 10, true));

        let rows = f.ui_items();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].index, 0);
        assert_eq!(rows[0].external_id, 9);
        assert_eq!(rows[0].description, "Food 9");
        assert!(rows[0].locked);
    }
}
