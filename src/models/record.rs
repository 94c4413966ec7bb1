//! Plain formulation records
//!
//! Nested primitives (strings, decimals as strings, booleans, sequences)
//! exchanged with persistence. `deserialize(serialize(f))` reproduces the
//! ingredient order, amounts, lock states, costs and name of `f`.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::{DataType, Food, Formulation, Ingredient, IngredientCost, ModelError, Nutrient, QuantityMode};
use crate::formulation::{distribute_percentages, restore_lock_invariant};
use crate::nutrition::units::{canonicalize_unit, parse_mass_unit, UnitError};

/// Record format version written by `serialize`
pub const RECORD_VERSION: u32 = 1;

/// Record conversion errors
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Invalid decimal in {field}: {value:?}")]
    InvalidDecimal { field: &'static str, value: String },

    #[error("Unknown quantity mode: {0:?}")]
    InvalidQuantityMode(String),

    #[error("Unknown pack unit: {0:?}")]
    InvalidPackUnit(String),

    #[error("Unsupported record version {0}")]
    UnsupportedVersion(u32),

    #[error("Unit error: {0}")]
    Unit(#[from] UnitError),

    #[error("Invalid record: {0}")]
    Model(#[from] ModelError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for record conversion
pub type RecordResult<T> = Result<T, RecordError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulationRecord {
    #[serde(default = "default_version")]
    pub version: u32,
    pub name: String,
    #[serde(default = "default_mode")]
    pub quantity_mode: String,
    #[serde(default)]
    pub ingredients: Vec<IngredientRecord>,
}

fn default_version() -> u32 {
    RECORD_VERSION
}

fn default_mode() -> String {
    QuantityMode::Grams.as_str().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientRecord {
    pub food: FoodRecord,
    pub amount_g: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FoodRecord {
    pub external_id: i64,
    pub description: String,
    pub data_type: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub nutrients: Vec<NutrientRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NutrientRecord {
    pub name: String,
    pub unit: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostRecord {
    pub pack_amount: String,
    pub pack_unit: String,
    pub pack_price: String,
}

fn decimal(field: &'static str, value: &str) -> RecordResult<Decimal> {
    Decimal::from_str(value.trim()).map_err(|_| RecordError::InvalidDecimal {
        field,
        value: value.to_string(),
    })
}

// ============================================================================
// Foods
// ============================================================================

pub fn food_to_record(food: &Food) -> FoodRecord {
    FoodRecord {
        external_id: food.external_id(),
        description: food.description().to_string(),
        data_type: food.data_type().as_str().to_string(),
        brand: food.brand().map(str::to_string),
        nutrients: food
            .nutrients()
            .iter()
            .map(|n| NutrientRecord {
                name: n.name().to_string(),
                unit: n.unit().as_str().to_string(),
                amount: n.amount().to_string(),
            })
            .collect(),
    }
}

pub fn record_to_food(record: &FoodRecord) -> RecordResult<Food> {
    let nutrients = record
        .nutrients
        .iter()
        .map(|n| -> RecordResult<Nutrient> {
            let unit = canonicalize_unit(&n.unit)?;
            let amount = decimal("nutrient amount", &n.amount)?;
            Ok(Nutrient::new(n.name.as_str(), unit, amount)?)
        })
        .collect::<RecordResult<Vec<_>>>()?;

    Ok(Food::new(
        record.external_id,
        record.description.as_str(),
        DataType::parse(&record.data_type),
        record.brand.clone(),
        nutrients,
    )?)
}

// ============================================================================
// Formulations
// ============================================================================

pub fn serialize(formulation: &Formulation) -> FormulationRecord {
    FormulationRecord {
        version: RECORD_VERSION,
        name: formulation.name().to_string(),
        quantity_mode: formulation.quantity_mode().as_str().to_string(),
        ingredients: formulation
            .ingredients()
            .iter()
            .map(|ing| IngredientRecord {
                food: food_to_record(ing.food()),
                amount_g: ing.amount_g().to_string(),
                locked: ing.is_locked(),
                cost: ing.cost().map(|c| CostRecord {
                    pack_amount: c.pack_amount.to_string(),
                    pack_unit: c.pack_unit.as_str().to_string(),
                    pack_price: c.pack_price.to_string(),
                }),
            })
            .collect(),
    }
}

/// Rebuild a formulation from its record.
///
/// Ingredients carrying identical food snapshots share one `Arc<Food>`.
/// Percentages are recomputed, and a record whose ingredients are all locked
/// gets its first ingredient unlocked.
pub fn deserialize(record: &FormulationRecord) -> RecordResult<Formulation> {
    if record.version > RECORD_VERSION {
        return Err(RecordError::UnsupportedVersion(record.version));
    }

    let mode = QuantityMode::from_str(&record.quantity_mode)
        .ok_or_else(|| RecordError::InvalidQuantityMode(record.quantity_mode.clone()))?;
    let mut formulation = Formulation::with_mode(record.name.as_str(), mode);

    let mut foods: HashMap<&FoodRecord, Arc<Food>> = HashMap::new();
    for ing in &record.ingredients {
        let food = match foods.get(&ing.food) {
            Some(food) => Arc::clone(food),
            None => {
                let food = Arc::new(record_to_food(&ing.food)?);
                foods.insert(&ing.food, Arc::clone(&food));
                food
            }
        };

        let mut ingredient = Ingredient::new(food, decimal("amount_g", &ing.amount_g)?)?;
        ingredient.set_locked(ing.locked);
        if let Some(cost) = &ing.cost {
            let unit = parse_mass_unit(&cost.pack_unit)
                .ok_or_else(|| RecordError::InvalidPackUnit(cost.pack_unit.clone()))?;
            ingredient.set_cost(Some(IngredientCost::new(
                decimal("pack_amount", &cost.pack_amount)?,
                unit,
                decimal("pack_price", &cost.pack_price)?,
            )?));
        }
        formulation.ingredients_mut().push(ingredient);
    }

    if let Some(index) = restore_lock_invariant(&mut formulation) {
        warn!(
            formulation = %formulation.name(),
            index,
            "Record had every ingredient locked; unlocked one"
        );
    }
    distribute_percentages(&mut formulation);
    Ok(formulation)
}

pub fn to_json(formulation: &Formulation) -> RecordResult<String> {
    Ok(serde_json::to_string_pretty(&serialize(formulation))?)
}

pub fn from_json(json: &str) -> RecordResult<Formulation> {
    let record: FormulationRecord = serde_json::from_str(json)?;
    deserialize(&record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formulation::{add_ingredient, set_ingredient_cost, toggle_lock};
    use crate::nutrition::units::{CanonicalUnit, MassUnit};

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn egg() -> Arc<Food> {
        Arc::new(
            Food::new(
                171287,
                "Egg, whole, raw, fresh",
                DataType::SrLegacy,
                None,
                vec![
                    Nutrient::new("Protein", CanonicalUnit::Gram, d("12.56")).unwrap(),
                    Nutrient::new("Energy (kcal)", CanonicalUnit::Kilocalorie, d("143")).unwrap(),
                ],
            )
            .unwrap(),
        )
    }

    fn sample() -> Formulation {
        let mut f = Formulation::with_mode("Custard", QuantityMode::Grams);
        add_ingredient(&mut f, egg(), d("120.5")).unwrap();
        add_ingredient(
            &mut f,
            Arc::new(Food::new(2, "Sugar", DataType::Branded, Some("Acme".into()), vec![]).unwrap()),
            d("30"),
        )
        .unwrap();
        add_ingredient(&mut f, egg(), d("10")).unwrap();
        toggle_lock(&mut f, 1).unwrap();
        let cost = IngredientCost::new(d("1"), MassUnit::Kg, d("2.40")).unwrap();
        set_ingredient_cost(&mut f, 1, Some(cost)).unwrap();
        f
    }

    #[test]
    fn test_round_trip_preserves_formulation() {
        let original = sample();
        let restored = deserialize(&serialize(&original)).unwrap();

        assert_eq!(restored.name(), "Custard");
        assert_eq!(restored.len(), 3);
        for (a, b) in original.ingredients().iter().zip(restored.ingredients()) {
            assert_eq!(a.amount_g(), b.amount_g());
            assert_eq!(a.is_locked(), b.is_locked());
            assert_eq!(a.food(), b.food());
            assert_eq!(a.cost(), b.cost());
        }
        assert_eq!(serialize(&restored), serialize(&original));
    }

    #[test]
    fn test_json_round_trip() {
        let json = to_json(&sample()).unwrap();
        assert!(json.contains("\"amount_g\": \"120.5\""));
        let restored = from_json(&json).unwrap();
        assert_eq!(restored.total_weight(), d("160.5"));
    }

    #[test]
    fn test_identical_foods_share_snapshot() {
        let restored = deserialize(&serialize(&sample())).unwrap();
        let first = restored.ingredients()[0].food();
        let third = restored.ingredients()[2].food();
        assert!(Arc::ptr_eq(first, third));
    }

    #[test]
    fn test_all_locked_record_is_repaired() {
        let mut record = serialize(&sample());
        for ing in &mut record.ingredients {
            ing.locked = true;
        }

        let restored = deserialize(&record).unwrap();
        assert!(!restored.ingredients()[0].is_locked());
        assert_eq!(restored.unlocked_count(), 1);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut record = serialize(&sample());
        record.ingredients[0].amount_g = "lots".into();
        assert!(matches!(deserialize(&record), Err(RecordError::InvalidDecimal { field: "amount_g", .. })));

        let mut record = serialize(&sample());
        record.quantity_mode = "volume".into();
        assert!(matches!(deserialize(&record), Err(RecordError::InvalidQuantityMode(_))));

        let mut record = serialize(&sample());
        record.ingredients[0].food.nutrients[0].unit = "cups".into();
        assert!(matches!(deserialize(&record), Err(RecordError::Unit(_))));
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let f = from_json(r#"{"name": "Blank"}"#).unwrap();
        assert!(f.is_empty());
        assert_eq!(f.quantity_mode(), QuantityMode::Grams);
    }
}
