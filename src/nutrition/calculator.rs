//! Nutrient calculator
//!
//! Aggregates ingredient nutrients over a formulation. Food values are per
//! 100 g of the food (USDA convention); totals are per 100 g of the batch.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use super::catalog::{self, CARBOHYDRATE, ENERGY_KCAL, ENERGY_KJ, PROTEIN, TOTAL_FAT};
use super::normalizer::DERIVED_SCALE;
use super::units::{convert, CanonicalUnit, UnitError};
use crate::models::{Food, Formulation, Nutrient};

/// Batch energy per 100 g
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Energy {
    pub kcal: Decimal,
    pub kj: Decimal,
}

/// Ingredient cost roll-up
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CostSummary {
    /// Cost of the priced ingredients at their current amounts
    pub batch_cost: Decimal,
    /// `batch_cost` spread over the whole batch weight
    pub cost_per_kg: Option<Decimal>,
    pub priced: usize,
    pub unpriced: usize,
}

fn hundred() -> Decimal {
    Decimal::ONE_HUNDRED
}

/// Sum of every ingredient's nutrients in absolute amounts, keyed by
/// lowercase name. Each name keeps the unit it was first seen in.
fn accumulate(formulation: &Formulation) -> BTreeMap<String, (String, CanonicalUnit, Decimal)> {
    let mut sums: BTreeMap<String, (String, CanonicalUnit, Decimal)> = BTreeMap::new();

    for (index, ingredient) in formulation.ingredients().iter().enumerate() {
        let weight = ingredient.amount_g();
        for nutrient in ingredient.food().nutrients() {
            let key = nutrient.name().to_lowercase();
            let from = nutrient.unit();
            let (to, current) = sums.get(&key).map_or((from, Decimal::ZERO), |e| (e.1, e.2));

            let added = nutrient
                .amount()
                .checked_mul(weight)
                .map(|v| v / hundred())
                .ok_or(UnitError::Overflow { from, to })
                .and_then(|scaled| convert(scaled, from, to))
                .and_then(|value| current.checked_add(value).ok_or(UnitError::Overflow { from, to }));
            match added {
                Ok(sum) => {
                    sums.entry(key)
                        .or_insert_with(|| (nutrient.name().to_string(), to, Decimal::ZERO))
                        .2 = sum;
                }
                Err(e) => warn!(
                    ingredient = index,
                    nutrient = %nutrient.name(),
                    error = %e,
                    "Skipped nutrient contribution"
                ),
            }
        }
    }
    sums
}

/// Sort into catalog order (uncataloged names last, by name)
fn in_catalog_order(mut rows: Vec<(String, CanonicalUnit, Decimal)>) -> Vec<(String, CanonicalUnit, Decimal)> {
    rows.sort_by(|a, b| {
        catalog::order_index(&a.0)
            .cmp(&catalog::order_index(&b.0))
            .then_with(|| a.0.cmp(&b.0))
    });
    rows
}

fn per_100g_rows(formulation: &Formulation) -> Vec<(String, CanonicalUnit, Decimal)> {
    let total = formulation.total_weight();
    if total.is_zero() {
        return Vec::new();
    }

    let rows = accumulate(formulation)
        .into_values()
        .filter_map(|(name, unit, sum)| {
            match sum.checked_mul(hundred()).and_then(|v| v.checked_div(total)) {
                Some(v) => Some((name, unit, v.round_dp(DERIVED_SCALE).normalize())),
                None => {
                    warn!(nutrient = %name, "Nutrient total out of range");
                    None
                }
            }
        })
        .collect();
    in_catalog_order(rows)
}

// ============================================================================
// Totals
// ============================================================================

/// Nutrient amounts per 100 g of formulation, in catalog order.
/// Empty when the batch weighs nothing.
pub fn calculate_totals(formulation: &Formulation) -> IndexMap<String, Decimal> {
    per_100g_rows(formulation)
        .into_iter()
        .map(|(name, _, amount)| (name, amount))
        .collect()
}

/// Same as [`calculate_totals`], keeping each nutrient's unit
pub fn calculate_totals_with_units(formulation: &Formulation) -> Vec<Nutrient> {
    per_100g_rows(formulation)
        .into_iter()
        .filter_map(|(name, unit, amount)| Nutrient::new(name, unit, amount).ok())
        .collect()
}

/// Absolute nutrient amounts contributed by each ingredient, keyed by
/// ingredient index
pub fn calculate_per_ingredient(formulation: &Formulation) -> BTreeMap<usize, IndexMap<String, Decimal>> {
    formulation
        .ingredients()
        .iter()
        .enumerate()
        .map(|(index, ingredient)| {
            let amounts = ingredient
                .food()
                .nutrients()
                .iter()
                .filter_map(|n| {
                    let scaled = n.amount().checked_mul(ingredient.amount_g())?;
                    Some((n.name().to_string(), (scaled / hundred()).normalize()))
                })
                .collect();
            (index, amounts)
        })
        .collect()
}

/// Case-insensitive lookup in a totals map
pub fn nutrient_value(totals: &IndexMap<String, Decimal>, name: &str) -> Option<Decimal> {
    let name = name.trim();
    totals
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| *v)
}

// ============================================================================
// Energy
// ============================================================================

/// Energy of one food per 100 g: declared kcal, else kJ / 4.184, else
/// Atwater factors (4/4/9) over protein, carbohydrate and fat.
fn food_kcal(food: &Food) -> Option<Decimal> {
    if let Some(kcal) = food.amount_of(ENERGY_KCAL) {
        return Some(kcal);
    }
    if let Some(kj) = food.amount_of(ENERGY_KJ) {
        return convert(kj, CanonicalUnit::Kilojoule, CanonicalUnit::Kilocalorie).ok();
    }

    let macro_g = |name: &str| {
        food.nutrient(name)
            .and_then(|n| convert(n.amount(), n.unit(), CanonicalUnit::Gram).ok())
    };
    let (protein, carbs, fat) = (macro_g(PROTEIN), macro_g(CARBOHYDRATE), macro_g(TOTAL_FAT));
    if protein.is_none() && carbs.is_none() && fat.is_none() {
        return None;
    }
    let four = Decimal::from(4);
    [(four, protein), (four, carbs), (Decimal::from(9), fat)]
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, (factor, g)| {
            factor.checked_mul(g.unwrap_or_default()).and_then(|v| acc.checked_add(v))
        })
}

/// Batch energy per 100 g; zero for an empty or weightless batch
pub fn calculate_energy(formulation: &Formulation) -> Energy {
    let total = formulation.total_weight();
    if total.is_zero() {
        return Energy::default();
    }

    let mut kcal_sum = Decimal::ZERO;
    for ingredient in formulation.ingredients() {
        let weighted = food_kcal(ingredient.food())
            .and_then(|kcal| kcal.checked_mul(ingredient.amount_g()))
            .and_then(|v| kcal_sum.checked_add(v));
        match weighted {
            Some(sum) => kcal_sum = sum,
            None => warn!(
                food = %ingredient.food().description(),
                "No usable energy data; ingredient contributes 0 kcal"
            ),
        }
    }

    let kcal = (kcal_sum / total).round_dp(DERIVED_SCALE).normalize();
    let kj = convert(kcal, CanonicalUnit::Kilocalorie, CanonicalUnit::Kilojoule)
        .map(|v| v.round_dp(DERIVED_SCALE).normalize())
        .unwrap_or_else(|e| {
            warn!(error = %e, "Batch energy out of range in kJ");
            Decimal::ZERO
        });
    Energy { kcal, kj }
}

// ============================================================================
// Cost
// ============================================================================

/// Cost of the batch from the ingredients' purchase prices
pub fn calculate_cost(formulation: &Formulation) -> CostSummary {
    let mut summary = CostSummary::default();

    for ingredient in formulation.ingredients() {
        match ingredient.cost() {
            Some(cost) => {
                match cost
                    .cost_per_gram()
                    .checked_mul(ingredient.amount_g())
                    .and_then(|c| summary.batch_cost.checked_add(c))
                {
                    Some(sum) => summary.batch_cost = sum,
                    None => warn!(food = %ingredient.food().description(), "Ingredient cost out of range"),
                }
                summary.priced += 1;
            }
            None => summary.unpriced += 1,
        }
    }

    summary.batch_cost = summary.batch_cost.round_dp(6).normalize();
    let total = formulation.total_weight();
    if !total.is_zero() {
        summary.cost_per_kg = summary
            .batch_cost
            .checked_mul(Decimal::from(1000))
            .and_then(|c| c.checked_div(total))
            .map(|c| c.round_dp(6).normalize());
    }
    summary
}
