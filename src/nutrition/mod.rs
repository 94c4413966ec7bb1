//! Nutrition module
//!
//! Units, the canonical nutrient catalog, normalization of upstream nutrient
//! rows, and aggregation over formulations. Nothing here performs I/O.

pub mod calculator;
pub mod catalog;
pub mod normalizer;
pub mod numbers;
pub mod units;

pub use calculator::{
    calculate_cost, calculate_energy, calculate_per_ingredient, calculate_totals, calculate_totals_with_units,
    nutrient_value, CostSummary, Energy,
};
pub use normalizer::{
    normalize_food, normalize_nutrients, NormalizationReport, NormalizedFood, RawFood, RawNutrientRecord,
};
pub use numbers::parse_user_number;
pub use units::{canonicalize_unit, convert, parse_mass_unit, CanonicalUnit, MassUnit, UnitError};
