//! Nutrient normalizer
//!
//! Turns the raw nutrient rows of one upstream food into a canonical,
//! deduplicated nutrient set. Rows that cannot be used are dropped and
//! counted in a [`NormalizationReport`]; one bad row never fails the food.
//!
//! Steps, in order:
//! 1. alias resolution (denylisted rows dropped)
//! 2. amount parsing
//! 3. unit resolution and conversion to the catalog unit
//! 4. one winner per canonical name (merged synonyms are summed)
//! 5. total-vs-breakdown deduplication
//! 6. gap filling (nitrogen, branded water)
//! 7. derived energy
//! 8. catalog ordering

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::catalog::{
    self, AliasResolution, ASH, BREAKDOWN_FAMILIES, CARBOHYDRATE, ENERGY_KCAL, ENERGY_KJ, FIBER, NITROGEN,
    PROTEIN, TOTAL_FAT, WATER,
};
use super::numbers::parse_user_number;
use super::units::{canonicalize_unit, convert, CanonicalUnit, UnitError};
use crate::models::{DataType, Food, ModelError, Nutrient};

/// Decimal places kept on values produced by division
pub const DERIVED_SCALE: u32 = 9;

/// Protein-to-nitrogen conversion factor
fn nitrogen_factor() -> Decimal {
    Decimal::new(625, 2)
}

// ============================================================================
// Input / Output
// ============================================================================

/// One upstream nutrient row, as received
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNutrientRecord {
    pub raw_name: String,
    pub raw_unit: Option<String>,
    /// Textual form of the upstream value
    pub raw_amount: Option<String>,
}

impl RawNutrientRecord {
    pub fn new(name: impl Into<String>, unit: Option<&str>, amount: Option<&str>) -> Self {
        Self {
            raw_name: name.into(),
            raw_unit: unit.map(str::to_string),
            raw_amount: amount.map(str::to_string),
        }
    }
}

/// One upstream food item, as received
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFood {
    pub external_id: i64,
    pub description: String,
    pub data_type: String,
    pub brand: Option<String>,
    pub nutrient_records: Vec<RawNutrientRecord>,
}

/// What happened to the rows of one food
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationReport {
    pub denylisted: usize,
    pub malformed: usize,
    pub unknown_unit: usize,
    pub incompatible_unit: usize,
    /// Rows that lost the precedence contest for their canonical name
    pub collapsed: usize,
    /// Breakdown components folded into (or dropped in favour of) an aggregate
    pub merged_breakdown: usize,
    /// Nutrients computed rather than received
    pub derived: usize,
    pub issues: Vec<String>,
}

impl NormalizationReport {
    /// Rows discarded for bad data (as opposed to deduplication)
    pub fn dropped(&self) -> usize {
        self.denylisted + self.malformed + self.unknown_unit + self.incompatible_unit
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedFood {
    pub food: Food,
    pub report: NormalizationReport,
}

/// A row that survived steps 1-3
#[derive(Debug, Clone)]
struct Candidate {
    name: String,
    unit: CanonicalUnit,
    amount: Decimal,
    rank: u8,
    /// Declared directly in the catalog unit (no conversion)
    native: bool,
    raw_name: String,
}

/// Winner order: higher rank, then native unit, then larger amount, then
/// raw name ascending. `Less` means `a` wins.
fn precedence(a: &Candidate, b: &Candidate) -> Ordering {
    b.rank
        .cmp(&a.rank)
        .then_with(|| b.native.cmp(&a.native))
        .then_with(|| b.amount.cmp(&a.amount))
        .then_with(|| a.raw_name.cmp(&b.raw_name))
}

/// Working set keyed by lowercase canonical name
type Working = BTreeMap<String, (String, CanonicalUnit, Decimal)>;

fn key(name: &str) -> String {
    name.to_lowercase()
}

// ============================================================================
// Pipeline
// ============================================================================

/// Normalize one upstream food into an immutable `Food`
pub fn normalize_food(raw: &RawFood) -> Result<NormalizedFood, ModelError> {
    let data_type = DataType::parse(&raw.data_type);
    let (nutrients, report) = normalize_nutrients(&raw.nutrient_records, &data_type);

    let food = Food::new(
        raw.external_id,
        raw.description.as_str(),
        data_type,
        raw.brand.clone(),
        nutrients,
    )?;

    debug!(
        external_id = raw.external_id,
        nutrients = food.nutrients().len(),
        dropped = report.dropped(),
        collapsed = report.collapsed,
        derived = report.derived,
        "Normalized food"
    );
    Ok(NormalizedFood { food, report })
}

/// Normalize raw rows into canonical nutrients in catalog order
pub fn normalize_nutrients(
    records: &[RawNutrientRecord],
    data_type: &DataType,
) -> (Vec<Nutrient>, NormalizationReport) {
    let mut report = NormalizationReport::default();

    let candidates: Vec<Candidate> = records
        .iter()
        .filter_map(|r| resolve_record(r, &mut report))
        .collect();

    let mut working = pick_winners(candidates, &mut report);
    collapse_breakdowns(&mut working, &mut report);
    fill_gaps(&mut working, data_type, &mut report);
    derive_energy(&mut working, &mut report);

    let mut ordered: Vec<(String, CanonicalUnit, Decimal)> = working.into_values().collect();
    ordered.sort_by(|a, b| {
        catalog::order_index(&a.0)
            .cmp(&catalog::order_index(&b.0))
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut nutrients = Vec::with_capacity(ordered.len());
    for (name, unit, amount) in ordered {
        match Nutrient::new(name, unit, amount) {
            Ok(n) => nutrients.push(n),
            Err(e) => {
                report.malformed += 1;
                report.issues.push(e.to_string());
            }
        }
    }
    (nutrients, report)
}

fn drop_record(report: &mut NormalizationReport, raw_name: &str, reason: String) {
    debug!(nutrient = raw_name, reason = %reason, "Dropped nutrient record");
    report.issues.push(format!("{}: {}", raw_name.trim(), reason));
}

/// Out-of-range amounts count as malformed; anything else is a unit mismatch
fn drop_for_unit_error(report: &mut NormalizationReport, raw_name: &str, error: &UnitError) {
    match error {
        UnitError::Overflow { .. } => report.malformed += 1,
        _ => report.incompatible_unit += 1,
    }
    drop_record(report, raw_name, error.to_string());
}

/// `total + amount`, with `amount` first expressed in `to`
fn add_converted(total: Decimal, amount: Decimal, from: CanonicalUnit, to: CanonicalUnit) -> Result<Decimal, UnitError> {
    let value = convert(amount, from, to)?;
    total.checked_add(value).ok_or(UnitError::Overflow { from, to })
}

/// Steps 1-3 for a single row
fn resolve_record(record: &RawNutrientRecord, report: &mut NormalizationReport) -> Option<Candidate> {
    let raw_name = record.raw_name.trim();
    if raw_name.is_empty() {
        report.malformed += 1;
        drop_record(report, "<unnamed>", "missing name".to_string());
        return None;
    }

    let declared = record
        .raw_unit
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .map(canonicalize_unit);

    let (name, rank, iu_factor) = match catalog::resolve_alias(raw_name, declared.clone().and_then(Result::ok)) {
        AliasResolution::Denylisted => {
            report.denylisted += 1;
            drop_record(report, raw_name, "denylisted".to_string());
            return None;
        }
        AliasResolution::Canonical { name, rank, iu_factor } => (name, rank, iu_factor),
    };

    let amount = match record.raw_amount.as_deref().and_then(parse_user_number) {
        Some(a) if a >= Decimal::ZERO => a,
        _ => {
            report.malformed += 1;
            let shown = record.raw_amount.as_deref().unwrap_or("<missing>");
            drop_record(report, raw_name, format!("unusable amount {shown:?}"));
            return None;
        }
    };

    let expected = catalog::infer_unit(&name);
    let unit = match declared {
        Some(Ok(unit)) => unit,
        Some(Err(e)) => {
            report.unknown_unit += 1;
            drop_record(report, raw_name, e.to_string());
            return None;
        }
        None => match expected {
            Some(unit) => unit,
            None => {
                report.unknown_unit += 1;
                drop_record(report, raw_name, "no unit declared or inferable".to_string());
                return None;
            }
        },
    };

    let Some(target) = expected else {
        return Some(Candidate {
            name,
            unit,
            amount,
            rank,
            native: true,
            raw_name: raw_name.to_string(),
        });
    };

    let converted = if unit == target {
        Ok(amount)
    } else if unit == CanonicalUnit::InternationalUnit {
        match iu_factor {
            Some((iu_unit, factor)) => amount
                .checked_mul(factor)
                .ok_or(UnitError::Overflow { from: unit, to: target })
                .and_then(|mass| convert(mass, iu_unit, target)),
            None => Err(UnitError::IncompatibleUnits { from: unit, to: target }),
        }
    } else {
        convert(amount, unit, target)
    };

    match converted {
        Ok(value) => Some(Candidate {
            name,
            unit: target,
            amount: value,
            rank,
            native: unit == target,
            raw_name: raw_name.to_string(),
        }),
        Err(UnitError::Overflow { .. }) => {
            report.malformed += 1;
            drop_record(report, raw_name, format!("amount {amount} {unit} out of range as {target}"));
            None
        }
        Err(_) => {
            report.incompatible_unit += 1;
            drop_record(report, raw_name, format!("cannot express {unit} as {target}"));
            None
        }
    }
}

/// Step 4: one entry per canonical name
fn pick_winners(candidates: Vec<Candidate>, report: &mut NormalizationReport) -> Working {
    let mut groups: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();
    for candidate in candidates {
        groups.entry(key(&candidate.name)).or_default().push(candidate);
    }

    let mut working = Working::new();
    for (k, mut group) in groups {
        group.sort_by(precedence);
        let winner = group[0].clone();

        if group.len() > 1 && catalog::is_merged_synonym(&winner.name) {
            let mut total = Decimal::ZERO;
            for c in &group {
                match add_converted(total, c.amount, c.unit, winner.unit) {
                    Ok(sum) => total = sum,
                    Err(e) => drop_for_unit_error(report, &c.raw_name, &e),
                }
            }
            report.merged_breakdown += group.len() - 1;
            working.insert(k, (winner.name, winner.unit, total));
            continue;
        }

        if group.len() > 1 {
            report.collapsed += group.len() - 1;
            debug!(
                nutrient = %winner.name,
                winner = %winner.raw_name,
                losers = group.len() - 1,
                "Collapsed duplicate nutrient records"
            );
        }
        working.insert(k, (winner.name, winner.unit, winner.amount));
    }
    working
}

/// Step 5: keep the aggregate, or build it from its components
fn collapse_breakdowns(working: &mut Working, report: &mut NormalizationReport) {
    for family in BREAKDOWN_FAMILIES {
        let components: Vec<_> = family
            .components
            .iter()
            .filter_map(|c| working.remove(&key(c.name)).map(|entry| (c.divisor, entry)))
            .collect();
        if components.is_empty() {
            continue;
        }
        report.merged_breakdown += components.len();

        let aggregate_key = key(family.aggregate);
        if working.contains_key(&aggregate_key) {
            continue;
        }

        let unit = catalog::infer_unit(family.aggregate).unwrap_or(components[0].1 .1);
        let mut total = Decimal::ZERO;
        for (divisor, (name, from, amount)) in &components {
            let share = if *divisor == 1 {
                *amount
            } else {
                (*amount / Decimal::from(*divisor)).round_dp(DERIVED_SCALE)
            };
            match add_converted(total, share, *from, unit) {
                Ok(sum) => total = sum,
                Err(e) => drop_for_unit_error(report, name, &e),
            }
        }

        report.derived += 1;
        debug!(aggregate = family.aggregate, components = components.len(), "Synthesized aggregate nutrient");
        working.insert(aggregate_key, (family.aggregate.to_string(), unit, total));
    }
}

fn grams(working: &Working, name: &str) -> Option<Decimal> {
    working
        .get(&key(name))
        .and_then(|(_, unit, amount)| convert(*amount, *unit, CanonicalUnit::Gram).ok())
}

/// Step 6: nitrogen from protein; water for branded foods
fn fill_gaps(working: &mut Working, data_type: &DataType, report: &mut NormalizationReport) {
    if !working.contains_key(&key(NITROGEN)) {
        if let Some(protein) = grams(working, PROTEIN) {
            let nitrogen = (protein / nitrogen_factor()).round_dp(DERIVED_SCALE);
            working.insert(key(NITROGEN), (NITROGEN.to_string(), CanonicalUnit::Gram, nitrogen));
            report.derived += 1;
        }
    }

    if *data_type == DataType::Branded && !working.contains_key(&key(WATER)) {
        let parts: Vec<Decimal> = [TOTAL_FAT, PROTEIN, CARBOHYDRATE, ASH, FIBER]
            .iter()
            .filter_map(|name| grams(working, name))
            .collect();
        if !parts.is_empty() {
            let solids = parts.iter().try_fold(Decimal::ZERO, |acc, p| acc.checked_add(*p));
            let water = solids
                .map(|s| (Decimal::ONE_HUNDRED - s).max(Decimal::ZERO))
                .unwrap_or(Decimal::ZERO);
            working.insert(key(WATER), (WATER.to_string(), CanonicalUnit::Gram, water));
            report.derived += 1;
        }
    }
}

/// Step 7: kcal/kJ consistency
fn derive_energy(working: &mut Working, report: &mut NormalizationReport) {
    let kcal_key = key(ENERGY_KCAL);
    let kj_key = key(ENERGY_KJ);
    let kcal = working.get(&kcal_key).map(|(_, _, a)| *a);
    let kj = working.get(&kj_key).map(|(_, _, a)| *a);

    let kcal_entry = |v: Decimal| (ENERGY_KCAL.to_string(), CanonicalUnit::Kilocalorie, v);
    let kj_entry = |v: Decimal| (ENERGY_KJ.to_string(), CanonicalUnit::Kilojoule, v);
    let to_kj = |kcal: Decimal| convert(kcal, CanonicalUnit::Kilocalorie, CanonicalUnit::Kilojoule).ok();
    let to_kcal = |kj: Decimal| {
        convert(kj, CanonicalUnit::Kilojoule, CanonicalUnit::Kilocalorie)
            .ok()
            .map(|v| v.round_dp(DERIVED_SCALE))
    };

    match (kcal, kj) {
        (None, None) => {
            let protein = grams(working, PROTEIN);
            let carbs = grams(working, CARBOHYDRATE);
            let fat = grams(working, TOTAL_FAT);
            if protein.is_none() && carbs.is_none() && fat.is_none() {
                return;
            }
            let four = Decimal::from(4);
            let atwater = [(four, protein), (four, carbs), (Decimal::from(9), fat)]
                .into_iter()
                .try_fold(Decimal::ZERO, |acc, (factor, g)| {
                    factor.checked_mul(g.unwrap_or_default()).and_then(|v| acc.checked_add(v))
                });
            let Some(kcal) = atwater else {
                report.issues.push("Energy: macronutrients out of range, not derived".to_string());
                return;
            };
            working.insert(kcal_key, kcal_entry(kcal));
            report.derived += 1;
            if let Some(kj) = to_kj(kcal) {
                working.insert(kj_key, kj_entry(kj));
                report.derived += 1;
            }
        }
        (Some(kcal), None) => {
            if let Some(kj) = to_kj(kcal) {
                working.insert(kj_key, kj_entry(kj));
                report.derived += 1;
            }
        }
        (None, Some(kj)) => {
            if let Some(kcal) = to_kcal(kj) {
                working.insert(kcal_key, kcal_entry(kcal));
                report.derived += 1;
            }
        }
        (Some(kcal), Some(kj)) => {
            // re-derive the coarser value from the finer one; ties keep kcal
            let rederived = if kcal.scale() >= kj.scale() {
                to_kj(kcal).map(|v| (kj_key, kj_entry(v)))
            } else {
                to_kcal(kj).map(|v| (kcal_key, kcal_entry(v)))
            };
            if let Some((k, entry)) = rederived {
                working.insert(k, entry);
                report.derived += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn rec(name: &str, unit: &str, amount: &str) -> RawNutrientRecord {
        RawNutrientRecord::new(name, Some(unit), Some(amount))
    }

    fn run(records: Vec<RawNutrientRecord>) -> (Vec<Nutrient>, NormalizationReport) {
        normalize_nutrients(&records, &DataType::Foundation)
    }

    fn amount(nutrients: &[Nutrient], name: &str) -> Option<Decimal> {
        nutrients.iter().find(|n| n.name() == name).map(Nutrient::amount)
    }

    #[test]
    fn test_nlea_fat_beats_lipid_in_either_order() {
        let forward = run(vec![
            rec("Total lipid (fat)", "g", "10"),
            rec("Total fat (NLEA)", "g", "12"),
        ]);
        let reverse = run(vec![
            rec("Total fat (NLEA)", "g", "12"),
            rec("Total lipid (fat)", "g", "10"),
        ]);

        assert_eq!(amount(&forward.0, TOTAL_FAT), Some(d("12")));
        assert_eq!(forward.0, reverse.0);
        assert_eq!(forward.1.collapsed, 1);
    }

    #[test]
    fn test_energy_derived_from_kcal() {
        let (nutrients, report) = run(vec![rec("Energy", "kcal", "165")]);
        assert_eq!(amount(&nutrients, ENERGY_KCAL), Some(d("165")));
        assert_eq!(amount(&nutrients, ENERGY_KJ), Some(d("690.36")));
        assert_eq!(report.derived, 1);
    }

    #[test]
    fn test_energy_kj_only_and_bare_energy_by_unit() {
        let (nutrients, _) = run(vec![rec("Energy", "kJ", "418.4")]);
        assert_eq!(amount(&nutrients, ENERGY_KCAL), Some(d("100")));
        assert_eq!(amount(&nutrients, ENERGY_KJ), Some(d("418.4")));
    }

    #[test]
    fn test_energy_both_present_prefers_finer_source() {
        let (nutrients, _) = run(vec![
            rec("Energy", "kcal", "100"),
            rec("Energy", "kJ", "420.00"),
        ]);
        // kJ carries more decimals, so kcal is re-derived from it
        assert_eq!(amount(&nutrients, ENERGY_KJ), Some(d("420")));
        assert_eq!(amount(&nutrients, ENERGY_KCAL), Some(d("100.382409178")));

        let (nutrients, _) = run(vec![
            rec("Energy", "kcal", "100"),
            rec("Energy", "kJ", "420"),
        ]);
        // tie: kJ follows kcal
        assert_eq!(amount(&nutrients, ENERGY_KJ), Some(d("418.4")));
    }

    #[test]
    fn test_energy_from_atwater_factors() {
        let (nutrients, report) = run(vec![
            rec("Protein", "g", "10"),
            rec("Carbohydrate, by difference", "g", "20"),
            rec("Total lipid (fat)", "g", "5"),
        ]);
        assert_eq!(amount(&nutrients, ENERGY_KCAL), Some(d("165")));
        assert_eq!(amount(&nutrients, ENERGY_KJ), Some(d("690.36")));
        // nitrogen + kcal + kJ
        assert_eq!(report.derived, 3);
    }

    #[test]
    fn test_energy_from_atwater_without_carbohydrate() {
        let (nutrients, _) = run(vec![
            rec("Protein", "g", "10"),
            rec("Total lipid (fat)", "g", "5"),
        ]);
        assert_eq!(amount(&nutrients, ENERGY_KCAL), Some(d("85")));
        assert_eq!(amount(&nutrients, ENERGY_KJ), Some(d("355.64")));
    }

    #[test]
    fn test_out_of_range_amount_drops_only_that_record() {
        let (nutrients, report) = run(vec![
            rec("Calcium, Ca", "g", "1e27"),
            rec("Iron, Fe", "mg", "2"),
        ]);
        assert_eq!(report.malformed, 1);
        assert_eq!(amount(&nutrients, "Calcium, Ca"), None);
        assert_eq!(amount(&nutrients, "Iron, Fe"), Some(d("2")));
        assert!(report.issues.iter().any(|i| i.starts_with("Calcium, Ca")));
    }

    #[test]
    fn test_out_of_range_macros_skip_energy() {
        let (nutrients, report) = run(vec![
            rec("Protein", "g", "10"),
            rec("Total lipid (fat)", "g", "7e28"),
        ]);
        assert_eq!(amount(&nutrients, TOTAL_FAT), Some(d("70000000000000000000000000000")));
        assert_eq!(amount(&nutrients, ENERGY_KCAL), None);
        assert_eq!(amount(&nutrients, ENERGY_KJ), None);
        assert!(report.issues.iter().any(|i| i.starts_with("Energy")));
    }

    #[test]
    fn test_atwater_rows_are_denylisted() {
        let (nutrients, report) = run(vec![
            rec("Energy (Atwater General Factors)", "kcal", "160"),
            rec("Energy", "kcal", "165"),
        ]);
        assert_eq!(report.denylisted, 1);
        assert_eq!(amount(&nutrients, ENERGY_KCAL), Some(d("165")));
    }

    #[test]
    fn test_malformed_amount_drops_only_that_record() {
        let (nutrients, report) = run(vec![
            rec("Protein", "g", "abc"),
            rec("Calcium, Ca", "mg", "56"),
            RawNutrientRecord::new("Iron, Fe", Some("mg"), None),
            rec("Zinc, Zn", "mg", "-1"),
        ]);
        assert_eq!(report.malformed, 3);
        assert_eq!(amount(&nutrients, "Calcium, Ca"), Some(d("56")));
        assert_eq!(amount(&nutrients, PROTEIN), None);
    }

    #[test]
    fn test_unknown_unit_is_dropped_not_zeroed() {
        let (nutrients, report) = run(vec![rec("Calcium, Ca", "cups", "56")]);
        assert!(nutrients.is_empty());
        assert_eq!(report.unknown_unit, 1);
        assert_eq!(report.issues.len(), 1);
    }

    #[test]
    fn test_missing_unit_inferred_and_mass_converted() {
        let (nutrients, _) = run(vec![
            RawNutrientRecord::new("Sodium, Na", None, Some("120")),
            rec("Potassium, K", "g", "0.35"),
        ]);
        let sodium = nutrients.iter().find(|n| n.name() == "Sodium, Na").unwrap();
        assert_eq!(sodium.unit(), CanonicalUnit::Milligram);
        assert_eq!(amount(&nutrients, "Potassium, K"), Some(d("350")));
    }

    #[test]
    fn test_incompatible_unit_is_dropped() {
        let (nutrients, report) = run(vec![rec("Calcium, Ca", "kcal", "5")]);
        assert!(nutrients.is_empty());
        assert_eq!(report.incompatible_unit, 1);
    }

    #[test]
    fn test_iu_converted_and_outranked() {
        let (nutrients, _) = run(vec![rec("Vitamin D (D2 + D3), International Units", "IU", "40")]);
        assert_eq!(amount(&nutrients, "Vitamin D (D2 + D3)"), Some(d("1")));

        let (nutrients, _) = run(vec![
            rec("Vitamin D (D2 + D3), International Units", "IU", "400"),
            rec("Vitamin D (D2 + D3)", "µg", "2.5"),
        ]);
        assert_eq!(amount(&nutrients, "Vitamin D (D2 + D3)"), Some(d("2.5")));
    }

    #[test]
    fn test_cystine_and_cysteine_are_summed() {
        let (nutrients, report) = run(vec![rec("Cystine", "g", "0.2"), rec("Cysteine", "g", "0.1")]);
        assert_eq!(amount(&nutrients, "Cysteine"), Some(d("0.3")));
        assert_eq!(report.merged_breakdown, 1);
    }

    #[test]
    fn test_sugar_components_fold_into_total() {
        let (nutrients, report) = run(vec![rec("Sucrose", "g", "2"), rec("Glucose", "g", "1.5")]);
        assert_eq!(amount(&nutrients, "Sugars, Total"), Some(d("3.5")));
        assert_eq!(amount(&nutrients, "Sucrose"), None);
        assert_eq!(report.merged_breakdown, 2);

        let (nutrients, _) = run(vec![
            rec("Sugars, total including NLEA", "g", "4"),
            rec("Sucrose", "g", "2"),
        ]);
        assert_eq!(amount(&nutrients, "Sugars, Total"), Some(d("4")));
        assert_eq!(nutrients.len(), 1);
    }

    #[test]
    fn test_vitamin_a_from_carotenoids() {
        let (nutrients, _) = run(vec![rec("Retinol", "µg", "10"), rec("Carotene, beta", "µg", "120")]);
        assert_eq!(amount(&nutrients, "Vitamin A, RAE"), Some(d("20")));
        assert_eq!(amount(&nutrients, "Retinol"), None);
    }

    #[test]
    fn test_nitrogen_from_protein() {
        let (nutrients, _) = run(vec![rec("Protein", "g", "12.5")]);
        assert_eq!(amount(&nutrients, NITROGEN), Some(d("2")));

        let (nutrients, _) = run(vec![rec("Protein", "g", "12.5"), rec("Nitrogen", "g", "1.9")]);
        assert_eq!(amount(&nutrients, NITROGEN), Some(d("1.9")));
    }

    #[test]
    fn test_branded_water_estimate() {
        let records = vec![
            rec("Protein", "g", "10"),
            rec("Total lipid (fat)", "g", "20"),
            rec("Carbohydrate, by difference", "g", "30"),
        ];
        let (branded, _) = normalize_nutrients(&records, &DataType::Branded);
        assert_eq!(amount(&branded, WATER), Some(d("40")));

        let (foundation, _) = normalize_nutrients(&records, &DataType::Foundation);
        assert_eq!(amount(&foundation, WATER), None);
    }

    #[test]
    fn test_output_in_catalog_order_and_unique() {
        let (nutrients, _) = run(vec![
            rec("Zinc, Zn", "mg", "1"),
            rec("Mystery compound", "mg", "3"),
            rec("Water", "g", "70"),
            rec("Protein", "g", "5"),
        ]);
        let names: Vec<&str> = nutrients.iter().map(Nutrient::name).collect();
        assert_eq!(names[0], WATER);
        assert_eq!(names.last(), Some(&"Mystery compound"));

        let mut lowered: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
        lowered.dedup();
        assert_eq!(lowered.len(), names.len());
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let raw = RawFood {
            external_id: 171287,
            description: "Egg, whole, raw".into(),
            data_type: "SR Legacy".into(),
            brand: None,
            nutrient_records: vec![
                rec("Total lipid (fat)", "g", "9.51"),
                rec("Protein", "g", "12.56"),
                rec("Energy", "kcal", "143"),
                rec("Cystine", "g", "0.27"),
                rec("Vitamin A, IU", "IU", "540"),
            ],
        };
        let first = normalize_food(&raw).unwrap();
        let second = normalize_food(&raw).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first.food.amount_of("Vitamin A, RAE"), Some(d("162")));
    }

    #[test]
    fn test_invalid_food_identity_fails() {
        let raw = RawFood {
            external_id: 0,
            description: "Nameless".into(),
            data_type: "Foundation".into(),
            ..Default::default()
        };
        assert!(normalize_food(&raw).is_err());
    }
}
