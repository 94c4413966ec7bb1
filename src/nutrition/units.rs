//! Unit types and conversion constants
//!
//! Canonical nutrient units, alias resolution, and exact conversions on the
//! mass ladder (g/mg/μg) and between kcal and kJ. Formulation quantities may
//! also be entered in kitchen/industrial mass units (kg, lb, oz).

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unit resolution / conversion errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("Unknown unit: {0:?}")]
    UnknownUnit(String),

    #[error("Cannot convert {from} to {to}")]
    IncompatibleUnits {
        from: CanonicalUnit,
        to: CanonicalUnit,
    },

    #[error("Amount out of range converting {from} to {to}")]
    Overflow {
        from: CanonicalUnit,
        to: CanonicalUnit,
    },
}

/// Result type for unit operations
pub type UnitResult<T> = Result<T, UnitError>;

/// Canonical unit token for a nutrient amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CanonicalUnit {
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "mg")]
    Milligram,
    #[serde(rename = "μg")]
    Microgram,
    #[serde(rename = "kcal")]
    Kilocalorie,
    #[serde(rename = "kJ")]
    Kilojoule,
    /// International units. Transitional: converted to mass where a
    /// nutrient-specific factor is known.
    #[serde(rename = "IU")]
    InternationalUnit,
}

/// Family a unit belongs to; conversions never cross families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Mass,
    Energy,
    InternationalUnit,
}

impl CanonicalUnit {
    /// Canonical display token
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalUnit::Gram => "g",
            CanonicalUnit::Milligram => "mg",
            CanonicalUnit::Microgram => "μg",
            CanonicalUnit::Kilocalorie => "kcal",
            CanonicalUnit::Kilojoule => "kJ",
            CanonicalUnit::InternationalUnit => "IU",
        }
    }

    pub fn kind(&self) -> UnitKind {
        match self {
            CanonicalUnit::Gram | CanonicalUnit::Milligram | CanonicalUnit::Microgram => {
                UnitKind::Mass
            }
            CanonicalUnit::Kilocalorie | CanonicalUnit::Kilojoule => UnitKind::Energy,
            CanonicalUnit::InternationalUnit => UnitKind::InternationalUnit,
        }
    }

    /// Micrograms per one of this unit (mass units only)
    fn micrograms(&self) -> Option<Decimal> {
        match self {
            CanonicalUnit::Gram => Some(Decimal::new(1_000_000, 0)),
            CanonicalUnit::Milligram => Some(Decimal::new(1_000, 0)),
            CanonicalUnit::Microgram => Some(Decimal::ONE),
            _ => None,
        }
    }
}

impl fmt::Display for CanonicalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Conversion Constants
// ============================================================================

/// Kilojoules per kilocalorie (thermochemical calorie)
pub fn kj_per_kcal() -> Decimal {
    Decimal::new(4184, 3)
}

/// Grams per ounce (avoirdupois, exact)
pub fn grams_per_oz() -> Decimal {
    Decimal::new(28_349_523_125, 9)
}

/// Grams per pound (avoirdupois, exact)
pub fn grams_per_lb() -> Decimal {
    Decimal::new(45_359_237, 5)
}

// ============================================================================
// Unit Recognition
// ============================================================================

/// Resolve a raw unit string to its canonical token.
///
/// Accepts the spellings seen in FoodData Central payloads, including the
/// `æg` mojibake some exports carry for micrograms.
pub fn canonicalize_unit(raw: &str) -> UnitResult<CanonicalUnit> {
    let lower = raw.trim().to_lowercase();

    match lower.as_str() {
        "g" | "gram" | "grams" => Ok(CanonicalUnit::Gram),
        "mg" | "milligram" | "milligrams" => Ok(CanonicalUnit::Milligram),
        "ug" | "mcg" | "µg" | "μg" | "æg" | "microgram" | "micrograms" => {
            Ok(CanonicalUnit::Microgram)
        }
        "kcal" | "kilocalorie" | "kilocalories" => Ok(CanonicalUnit::Kilocalorie),
        "kj" | "kilojoule" | "kilojoules" => Ok(CanonicalUnit::Kilojoule),
        "iu" | "international unit" | "international units" => {
            Ok(CanonicalUnit::InternationalUnit)
        }
        _ => Err(UnitError::UnknownUnit(raw.trim().to_string())),
    }
}

/// Convert an amount between two compatible units.
///
/// Mass ladder conversions are exact; kJ to kcal divides by 4.184 at full
/// decimal precision. No rounding is applied. Amounts whose result does not
/// fit a `Decimal` yield [`UnitError::Overflow`].
pub fn convert(amount: Decimal, from: CanonicalUnit, to: CanonicalUnit) -> UnitResult<Decimal> {
    if from == to {
        return Ok(amount);
    }

    let converted = match (from.kind(), to.kind()) {
        (UnitKind::Mass, UnitKind::Mass) => {
            let (Some(from_ug), Some(to_ug)) = (from.micrograms(), to.micrograms()) else {
                return Err(UnitError::IncompatibleUnits { from, to });
            };
            if from_ug >= to_ug {
                amount.checked_mul(from_ug / to_ug)
            } else {
                amount.checked_div(to_ug / from_ug)
            }
        }
        (UnitKind::Energy, UnitKind::Energy) => match from {
            CanonicalUnit::Kilocalorie => amount.checked_mul(kj_per_kcal()),
            _ => amount.checked_div(kj_per_kcal()),
        },
        _ => return Err(UnitError::IncompatibleUnits { from, to }),
    };
    converted.ok_or(UnitError::Overflow { from, to })
}

// ============================================================================
// Formulation Mass Units
// ============================================================================

/// Mass units accepted for batch weights and purchase pack sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MassUnit {
    G,
    Kg,
    Mg,
    Lb,
    Oz,
}

impl MassUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            MassUnit::G => "g",
            MassUnit::Kg => "kg",
            MassUnit::Mg => "mg",
            MassUnit::Lb => "lb",
            MassUnit::Oz => "oz",
        }
    }

    /// Grams in one of this unit
    pub fn grams(&self) -> Decimal {
        match self {
            MassUnit::G => Decimal::ONE,
            MassUnit::Kg => Decimal::new(1000, 0),
            MassUnit::Mg => Decimal::new(1, 3),
            MassUnit::Lb => grams_per_lb(),
            MassUnit::Oz => grams_per_oz(),
        }
    }
}

/// Parse a mass unit for formulation quantities
pub fn parse_mass_unit(raw: &str) -> Option<MassUnit> {
    let lower = raw.trim().to_lowercase();

    match lower.as_str() {
        "g" | "gr" | "gram" | "grams" => Some(MassUnit::G),
        "kg" | "kilo" | "kilogram" | "kilograms" => Some(MassUnit::Kg),
        "mg" | "milligram" | "milligrams" => Some(MassUnit::Mg),
        "lb" | "lbs" | "pound" | "pounds" => Some(MassUnit::Lb),
        "oz" | "ounce" | "ounces" => Some(MassUnit::Oz),
        _ => None,
    }
}

/// Express a quantity in grams; `None` when the result is out of range
pub fn mass_to_grams(amount: Decimal, unit: MassUnit) -> Option<Decimal> {
    amount.checked_mul(unit.grams())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_microgram_aliases() {
        for raw in ["ug", "UG", "mcg", "µg", "μg", "æg", " ug "] {
            assert_eq!(canonicalize_unit(raw), Ok(CanonicalUnit::Microgram), "{raw}");
        }
    }

    #[test]
    fn test_iu_stays_distinct() {
        assert_eq!(canonicalize_unit("IU"), Ok(CanonicalUnit::InternationalUnit));
        assert_eq!(canonicalize_unit("kj"), Ok(CanonicalUnit::Kilojoule));
        assert_eq!(canonicalize_unit("KCAL"), Ok(CanonicalUnit::Kilocalorie));
    }

    #[test]
    fn test_unknown_unit() {
        assert_eq!(
            canonicalize_unit("SP_GR"),
            Err(UnitError::UnknownUnit("SP_GR".to_string()))
        );
        assert!(canonicalize_unit("").is_err());
    }

    #[test]
    fn test_mass_ladder() {
        assert_eq!(convert(d("1.5"), CanonicalUnit::Gram, CanonicalUnit::Milligram).unwrap(), d("1500"));
        assert_eq!(convert(d("250"), CanonicalUnit::Microgram, CanonicalUnit::Milligram).unwrap(), d("0.25"));
        assert_eq!(convert(d("3"), CanonicalUnit::Microgram, CanonicalUnit::Gram).unwrap(), d("0.000003"));
    }

    #[test]
    fn test_energy_conversion() {
        assert_eq!(convert(d("165"), CanonicalUnit::Kilocalorie, CanonicalUnit::Kilojoule).unwrap(), d("690.36"));
        assert_eq!(convert(d("690.36"), CanonicalUnit::Kilojoule, CanonicalUnit::Kilocalorie).unwrap(), d("165"));
    }

    #[test]
    fn test_out_of_range_amount_is_an_error() {
        let err = convert(d("1000000000000000000000000000"), CanonicalUnit::Gram, CanonicalUnit::Milligram).unwrap_err();
        assert_eq!(
            err,
            UnitError::Overflow { from: CanonicalUnit::Gram, to: CanonicalUnit::Milligram }
        );
        assert!(convert(Decimal::MAX, CanonicalUnit::Kilocalorie, CanonicalUnit::Kilojoule).is_err());
        // shrinking conversions stay in range
        assert!(convert(Decimal::MAX, CanonicalUnit::Milligram, CanonicalUnit::Gram).is_ok());
    }

    #[test]
    fn test_incompatible_families() {
        let err = convert(d("1"), CanonicalUnit::Gram, CanonicalUnit::Kilocalorie).unwrap_err();
        assert_eq!(
            err,
            UnitError::IncompatibleUnits { from: CanonicalUnit::Gram, to: CanonicalUnit::Kilocalorie }
        );
        assert!(convert(d("1"), CanonicalUnit::InternationalUnit, CanonicalUnit::Microgram).is_err());
        assert_eq!(
            convert(d("7"), CanonicalUnit::InternationalUnit, CanonicalUnit::InternationalUnit).unwrap(),
            d("7")
        );
    }

    #[test]
    fn test_mass_units() {
        assert_eq!(parse_mass_unit("KG"), Some(MassUnit::Kg));
        assert_eq!(parse_mass_unit("lbs"), Some(MassUnit::Lb));
        assert_eq!(parse_mass_unit("cup"), None);
        assert_eq!(mass_to_grams(d("2"), MassUnit::Kg), Some(d("2000")));
        assert_eq!(mass_to_grams(d("1"), MassUnit::Lb), Some(d("453.59237")));
        assert_eq!(mass_to_grams(Decimal::MAX, MassUnit::Kg), None);
    }

    #[test]
    fn test_serde_tokens() {
        let json = serde_json::to_string(&CanonicalUnit::Microgram).unwrap();
        assert_eq!(json, "\"μg\"");
        let unit: CanonicalUnit = serde_json::from_str("\"kJ\"").unwrap();
        assert_eq!(unit, CanonicalUnit::Kilojoule);
    }
}
