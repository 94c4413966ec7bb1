//! Food model
//!
//! Immutable snapshot of a food-database item and its normalized nutrients.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ModelError, Nutrient};

/// FoodData Central data type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
    Foundation,
    SrLegacy,
    Survey,
    Branded,
    Experimental,
    /// Entered by hand rather than fetched
    Manual,
    Other(String),
}

impl DataType {
    /// Parse an upstream label (case-insensitive)
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "foundation" => DataType::Foundation,
            "sr legacy" | "srlegacy" | "sr_legacy" => DataType::SrLegacy,
            "survey" | "survey (fndds)" => DataType::Survey,
            "branded" => DataType::Branded,
            "experimental" => DataType::Experimental,
            "manual" => DataType::Manual,
            _ => DataType::Other(s.trim().to_string()),
        }
    }

    /// Label used by FoodData Central
    pub fn as_str(&self) -> &str {
        match self {
            DataType::Foundation => "Foundation",
            DataType::SrLegacy => "SR Legacy",
            DataType::Survey => "Survey (FNDDS)",
            DataType::Branded => "Branded",
            DataType::Experimental => "Experimental",
            DataType::Manual => "Manual",
            DataType::Other(label) => label,
        }
    }

    /// Search ranking; lower sorts first
    pub fn priority(&self) -> u8 {
        match self {
            DataType::Foundation => 0,
            DataType::SrLegacy => 1,
            DataType::Survey => 2,
            DataType::Experimental => 3,
            DataType::Branded => 4,
            DataType::Manual | DataType::Other(_) => 5,
        }
    }
}

impl From<String> for DataType {
    fn from(s: String) -> Self {
        DataType::parse(&s)
    }
}

impl From<DataType> for String {
    fn from(dt: DataType) -> Self {
        dt.as_str().to_string()
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A food snapshot. Never mutated once built; re-fetching builds a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Food {
    external_id: i64,
    description: String,
    data_type: DataType,
    brand: Option<String>,
    nutrients: Vec<Nutrient>,
}

impl Food {
    /// Build a food, validating identity fields and nutrient-name uniqueness
    pub fn new(
        external_id: i64,
        description: impl Into<String>,
        data_type: DataType,
        brand: Option<String>,
        nutrients: Vec<Nutrient>,
    ) -> Result<Self, ModelError> {
        let description = description.into().trim().to_string();
        if description.is_empty() {
            return Err(ModelError::EmptyDescription);
        }
        if external_id <= 0 && data_type != DataType::Manual {
            return Err(ModelError::InvalidExternalId {
                external_id,
                data_type: data_type.as_str().to_string(),
            });
        }

        let mut seen = HashSet::new();
        for nutrient in &nutrients {
            if !seen.insert(nutrient.name().to_lowercase()) {
                return Err(ModelError::DuplicateNutrient(nutrient.name().to_string()));
            }
        }

        let brand = brand
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());

        Ok(Self {
            external_id,
            description,
            data_type,
            brand,
            nutrients,
        })
    }

    pub fn external_id(&self) -> i64 {
        self.external_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn brand(&self) -> Option<&str> {
        self.brand.as_deref()
    }

    pub fn nutrients(&self) -> &[Nutrient] {
        &self.nutrients
    }

    /// Find a nutrient by canonical name (case-insensitive)
    pub fn nutrient(&self, name: &str) -> Option<&Nutrient> {
        let name = name.trim();
        self.nutrients
            .iter()
            .find(|n| n.name().eq_ignore_ascii_case(name))
    }

    pub fn amount_of(&self, name: &str) -> Option<Decimal> {
        self.nutrient(name).map(Nutrient::amount)
    }
}
