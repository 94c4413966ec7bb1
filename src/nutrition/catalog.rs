//! Nutrient catalog
//!
//! Static registry of canonical nutrient names: display order, category,
//! expected unit, alias table and total-vs-breakdown families. Built once on
//! first use and read-only afterwards.

use std::collections::HashMap;
use std::sync::LazyLock;

use rust_decimal::Decimal;

use super::units::CanonicalUnit;

/// Bumped whenever alias precedence or breakdown families change
pub const ALIAS_TABLE_VERSION: u32 = 3;

/// Order index reported for names the catalog does not know
pub const UNCATALOGED_ORDER: u32 = u32::MAX;

/// Precedence rank for names without an explicit alias entry
pub const PRIMARY_RANK: u8 = 2;

/// Canonical energy names, one per unit
pub const ENERGY_KCAL: &str = "Energy (kcal)";
pub const ENERGY_KJ: &str = "Energy (kJ)";

pub const WATER: &str = "Water";
pub const NITROGEN: &str = "Nitrogen";
pub const PROTEIN: &str = "Protein";
pub const TOTAL_FAT: &str = "Total fat";
pub const ASH: &str = "Ash";
pub const CARBOHYDRATE: &str = "Carbohydrate, by difference";
pub const FIBER: &str = "Fiber, total dietary";

/// Category used for names outside the catalog
pub const UNCATEGORIZED: &str = "Other";

// ============================================================================
// Categories and Display Order
// ============================================================================

const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Proximates",
        &[
            WATER,
            ENERGY_KCAL,
            ENERGY_KJ,
            NITROGEN,
            PROTEIN,
            TOTAL_FAT,
            ASH,
            CARBOHYDRATE,
        ],
    ),
    (
        "Carbohydrates",
        &[
            FIBER,
            "Fiber, soluble",
            "Fiber, insoluble",
            "Total dietary fiber (AOAC 2011.25)",
            "High Molecular Weight Dietary Fiber (HMWDF)",
            "Low Molecular Weight Dietary Fiber (LMWDF)",
            "Sugars, Total",
            "Sucrose",
            "Glucose",
            "Fructose",
            "Lactose",
            "Maltose",
            "Galactose",
            "Starch",
            "Resistant starch",
            "Sugars, added",
        ],
    ),
    (
        "Minerals",
        &[
            "Calcium, Ca",
            "Iron, Fe",
            "Magnesium, Mg",
            "Phosphorus, P",
            "Potassium, K",
            "Sodium, Na",
            "Zinc, Zn",
            "Copper, Cu",
            "Manganese, Mn",
            "Iodine, I",
            "Selenium, Se",
            "Molybdenum, Mo",
            "Fluoride, F",
        ],
    ),
    (
        "Vitamins and Other Components",
        &[
            "Thiamin",
            "Riboflavin",
            "Niacin",
            "Vitamin B-6",
            "Folate, total",
            "Folate, food",
            "Folic acid",
            "Folate, DFE",
            "Choline, total",
            "Choline, free",
            "Choline, from phosphocholine",
            "Choline, from phosphatidyl choline",
            "Choline, from glycerophosphocholine",
            "Choline, from sphingomyelin",
            "Betaine",
            "Vitamin B-12",
            "Vitamin B-12, added",
            "Vitamin A, RAE",
            "Retinol",
            "Carotene, beta",
            "cis-beta-Carotene",
            "trans-beta-Carotene",
            "Carotene, alpha",
            "Carotene, gamma",
            "Cryptoxanthin, beta",
            "Cryptoxanthin, alpha",
            "Lycopene",
            "cis-Lycopene",
            "trans-Lycopene",
            "Lutein + zeaxanthin",
            "cis-Lutein/Zeaxanthin",
            "Lutein",
            "Zeaxanthin",
            "Phytoene",
            "Phytofluene",
            "Vitamin D (D2 + D3)",
            "Vitamin D2 (ergocalciferol)",
            "Vitamin D3 (cholecalciferol)",
            "25-hydroxycholecalciferol",
            "Vitamin K (phylloquinone)",
            "Vitamin K (Dihydrophylloquinone)",
            "Vitamin K (Menaquinone-4)",
            "Vitamin E (alpha-tocopherol)",
            "Vitamin E, added",
            "Tocopherol, beta",
            "Tocopherol, gamma",
            "Tocopherol, delta",
            "Tocotrienol, alpha",
            "Tocotrienol, beta",
            "Tocotrienol, gamma",
            "Tocotrienol, delta",
            "Vitamin C, total ascorbic acid",
            "Pantothenic acid",
            "Biotin",
            "Caffeine",
            "Theobromine",
        ],
    ),
    (
        "Lipids",
        &[
            "Fatty acids, total saturated",
            "SFA 4:0",
            "SFA 5:0",
            "SFA 6:0",
            "SFA 7:0",
            "SFA 8:0",
            "SFA 9:0",
            "SFA 10:0",
            "SFA 11:0",
            "SFA 12:0",
            "SFA 13:0",
            "SFA 14:0",
            "SFA 15:0",
            "SFA 16:0",
            "SFA 17:0",
            "SFA 18:0",
            "SFA 20:0",
            "SFA 21:0",
            "SFA 22:0",
            "SFA 23:0",
            "SFA 24:0",
            "Fatty acids, total monounsaturated",
            "MUFA 12:1",
            "MUFA 14:1",
            "MUFA 14:1 c",
            "MUFA 15:1",
            "MUFA 16:1",
            "MUFA 16:1 c",
            "MUFA 17:1",
            "MUFA 17:1 c",
            "MUFA 18:1",
            "MUFA 18:1 c",
            "MUFA 20:1",
            "MUFA 20:1 c",
            "MUFA 22:1",
            "MUFA 22:1 c",
            "MUFA 22:1 n-9",
            "MUFA 22:1 n-11",
            "MUFA 24:1 c",
            "Fatty acids, total polyunsaturated",
            "PUFA 18:2",
            "PUFA 18:2 c",
            "PUFA 18:2 n-6 c,c",
            "PUFA 18:2 CLAs",
            "PUFA 18:2 i",
            "PUFA 18:3",
            "PUFA 18:3 c",
            "PUFA 18:3 n-3 c,c,c (ALA)",
            "PUFA 18:3 n-6 c,c,c",
            "PUFA 18:4",
            "PUFA 20:2 c",
            "PUFA 20:2 n-6 c,c",
            "PUFA 20:3",
            "PUFA 20:3 c",
            "PUFA 20:3 n-3",
            "PUFA 20:3 n-6",
            "PUFA 20:3 n-9",
            "PUFA 20:4",
            "PUFA 20:4c",
            "PUFA 20:5c",
            "PUFA 20:5 n-3 (EPA)",
            "PUFA 22:2",
            "PUFA 22:3",
            "PUFA 22:4",
            "PUFA 22:5 c",
            "PUFA 22:5 n-3 (DPA)",
            "PUFA 22:6 c",
            "PUFA 22:6 n-3 (DHA)",
            "Fatty acids, total trans",
            "Fatty acids, total trans-monoenoic",
            "Fatty acids, total trans-dienoic",
            "Fatty acids, total trans-polyenoic",
            "TFA 14:1 t",
            "TFA 16:1 t",
            "TFA 18:1 t",
            "TFA 18:2 t",
            "TFA 18:2 t,t",
            "TFA 18:2 t not further defined",
            "TFA 18:3 t",
            "TFA 20:1 t",
            "TFA 22:1 t",
            "Cholesterol",
        ],
    ),
    (
        "Amino acids",
        &[
            "Tryptophan",
            "Threonine",
            "Isoleucine",
            "Leucine",
            "Lysine",
            "Methionine",
            "Phenylalanine",
            "Tyrosine",
            "Valine",
            "Arginine",
            "Histidine",
            "Alanine",
            "Aspartic acid",
            "Glutamic acid",
            "Glycine",
            "Proline",
            "Serine",
            "Hydroxyproline",
            "Cysteine",
        ],
    ),
    (
        "Phytosterols",
        &[
            "Phytosterols",
            "Beta-sitosterol",
            "Brassicasterol",
            "Campesterol",
            "Campestanol",
            "Delta-5-avenasterol",
            "Phytosterols, other",
            "Stigmasterol",
            "Beta-sitostanol",
        ],
    ),
    (
        "Organic acids",
        &["Citric acid", "Malic acid", "Oxalic acid", "Quinic acid"],
    ),
    ("Oligosaccharides", &["Verbascose", "Raffinose", "Stachyose"]),
    (
        "Isoflavones",
        &["Daidzin", "Genistin", "Glycitin", "Daidzein", "Genistein"],
    ),
    ("Alcohols", &["Alcohol, ethyl"]),
];

// ============================================================================
// Expected Units
// ============================================================================

const UNIT_GROUPS: &[(CanonicalUnit, &[&str])] = &[
    (CanonicalUnit::Kilocalorie, &[ENERGY_KCAL]),
    (CanonicalUnit::Gram, &["Verbascose", "Raffinose", "Stachyose"]),
    (CanonicalUnit::Kilojoule, &[ENERGY_KJ]),
    (
        CanonicalUnit::Milligram,
        &[
            "Calcium, Ca",
            "Iron, Fe",
            "Magnesium, Mg",
            "Phosphorus, P",
            "Potassium, K",
            "Sodium, Na",
            "Zinc, Zn",
            "Copper, Cu",
            "Manganese, Mn",
            "Thiamin",
            "Riboflavin",
            "Niacin",
            "Vitamin B-6",
            "Choline, total",
            "Choline, free",
            "Choline, from phosphocholine",
            "Choline, from phosphatidyl choline",
            "Choline, from glycerophosphocholine",
            "Choline, from sphingomyelin",
            "Betaine",
            "Vitamin E (alpha-tocopherol)",
            "Vitamin E, added",
            "Tocopherol, beta",
            "Tocopherol, gamma",
            "Tocopherol, delta",
            "Tocotrienol, alpha",
            "Tocotrienol, beta",
            "Tocotrienol, gamma",
            "Tocotrienol, delta",
            "Vitamin C, total ascorbic acid",
            "Pantothenic acid",
            "Caffeine",
            "Theobromine",
            "Cholesterol",
            "Phytosterols",
            "Beta-sitosterol",
            "Brassicasterol",
            "Campesterol",
            "Campestanol",
            "Delta-5-avenasterol",
            "Phytosterols, other",
            "Stigmasterol",
            "Beta-sitostanol",
            "Citric acid",
            "Malic acid",
            "Oxalic acid",
            "Quinic acid",
            "Daidzin",
            "Genistin",
            "Glycitin",
            "Daidzein",
            "Genistein",
        ],
    ),
    (
        CanonicalUnit::Microgram,
        &[
            "Iodine, I",
            "Selenium, Se",
            "Molybdenum, Mo",
            "Fluoride, F",
            "Folate, total",
            "Folate, food",
            "Folic acid",
            "Folate, DFE",
            "Vitamin B-12",
            "Vitamin B-12, added",
            "Vitamin A, RAE",
            "Retinol",
            "Carotene, beta",
            "cis-beta-Carotene",
            "trans-beta-Carotene",
            "Carotene, alpha",
            "Carotene, gamma",
            "Cryptoxanthin, beta",
            "Cryptoxanthin, alpha",
            "Lycopene",
            "cis-Lycopene",
            "trans-Lycopene",
            "Lutein + zeaxanthin",
            "cis-Lutein/Zeaxanthin",
            "Lutein",
            "Zeaxanthin",
            "Phytoene",
            "Phytofluene",
            "Vitamin D (D2 + D3)",
            "Vitamin D2 (ergocalciferol)",
            "Vitamin D3 (cholecalciferol)",
            "25-hydroxycholecalciferol",
            "Vitamin K (phylloquinone)",
            "Vitamin K (Dihydrophylloquinone)",
            "Vitamin K (Menaquinone-4)",
            "Biotin",
        ],
    ),
];

const MACRO_HINTS: &[&str] = &[
    "water",
    "protein",
    "lipid",
    "fat",
    "ash",
    "carbohydrate",
    "fiber",
    "sugar",
    "starch",
    "nitrogen",
    "fatty acids",
    "sfa",
    "mufa",
    "pufa",
];

const AMINO_ACIDS: &[&str] = &[
    "alanine",
    "arginine",
    "aspartic acid",
    "cystine",
    "cysteine",
    "hydroxyproline",
    "glutamic acid",
    "glycine",
    "histidine",
    "isoleucine",
    "leucine",
    "lysine",
    "methionine",
    "phenylalanine",
    "proline",
    "serine",
    "threonine",
    "tryptophan",
    "tyrosine",
    "valine",
];

const SIMPLE_SUGARS: &[&str] = &[
    "sucrose",
    "glucose",
    "fructose",
    "lactose",
    "maltose",
    "galactose",
];

// ============================================================================
// Aliases
// ============================================================================

/// One raw spelling and the canonical name it resolves to.
///
/// `rank` decides which record survives when several raw spellings land on
/// the same canonical name: higher wins. IU-denominated representations rank
/// lowest and carry the factor converting one IU into `iu_unit`.
#[derive(Debug, Clone, Copy)]
pub struct AliasEntry {
    pub raw: &'static str,
    pub canonical: &'static str,
    pub rank: u8,
    iu: Option<(CanonicalUnit, i64, u32)>,
}

impl AliasEntry {
    const fn new(raw: &'static str, canonical: &'static str, rank: u8) -> Self {
        Self { raw, canonical, rank, iu: None }
    }

    const fn with_iu(
        raw: &'static str,
        canonical: &'static str,
        rank: u8,
        unit: CanonicalUnit,
        mantissa: i64,
        scale: u32,
    ) -> Self {
        Self { raw, canonical, rank, iu: Some((unit, mantissa, scale)) }
    }

    /// Amount of `unit` per international unit, when the representation
    /// can be converted away from IU
    pub fn iu_factor(&self) -> Option<(CanonicalUnit, Decimal)> {
        self.iu.map(|(unit, mantissa, scale)| (unit, Decimal::new(mantissa, scale)))
    }
}

/// Alias table, keyed by the lowercase raw spelling.
///
/// Precedence within one canonical name, lowest first:
/// - Total fat: Total lipid (fat) < Total fat (NLEA) = Total fat
/// - Carbohydrate, by difference: by summation < by difference
/// - Sugars, Total: Total sugars < Sugars, Total = Sugars, total including NLEA
/// - Vitamin A, RAE: Vitamin A, IU (0.3 μg/IU) < Vitamin A < Vitamin A, RAE
/// - Vitamin D (D2 + D3): IU form (0.025 μg/IU) < Vitamin D < Vitamin D (D2 + D3)
/// - Vitamin E (alpha-tocopherol): label IU (0.67 mg/IU) < Vitamin E < alpha-tocopherol
/// - Cysteine: Cystine and Cysteine are summed, not ranked
const ALIASES: &[AliasEntry] = &[
    AliasEntry::new("total lipid (fat)", TOTAL_FAT, 1),
    AliasEntry::new("total fat (nlea)", TOTAL_FAT, 2),
    AliasEntry::new("total fat", TOTAL_FAT, 2),
    AliasEntry::new("carbohydrate, by summation", CARBOHYDRATE, 1),
    AliasEntry::new("carbohydrate by summation", CARBOHYDRATE, 1),
    AliasEntry::new("carbohydrate, by difference", CARBOHYDRATE, 2),
    AliasEntry::new("total sugars", "Sugars, Total", 1),
    AliasEntry::new("sugars, total", "Sugars, Total", 2),
    AliasEntry::new("sugars, total including nlea", "Sugars, Total", 2),
    AliasEntry::new("sugars, added", "Sugars, added", 2),
    AliasEntry::new("fiber, total dietary", FIBER, 2),
    AliasEntry::new("choline, from phosphotidyl choline", "Choline, from phosphatidyl choline", 2),
    AliasEntry::with_iu("vitamin a, iu", "Vitamin A, RAE", 0, CanonicalUnit::Microgram, 3, 1),
    AliasEntry::with_iu("vitamin a", "Vitamin A, RAE", 1, CanonicalUnit::Microgram, 3, 1),
    AliasEntry::new("vitamin a, rae", "Vitamin A, RAE", 2),
    AliasEntry::with_iu(
        "vitamin d (d2 + d3), international units",
        "Vitamin D (D2 + D3)",
        0,
        CanonicalUnit::Microgram,
        25,
        3,
    ),
    AliasEntry::with_iu("vitamin d", "Vitamin D (D2 + D3)", 1, CanonicalUnit::Microgram, 25, 3),
    AliasEntry::new("vitamin d (d2 + d3)", "Vitamin D (D2 + D3)", 2),
    AliasEntry::with_iu(
        "vitamin e (label entry primarily)",
        "Vitamin E (alpha-tocopherol)",
        0,
        CanonicalUnit::Milligram,
        67,
        2,
    ),
    AliasEntry::with_iu("vitamin e", "Vitamin E (alpha-tocopherol)", 1, CanonicalUnit::Milligram, 67, 2),
    AliasEntry::new("tocopherol, alpha", "Vitamin E (alpha-tocopherol)", 2),
    AliasEntry::new("vitamin e (alpha-tocopherol)", "Vitamin E (alpha-tocopherol)", 2),
    AliasEntry::new("vitamin c", "Vitamin C, total ascorbic acid", 1),
    AliasEntry::new("cystine", "Cysteine", 1),
    AliasEntry::new("cysteine", "Cysteine", 2),
    AliasEntry::new("energy (kcal)", ENERGY_KCAL, 2),
    AliasEntry::new("energy (kj)", ENERGY_KJ, 2),
];

/// Raw names dropped as noise (Atwater-factor energy duplicates)
const DENYLIST: &[&str] = &[
    "energy (atwater general factors)",
    "energy (atwater specific factors)",
];

/// Canonical names whose colliding records are summed instead of ranked
const MERGED_SYNONYMS: &[&str] = &["Cysteine"];

// ============================================================================
// Total-vs-breakdown Families
// ============================================================================

/// Component of a breakdown family; contributes `amount / divisor` to the
/// aggregate (vitamin A activity weights carotenoids).
#[derive(Debug, Clone, Copy)]
pub struct Component {
    pub name: &'static str,
    pub divisor: u32,
}

const fn part(name: &'static str) -> Component {
    Component { name, divisor: 1 }
}

/// An aggregate nutrient and its itemized components
#[derive(Debug, Clone, Copy)]
pub struct BreakdownFamily {
    pub aggregate: &'static str,
    pub components: &'static [Component],
}

/// Families versioned with [`ALIAS_TABLE_VERSION`]. Vitamin E is not listed:
/// its label total and alpha-tocopherol collapse by alias rank, and the other
/// tocopherols are separate nutrients rather than parts of a sum.
pub const BREAKDOWN_FAMILIES: &[BreakdownFamily] = &[
    BreakdownFamily {
        aggregate: "Sugars, Total",
        components: &[
            part("Sucrose"),
            part("Glucose"),
            part("Fructose"),
            part("Lactose"),
            part("Maltose"),
            part("Galactose"),
        ],
    },
    BreakdownFamily {
        aggregate: FIBER,
        components: &[part("Fiber, soluble"), part("Fiber, insoluble")],
    },
    BreakdownFamily {
        aggregate: "Choline, total",
        components: &[
            part("Choline, free"),
            part("Choline, from phosphocholine"),
            part("Choline, from phosphatidyl choline"),
            part("Choline, from glycerophosphocholine"),
            part("Choline, from sphingomyelin"),
        ],
    },
    BreakdownFamily {
        aggregate: "Folate, total",
        components: &[part("Folate, food"), part("Folic acid")],
    },
    BreakdownFamily {
        aggregate: "Vitamin A, RAE",
        components: &[
            part("Retinol"),
            Component { name: "Carotene, beta", divisor: 12 },
            Component { name: "Carotene, alpha", divisor: 24 },
            Component { name: "Cryptoxanthin, beta", divisor: 24 },
        ],
    },
    BreakdownFamily {
        aggregate: "Vitamin D (D2 + D3)",
        components: &[
            part("Vitamin D2 (ergocalciferol)"),
            part("Vitamin D3 (cholecalciferol)"),
        ],
    },
];

// ============================================================================
// Lookup
// ============================================================================

/// One catalog row
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub category: &'static str,
    pub order: u32,
    pub unit: Option<CanonicalUnit>,
}

static ENTRIES: LazyLock<HashMap<String, CatalogEntry>> = LazyLock::new(|| {
    let mut units: HashMap<String, CanonicalUnit> = HashMap::new();
    for (unit, names) in UNIT_GROUPS {
        for name in names.iter() {
            units.insert(name.to_lowercase(), *unit);
        }
    }

    let mut entries = HashMap::new();
    for (idx, (category, names)) in CATEGORIES.iter().enumerate() {
        for (offset, name) in names.iter().enumerate() {
            let key = name.to_lowercase();
            let unit = units.get(&key).copied().or_else(|| heuristic_unit(&key));
            entries.insert(
                key,
                CatalogEntry {
                    name: *name,
                    category: *category,
                    order: (idx as u32) * 1000 + offset as u32,
                    unit,
                },
            );
        }
    }
    entries
});

static ALIAS_INDEX: LazyLock<HashMap<&'static str, AliasEntry>> =
    LazyLock::new(|| ALIASES.iter().map(|a| (a.raw, *a)).collect());

/// Outcome of resolving a raw nutrient name
#[derive(Debug, Clone, PartialEq)]
pub enum AliasResolution {
    /// Resolved to a canonical name with a precedence rank
    Canonical {
        name: String,
        rank: u8,
        iu_factor: Option<(CanonicalUnit, Decimal)>,
    },
    /// Known noise; the record is discarded
    Denylisted,
}

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Look up a catalog row by canonical name (case-insensitive)
pub fn entry(name: &str) -> Option<&'static CatalogEntry> {
    ENTRIES.get(&key(name))
}

/// Catalog spelling for a name, if cataloged
pub fn canonical_spelling(name: &str) -> Option<&'static str> {
    entry(name).map(|e| e.name)
}

/// Display order: `category_index * 1000 + offset`
pub fn order_index(name: &str) -> u32 {
    entry(name).map(|e| e.order).unwrap_or(UNCATALOGED_ORDER)
}

pub fn category_for(name: &str) -> &'static str {
    entry(name).map(|e| e.category).unwrap_or(UNCATEGORIZED)
}

/// Expected unit for a canonical name.
///
/// Cataloged names use their registered unit; other names fall back to
/// naming heuristics (macronutrient hints, amino acids, simple sugars).
pub fn infer_unit(name: &str) -> Option<CanonicalUnit> {
    match entry(name) {
        Some(e) => e.unit,
        None => heuristic_unit(&key(name)),
    }
}

fn heuristic_unit(lower: &str) -> Option<CanonicalUnit> {
    if lower.contains("energy") && lower.contains("kcal") {
        return Some(CanonicalUnit::Kilocalorie);
    }
    if lower.contains("energy") && lower.contains("kj") {
        return Some(CanonicalUnit::Kilojoule);
    }
    if MACRO_HINTS.iter().any(|hint| lower.contains(hint)) || lower.contains(':') {
        return Some(CanonicalUnit::Gram);
    }
    if AMINO_ACIDS.contains(&lower) || SIMPLE_SUGARS.contains(&lower) || lower == "alcohol, ethyl" {
        return Some(CanonicalUnit::Gram);
    }
    None
}

/// Whether a canonical name sums its colliding records
pub fn is_merged_synonym(name: &str) -> bool {
    MERGED_SYNONYMS.iter().any(|m| m.eq_ignore_ascii_case(name.trim()))
}

/// Resolve a raw upstream name to its canonical name.
///
/// `unit` disambiguates the bare "Energy" row into kcal and kJ entries; a
/// bare energy row without a unit is taken as kcal.
pub fn resolve_alias(raw: &str, unit: Option<CanonicalUnit>) -> AliasResolution {
    let lower = key(raw);

    if DENYLIST.contains(&lower.as_str()) {
        return AliasResolution::Denylisted;
    }

    if lower == "energy" {
        let name = match unit {
            Some(CanonicalUnit::Kilojoule) => ENERGY_KJ,
            _ => ENERGY_KCAL,
        };
        return AliasResolution::Canonical {
            name: name.to_string(),
            rank: PRIMARY_RANK,
            iu_factor: None,
        };
    }

    if let Some(alias) = ALIAS_INDEX.get(lower.as_str()) {
        return AliasResolution::Canonical {
            name: alias.canonical.to_string(),
            rank: alias.rank,
            iu_factor: alias.iu_factor(),
        };
    }

    let name = canonical_spelling(&lower)
        .map(str::to_string)
        .unwrap_or_else(|| raw.trim().to_string());
    AliasResolution::Canonical {
        name,
        rank: PRIMARY_RANK,
        iu_factor: None,
    }
}

/// Category names in display order
pub fn categories() -> impl Iterator<Item = &'static str> {
    CATEGORIES.iter().map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_index_layout() {
        assert_eq!(order_index("Water"), 0);
        assert_eq!(order_index("Protein"), 4);
        assert_eq!(order_index("Fiber, total dietary"), 1000);
        assert_eq!(order_index("calcium, ca"), 2000);
        assert_eq!(order_index("Unobtainium"), UNCATALOGED_ORDER);
        assert!(order_index(ENERGY_KCAL) < order_index(ENERGY_KJ));
    }

    #[test]
    fn test_infer_unit_from_catalog() {
        assert_eq!(infer_unit("Iron, Fe"), Some(CanonicalUnit::Milligram));
        assert_eq!(infer_unit("Selenium, Se"), Some(CanonicalUnit::Microgram));
        assert_eq!(infer_unit("Vitamin A, RAE"), Some(CanonicalUnit::Microgram));
        assert_eq!(infer_unit(ENERGY_KCAL), Some(CanonicalUnit::Kilocalorie));
        assert_eq!(infer_unit(ENERGY_KJ), Some(CanonicalUnit::Kilojoule));
        assert_eq!(infer_unit("Total fat"), Some(CanonicalUnit::Gram));
        assert_eq!(infer_unit("Leucine"), Some(CanonicalUnit::Gram));
        assert_eq!(infer_unit("SFA 16:0"), Some(CanonicalUnit::Gram));
    }

    #[test]
    fn test_infer_unit_heuristics() {
        assert_eq!(infer_unit("Fatty acids, total omega-3"), Some(CanonicalUnit::Gram));
        assert_eq!(infer_unit("Cystine"), Some(CanonicalUnit::Gram));
        assert_eq!(infer_unit("Unobtainium"), None);
    }

    #[test]
    fn test_fat_alias_precedence() {
        let lipid = resolve_alias("Total lipid (fat)", Some(CanonicalUnit::Gram));
        let nlea = resolve_alias("Total fat (NLEA)", Some(CanonicalUnit::Gram));
        match (lipid, nlea) {
            (
                AliasResolution::Canonical { name: a, rank: ra, .. },
                AliasResolution::Canonical { name: b, rank: rb, .. },
            ) => {
                assert_eq!(a, "Total fat");
                assert_eq!(b, "Total fat");
                assert!(rb > ra);
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn test_energy_disambiguation() {
        let kj = resolve_alias("Energy", Some(CanonicalUnit::Kilojoule));
        let kcal = resolve_alias("Energy", None);
        assert!(matches!(kj, AliasResolution::Canonical { ref name, .. } if name == ENERGY_KJ));
        assert!(matches!(kcal, AliasResolution::Canonical { ref name, .. } if name == ENERGY_KCAL));
        assert_eq!(
            resolve_alias("Energy (Atwater General Factors)", Some(CanonicalUnit::Kilocalorie)),
            AliasResolution::Denylisted
        );
    }

    #[test]
    fn test_passthrough_and_catalog_spelling() {
        let resolved = resolve_alias("  IRON, FE ", Some(CanonicalUnit::Milligram));
        assert!(matches!(resolved, AliasResolution::Canonical { ref name, .. } if name == "Iron, Fe"));

        let passthrough = resolve_alias(" Ergothioneine ", None);
        assert!(matches!(
            passthrough,
            AliasResolution::Canonical { ref name, rank: PRIMARY_RANK, .. } if name == "Ergothioneine"
        ));
    }

    #[test]
    fn test_iu_factor() {
        match resolve_alias("Vitamin D (D2 + D3), International Units", None) {
            AliasResolution::Canonical { iu_factor: Some((unit, factor)), rank, .. } => {
                assert_eq!(unit, CanonicalUnit::Microgram);
                assert_eq!(factor, Decimal::new(25, 3));
                assert_eq!(rank, 0);
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn test_family_members_are_cataloged() {
        for family in BREAKDOWN_FAMILIES {
            assert!(entry(family.aggregate).is_some(), "{}", family.aggregate);
            for component in family.components {
                assert!(entry(component.name).is_some(), "{}", component.name);
                assert!(component.divisor > 0);
            }
        }
        for alias in ALIASES {
            assert!(entry(alias.canonical).is_some(), "{}", alias.canonical);
        }
    }

    #[test]
    fn test_merged_synonyms() {
        assert!(is_merged_synonym("cysteine"));
        assert!(!is_merged_synonym("Total fat"));
        assert_eq!(categories().next(), Some("Proximates"));
    }
}
