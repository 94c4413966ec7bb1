//! FoodData Central payload parsing
//!
//! Accepts both response shapes the API returns:
//! - abridged / search: `{"nutrientName"|"name", "unitName", "value"|"amount"}`
//! - full: `{"nutrient": {"name", "unitName"}, "amount"}`

use serde_json::Value;

use super::FoodSearchHit;
use crate::models::DataType;
use crate::nutrition::{RawFood, RawNutrientRecord};

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_text(entry: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| text(entry.get(*k)))
}

fn fdc_id(food: &Value) -> Option<i64> {
    match food.get("fdcId")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn brand(food: &Value) -> Option<String> {
    first_text(food, &["brandOwner", "brandName"])
}

/// One nutrient row, or `None` for rows that carry no value (category headers)
fn nutrient_row(entry: &Value) -> Option<RawNutrientRecord> {
    let nested = entry.get("nutrient");
    let name = nested
        .and_then(|n| first_text(n, &["name"]))
        .or_else(|| first_text(entry, &["nutrientName", "name"]))?;
    let unit = nested
        .and_then(|n| first_text(n, &["unitName"]))
        .or_else(|| first_text(entry, &["unitName"]));

    // header rows ("Proximates", "Minerals") have no amount key at all
    let amount_value = entry.get("amount").or_else(|| entry.get("value"))?;
    if amount_value.is_null() {
        return None;
    }

    Some(RawNutrientRecord {
        raw_name: name,
        raw_unit: unit,
        raw_amount: text(Some(amount_value)),
    })
}

/// Convert a food detail payload into the normalizer's input shape
pub fn parse_food(food: &Value) -> Option<RawFood> {
    let external_id = fdc_id(food)?;
    let nutrient_records = food
        .get("foodNutrients")
        .and_then(Value::as_array)
        .map(|rows| rows.iter().filter_map(nutrient_row).collect())
        .unwrap_or_default();

    Some(RawFood {
        external_id,
        description: first_text(food, &["description"]).unwrap_or_default(),
        data_type: first_text(food, &["dataType"]).unwrap_or_default(),
        brand: brand(food),
        nutrient_records,
    })
}

/// Hits from a `/foods/search` response, best data types first
pub fn parse_search(response: &Value) -> Vec<FoodSearchHit> {
    let mut hits: Vec<FoodSearchHit> = response
        .get("foods")
        .and_then(Value::as_array)
        .map(|foods| {
            foods
                .iter()
                .filter_map(|food| {
                    Some(FoodSearchHit {
                        fdc_id: fdc_id(food)?,
                        description: first_text(food, &["description"]).unwrap_or_default(),
                        data_type: DataType::parse(&first_text(food, &["dataType"]).unwrap_or_default()),
                        brand: brand(food),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    // stable: API relevance order is kept within one data type
    hits.sort_by_key(|hit| hit.data_type.priority());
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_abridged_food() {
        let payload = json!({
            "fdcId": 171287,
            "description": "Egg, whole, raw, fresh",
            "dataType": "SR Legacy",
            "foodNutrients": [
                {"number": "203", "name": "Protein", "amount": 12.56, "unitName": "G"},
                {"nutrientName": "Energy", "value": 143, "unitName": "KCAL"}
            ]
        });

        let raw = parse_food(&payload).unwrap();
        assert_eq!(raw.external_id, 171287);
        assert_eq!(raw.data_type, "SR Legacy");
        assert_eq!(raw.nutrient_records.len(), 2);
        assert_eq!(raw.nutrient_records[0].raw_amount.as_deref(), Some("12.56"));
        assert_eq!(raw.nutrient_records[1].raw_name, "Energy");
        assert_eq!(raw.nutrient_records[1].raw_unit.as_deref(), Some("KCAL"));
    }

    #[test]
    fn test_parse_full_food_skips_headers() {
        let payload = json!({
            "fdcId": "2262074",
            "description": "Bar",
            "dataType": "Branded",
            "brandOwner": "Acme Foods",
            "foodNutrients": [
                {"nutrient": {"name": "Proximates", "unitName": "g"}},
                {"nutrient": {"name": "Total lipid (fat)", "unitName": "g"}, "amount": "21.4"},
                {"nutrient": {"name": "Fiber, total dietary", "unitName": "g"}, "amount": null}
            ]
        });

        let raw = parse_food(&payload).unwrap();
        assert_eq!(raw.external_id, 2262074);
        assert_eq!(raw.brand.as_deref(), Some("Acme Foods"));
        assert_eq!(raw.nutrient_records.len(), 1);
        assert_eq!(raw.nutrient_records[0].raw_amount.as_deref(), Some("21.4"));
    }

    #[test]
    fn test_parse_food_requires_id() {
        assert!(parse_food(&json!({"description": "No id"})).is_none());
    }

    #[test]
    fn test_search_sorted_by_data_type() {
        let response = json!({
            "foods": [
                {"fdcId": 3, "description": "Cheddar, Brand", "dataType": "Branded", "brandOwner": "Dairy Co"},
                {"fdcId": 1, "description": "Cheese, cheddar", "dataType": "SR Legacy"},
                {"fdcId": 2, "description": "Cheddar", "dataType": "Foundation"},
                {"description": "missing id"}
            ]
        });

        let hits = parse_search(&response);
        let ids: Vec<i64> = hits.iter().map(|h| h.fdc_id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
        assert_eq!(hits[2].brand.as_deref(), Some("Dairy Co"));
    }
}
