//! Food MCP Tools
//!
//! Searching FoodData Central, importing normalized snapshots into the food
//! library, and entering foods by hand.

use rmcp::schemars;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::{Database, StoredFood};
use crate::models::record::FoodRecord;
use crate::nutrition::catalog;
use crate::nutrition::{normalize_food, NormalizationReport, RawFood, RawNutrientRecord};
use crate::provider::{FoodSearchHit, FoodSource, SearchRequest, DEFAULT_PAGE_SIZE};

/// Response for search_foods
#[derive(Debug, Serialize)]
pub struct SearchFoodsResponse {
    pub query: String,
    pub hits: Vec<FoodSearchHit>,
    pub count: usize,
}

/// Response for import_food / add_manual_food
#[derive(Debug, Serialize)]
pub struct StoreFoodResponse {
    pub id: i64,
    pub fdc_id: Option<i64>,
    pub description: String,
    pub data_type: String,
    pub nutrient_count: usize,
    pub report: NormalizationReport,
}

/// One nutrient line of a food
#[derive(Debug, Serialize)]
pub struct NutrientLine {
    pub name: String,
    pub unit: String,
    pub amount: String,
    pub category: &'static str,
}

/// Full food detail
#[derive(Debug, Serialize)]
pub struct FoodDetail {
    pub id: i64,
    pub fdc_id: Option<i64>,
    pub description: String,
    pub data_type: String,
    pub brand: Option<String>,
    /// Per 100 g, in catalog order
    pub nutrients: Vec<NutrientLine>,
    pub report: Option<serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
}

/// Food summary for listing
#[derive(Debug, Serialize)]
pub struct FoodSummary {
    pub id: i64,
    pub fdc_id: Option<i64>,
    pub description: String,
    pub data_type: String,
    pub brand: Option<String>,
    pub nutrient_count: usize,
}

/// Response for list_foods
#[derive(Debug, Serialize)]
pub struct ListFoodsResponse {
    pub foods: Vec<FoodSummary>,
    pub count: usize,
    pub limit: i64,
    pub offset: i64,
}

/// One hand-entered nutrient, amount per 100 g as text
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ManualNutrient {
    pub name: String,
    /// Unit such as "g", "mg", "µg", "kcal", "kJ" or "IU"; inferred from the
    /// nutrient name when omitted
    pub unit: Option<String>,
    pub amount: String,
}

/// Data for a hand-entered food
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualFoodCreate {
    pub description: String,
    pub brand: Option<String>,
    pub nutrients: Vec<ManualNutrient>,
}

fn lines(snapshot: &FoodRecord) -> Vec<NutrientLine> {
    snapshot
        .nutrients
        .iter()
        .map(|n| NutrientLine {
            name: n.name.clone(),
            unit: n.unit.clone(),
            amount: n.amount.clone(),
            category: catalog::category_for(&n.name),
        })
        .collect()
}

fn store(db: &Database, raw: &RawFood) -> Result<StoreFoodResponse, String> {
    let normalized = normalize_food(raw).map_err(|e| format!("Invalid food: {}", e))?;
    let stored = db
        .with_conn(|conn| StoredFood::upsert(conn, &normalized.food, Some(&normalized.report)))
        .map_err(|e| format!("Database error: {}", e))?;

    info!(
        id = stored.id,
        description = %stored.description,
        nutrients = normalized.food.nutrients().len(),
        dropped = normalized.report.dropped(),
        "Stored food"
    );

    Ok(StoreFoodResponse {
        id: stored.id,
        fdc_id: stored.fdc_id,
        description: stored.description,
        data_type: stored.data_type,
        nutrient_count: normalized.food.nutrients().len(),
        report: normalized.report,
    })
}

// ============================================================================
// Provider Tools
// ============================================================================

/// Search FoodData Central
pub async fn search_foods(
    source: &dyn FoodSource,
    query: &str,
    page_size: Option<u32>,
    data_types: Vec<String>,
) -> Result<SearchFoodsResponse, String> {
    let mut request = SearchRequest::new(query);
    request.page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 200);
    request.data_types = data_types;

    let hits = source
        .search(&request)
        .await
        .map_err(|e| format!("Search failed: {}", e))?;

    Ok(SearchFoodsResponse {
        query: query.trim().to_string(),
        count: hits.len(),
        hits,
    })
}

/// Fetch one food from FoodData Central, normalize it and store it
pub async fn import_food(db: &Database, source: &dyn FoodSource, fdc_id: i64) -> Result<StoreFoodResponse, String> {
    if fdc_id <= 0 {
        return Err("fdc_id must be positive".to_string());
    }
    let raw = source
        .get_food(fdc_id)
        .await
        .map_err(|e| format!("Failed to fetch food {}: {}", fdc_id, e))?;
    store(db, &raw)
}

// ============================================================================
// Library Tools
// ============================================================================

/// Enter a food by hand; it goes through the same normalization as fetched
/// foods
pub fn add_manual_food(db: &Database, data: ManualFoodCreate) -> Result<StoreFoodResponse, String> {
    let description = data.description.trim();
    if description.is_empty() {
        return Err("Food description cannot be empty".to_string());
    }

    let raw = RawFood {
        external_id: 0,
        description: description.to_string(),
        data_type: "Manual".to_string(),
        brand: data.brand,
        nutrient_records: data
            .nutrients
            .iter()
            .map(|n| RawNutrientRecord::new(n.name.as_str(), n.unit.as_deref(), Some(n.amount.as_str())))
            .collect(),
    };
    store(db, &raw)
}

/// Get a library food by ID
pub fn get_food(db: &Database, id: i64) -> Result<Option<FoodDetail>, String> {
    let stored = db
        .with_conn(|conn| StoredFood::get_by_id(conn, id))
        .map_err(|e| format!("Database error: {}", e))?;

    Ok(stored.map(|food| FoodDetail {
        id: food.id,
        fdc_id: food.fdc_id,
        nutrients: lines(&food.snapshot),
        description: food.description,
        data_type: food.data_type,
        brand: food.brand,
        report: food.report,
        created_at: food.created_at,
        updated_at: food.updated_at,
    }))
}

/// List library foods
pub fn list_foods(db: &Database, query: Option<&str>, limit: i64, offset: i64) -> Result<ListFoodsResponse, String> {
    let limit = limit.clamp(1, 200);
    let offset = offset.max(0);

    let foods = db
        .with_conn(|conn| StoredFood::list(conn, query, limit, offset))
        .map_err(|e| format!("Failed to list foods: {}", e))?;

    let foods: Vec<FoodSummary> = foods
        .into_iter()
        .map(|f| FoodSummary {
            id: f.id,
            fdc_id: f.fdc_id,
            nutrient_count: f.snapshot.nutrients.len(),
            description: f.description,
            data_type: f.data_type,
            brand: f.brand,
        })
        .collect();

    Ok(ListFoodsResponse {
        count: foods.len(),
        foods,
        limit,
        offset,
    })
}

/// Delete a library food. Formulations keep their own copy of the snapshot.
pub fn delete_food(db: &Database, id: i64) -> Result<bool, String> {
    db.with_conn(|conn| StoredFood::delete(conn, id))
        .map_err(|e| format!("Database error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::db::migrations::run_migrations;
    use crate::provider::{ProviderError, ProviderResult};

    struct StubSource;

    #[async_trait]
    impl FoodSource for StubSource {
        async fn search(&self, request: &SearchRequest) -> ProviderResult<Vec<FoodSearchHit>> {
            Ok(vec![FoodSearchHit {
                fdc_id: 1,
                description: request.query.clone(),
                data_type: crate::models::DataType::Foundation,
                brand: None,
            }])
        }

        async fn get_food(&self, fdc_id: i64) -> ProviderResult<RawFood> {
            if fdc_id != 171287 {
                return Err(ProviderError::NotFound(fdc_id));
            }
            Ok(RawFood {
                external_id: fdc_id,
                description: "Egg, whole, raw, fresh".to_string(),
                data_type: "SR Legacy".to_string(),
                brand: None,
                nutrient_records: vec![
                    RawNutrientRecord::new("Protein", Some("g"), Some("12.56")),
                    RawNutrientRecord::new("Total lipid (fat)", Some("g"), Some("9.51")),
                    RawNutrientRecord::new("Energy", Some("kcal"), Some("143")),
                ],
            })
        }
    }

    fn db() -> Database {
        let db = Database::in_memory().unwrap();
        db.with_conn(run_migrations).unwrap();
        db
    }

    #[tokio::test]
    async fn test_import_food_normalizes_and_stores() {
        let db = db();
        let stored = import_food(&db, &StubSource, 171287).await.unwrap();

        assert_eq!(stored.fdc_id, Some(171287));
        assert!(stored.report.derived >= 1);

        let detail = get_food(&db, stored.id).unwrap().unwrap();
        let names: Vec<&str> = detail.nutrients.iter().map(|n| n.name.as_str()).collect();
        assert!(names.contains(&"Protein"));
        assert!(names.contains(&"Energy (kJ)"));
    }

    #[tokio::test]
    async fn test_import_unknown_food() {
        let err = import_food(&db(), &StubSource, 5).await.unwrap_err();
        assert!(err.contains("not found"));
    }

    #[tokio::test]
    async fn test_search_trims_query() {
        let response = search_foods(&StubSource, " egg ", None, vec![]).await.unwrap();
        assert_eq!(response.query, "egg");
        assert_eq!(response.count, 1);
    }

    #[test]
    fn test_manual_food() {
        let db = db();
        let stored = add_manual_food(
            &db,
            ManualFoodCreate {
                description: "House spice mix".to_string(),
                brand: None,
                nutrients: vec![
                    ManualNutrient { name: "Sodium".into(), unit: Some("mg".into()), amount: "3,5".into() },
                    ManualNutrient { name: "Protein".into(), unit: None, amount: "8".into() },
                ],
            },
        )
        .unwrap();

        assert_eq!(stored.fdc_id, None);
        assert_eq!(stored.data_type, "Manual");
        let listed = list_foods(&db, Some("spice"), 10, 0).unwrap();
        assert_eq!(listed.count, 1);
        assert!(delete_food(&db, stored.id).unwrap());
        assert!(get_food(&db, stored.id).unwrap().is_none());
    }

    #[test]
    fn test_manual_food_needs_description() {
        let err = add_manual_food(
            &db(),
            ManualFoodCreate { description: " ".into(), brand: None, nutrients: vec![] },
        )
        .unwrap_err();
        assert!(err.contains("description"));
    }
}
