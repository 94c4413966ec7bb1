//! Formulation MCP Tools
//!
//! Every edit loads the stored document, applies one formulation operation
//! and saves the result inside a single transaction, so a failed operation
//! leaves the stored formulation untouched.

use std::sync::Arc;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::db::{Database, FormulationSummary, StoredFood, StoredFormulation};
use crate::formulation::{self, FormulationError};
use crate::models::record::{from_json, to_json};
use crate::models::{Formulation, IngredientCost, IngredientRow, QuantityMode};
use crate::nutrition::catalog;
use crate::nutrition::units::mass_to_grams;
use crate::nutrition::{
    calculate_cost, calculate_energy, calculate_per_ingredient, calculate_totals_with_units, nutrient_value,
    calculate_totals, parse_mass_unit, parse_user_number, CostSummary, Energy, MassUnit,
};

/// A formulation as shown to the client
#[derive(Debug, Serialize)]
pub struct FormulationView {
    pub id: i64,
    pub name: String,
    pub quantity_mode: &'static str,
    pub total_weight_g: Decimal,
    pub locked_weight_g: Decimal,
    pub ingredients: Vec<IngredientRow>,
    pub updated_at: String,
}

/// Response for list_formulations
#[derive(Debug, Serialize)]
pub struct ListFormulationsResponse {
    pub formulations: Vec<FormulationSummary>,
    pub count: usize,
    pub limit: i64,
    pub offset: i64,
}

/// Response for edits that return a value alongside the new state
#[derive(Debug, Serialize)]
pub struct EditResponse<T: Serialize> {
    pub result: T,
    pub formulation: FormulationView,
}

/// One line of the totals table
#[derive(Debug, Serialize)]
pub struct TotalLine {
    pub name: String,
    pub unit: &'static str,
    pub amount: Decimal,
    pub category: &'static str,
}

#[derive(Debug, Serialize)]
pub struct IngredientNutrients {
    pub index: usize,
    pub description: String,
    pub amount_g: Decimal,
    /// Absolute amounts contributed by this ingredient
    pub nutrients: IndexMap<String, Decimal>,
}

/// Response for get_nutrition
#[derive(Debug, Serialize)]
pub struct NutritionResponse {
    pub id: i64,
    pub name: String,
    pub total_weight_g: Decimal,
    /// Totals are per 100 g of the batch
    pub energy: Energy,
    pub nutrients: Vec<TotalLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_ingredient: Option<Vec<IngredientNutrients>>,
}

#[derive(Debug, Serialize)]
pub struct CostLine {
    pub index: usize,
    pub description: String,
    pub amount_g: Decimal,
    pub cost_per_g: Option<Decimal>,
    pub cost: Option<Decimal>,
}

/// Response for get_cost
#[derive(Debug, Serialize)]
pub struct CostResponse {
    pub id: i64,
    pub name: String,
    pub total_weight_g: Decimal,
    pub summary: CostSummary,
    pub lines: Vec<CostLine>,
}

// ============================================================================
// Helpers
// ============================================================================

/// Parse a user amount in the given mass unit (grams by default) to grams
fn grams(amount: &str, unit: Option<&str>) -> Result<Decimal, String> {
    let value = parse_user_number(amount).ok_or_else(|| format!("Invalid amount: {:?}", amount))?;
    let unit = match unit.map(str::trim).filter(|u| !u.is_empty()) {
        None => MassUnit::G,
        Some(u) => parse_mass_unit(u).ok_or_else(|| format!("Unknown mass unit: {:?} (use g, kg, mg, lb or oz)", u))?,
    };
    mass_to_grams(value, unit).ok_or_else(|| format!("Amount out of range: {:?}", amount))
}

fn op_error(e: FormulationError) -> String {
    e.to_string()
}

fn view(stored: &StoredFormulation, formulation: &Formulation) -> FormulationView {
    FormulationView {
        id: stored.id,
        name: formulation.name().to_string(),
        quantity_mode: formulation.quantity_mode().as_str(),
        total_weight_g: formulation.total_weight(),
        locked_weight_g: formulation.locked_weight(),
        ingredients: formulation.ui_items(),
        updated_at: stored.updated_at.clone(),
    }
}

fn load(db: &Database, id: i64) -> Result<(StoredFormulation, Formulation), String> {
    let stored = db
        .with_conn(|conn| StoredFormulation::get_by_id(conn, id))
        .map_err(|e| format!("Database error: {}", e))?
        .ok_or_else(|| format!("Formulation not found with id: {}", id))?;
    let formulation = stored
        .load()
        .map_err(|e| format!("Failed to load formulation: {}", e))?;
    Ok((stored, formulation))
}

/// Load, apply `op`, save; all in one transaction
fn mutate<T, F>(db: &Database, id: i64, op: F) -> Result<EditResponse<T>, String>
where
    T: Serialize,
    F: FnOnce(&mut Formulation) -> Result<T, String>,
{
    let outcome = db
        .with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(stored) = StoredFormulation::get_by_id(&tx, id)? else {
                return Ok(Err(format!("Formulation not found with id: {}", id)));
            };
            let mut formulation = stored.load()?;

            let result = match op(&mut formulation) {
                Ok(result) => result,
                Err(e) => return Ok(Err(e)),
            };

            let saved = StoredFormulation::save(&tx, id, &formulation)?;
            tx.commit()?;
            Ok(Ok(EditResponse {
                result,
                formulation: view(&saved, &formulation),
            }))
        })
        .map_err(|e| format!("Database error: {}", e))?;
    outcome
}

// ============================================================================
// Formulation Tools
// ============================================================================

/// Create an empty formulation
pub fn create_formulation(db: &Database, name: &str, quantity_mode: Option<&str>) -> Result<FormulationView, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Formulation name cannot be empty".to_string());
    }
    let mode = match quantity_mode {
        None => QuantityMode::default(),
        Some(m) => QuantityMode::from_str(m).ok_or_else(|| format!("Invalid quantity mode: {:?} (use grams or percent)", m))?,
    };

    let formulation = Formulation::with_mode(name, mode);
    let stored = db
        .with_conn(|conn| StoredFormulation::create(conn, &formulation))
        .map_err(|e| format!("Failed to create formulation: {}", e))?;

    info!(id = stored.id, name = %stored.name, "Created formulation");
    Ok(view(&stored, &formulation))
}

pub fn get_formulation(db: &Database, id: i64) -> Result<FormulationView, String> {
    let (stored, formulation) = load(db, id)?;
    Ok(view(&stored, &formulation))
}

pub fn list_formulations(
    db: &Database,
    query: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<ListFormulationsResponse, String> {
    let limit = limit.clamp(1, 200);
    let offset = offset.max(0);
    let formulations = db
        .with_conn(|conn| StoredFormulation::list(conn, query, limit, offset))
        .map_err(|e| format!("Failed to list formulations: {}", e))?;

    Ok(ListFormulationsResponse {
        count: formulations.len(),
        formulations,
        limit,
        offset,
    })
}

pub fn delete_formulation(db: &Database, id: i64) -> Result<bool, String> {
    db.with_conn(|conn| StoredFormulation::delete(conn, id))
        .map_err(|e| format!("Database error: {}", e))
}

pub fn rename_formulation(db: &Database, id: i64, name: &str) -> Result<FormulationView, String> {
    mutate(db, id, |f| formulation::rename(f, name).map_err(op_error)).map(|r| r.formulation)
}

pub fn set_quantity_mode(db: &Database, id: i64, mode: &str) -> Result<FormulationView, String> {
    let mode = QuantityMode::from_str(mode).ok_or_else(|| format!("Invalid quantity mode: {:?} (use grams or percent)", mode))?;
    mutate(db, id, |f| {
        formulation::set_quantity_mode(f, mode);
        Ok(())
    })
    .map(|r| r.formulation)
}

// ============================================================================
// Ingredient Tools
// ============================================================================

/// Add a library food as a new ingredient; returns its index
pub fn add_ingredient(
    db: &Database,
    id: i64,
    food_id: i64,
    amount: &str,
    unit: Option<&str>,
) -> Result<EditResponse<usize>, String> {
    let amount_g = grams(amount, unit)?;
    let food = db
        .with_conn(|conn| StoredFood::get_by_id(conn, food_id))
        .map_err(|e| format!("Database error: {}", e))?
        .ok_or_else(|| format!("Food not found with id: {}", food_id))?
        .to_food()
        .map_err(|e| format!("Stored food is invalid: {}", e))?;

    mutate(db, id, move |f| {
        // ingredients of the same food share one snapshot
        let food = f
            .ingredients()
            .iter()
            .find(|ing| **ing.food() == food)
            .map(|ing| Arc::clone(ing.food()))
            .unwrap_or_else(|| Arc::new(food));
        formulation::add_ingredient(f, food, amount_g).map_err(op_error)
    })
}

pub fn remove_ingredient(db: &Database, id: i64, index: usize) -> Result<FormulationView, String> {
    mutate(db, id, |f| formulation::remove_ingredient(f, index).map(|_| ()).map_err(op_error)).map(|r| r.formulation)
}

pub fn set_ingredient_amount(
    db: &Database,
    id: i64,
    index: usize,
    amount: &str,
    unit: Option<&str>,
) -> Result<FormulationView, String> {
    let amount_g = grams(amount, unit)?;
    mutate(db, id, |f| formulation::set_ingredient_amount(f, index, amount_g).map_err(op_error)).map(|r| r.formulation)
}

/// Returns the new lock state
pub fn toggle_lock(db: &Database, id: i64, index: usize) -> Result<EditResponse<bool>, String> {
    mutate(db, id, |f| formulation::toggle_lock(f, index).map_err(op_error))
}

/// Attach a pack price to an ingredient; all three fields absent clears it
pub fn set_ingredient_cost(
    db: &Database,
    id: i64,
    index: usize,
    pack_amount: Option<&str>,
    pack_unit: Option<&str>,
    pack_price: Option<&str>,
) -> Result<FormulationView, String> {
    let cost = match (pack_amount, pack_price) {
        (None, None) => None,
        (Some(amount), Some(price)) => {
            let amount = parse_user_number(amount).ok_or_else(|| format!("Invalid pack amount: {:?}", amount))?;
            let price = parse_user_number(price).ok_or_else(|| format!("Invalid pack price: {:?}", price))?;
            let unit = match pack_unit {
                None => MassUnit::G,
                Some(u) => parse_mass_unit(u).ok_or_else(|| format!("Unknown mass unit: {:?}", u))?,
            };
            Some(IngredientCost::new(amount, unit, price).map_err(|e| e.to_string())?)
        }
        _ => return Err("pack_amount and pack_price must be given together".to_string()),
    };

    mutate(db, id, |f| formulation::set_ingredient_cost(f, index, cost).map_err(op_error)).map(|r| r.formulation)
}

// ============================================================================
// Batch Weight Tools
// ============================================================================

pub fn adjust_to_target_weight(
    db: &Database,
    id: i64,
    target: &str,
    unit: Option<&str>,
) -> Result<FormulationView, String> {
    let target_g = grams(target, unit)?;
    mutate(db, id, |f| formulation::adjust_to_target_weight(f, target_g).map_err(op_error)).map(|r| r.formulation)
}

pub fn normalize_to_100g(db: &Database, id: i64) -> Result<FormulationView, String> {
    mutate(db, id, |f| formulation::normalize_to_100g(f).map_err(op_error)).map(|r| r.formulation)
}

// ============================================================================
// Calculation Tools
// ============================================================================

/// Totals per 100 g of the batch, in catalog order
pub fn get_nutrition(db: &Database, id: i64, per_ingredient: bool) -> Result<NutritionResponse, String> {
    let (stored, formulation) = load(db, id)?;

    let nutrients = calculate_totals_with_units(&formulation)
        .into_iter()
        .map(|n| TotalLine {
            category: catalog::category_for(n.name()),
            unit: n.unit().as_str(),
            amount: n.amount(),
            name: n.name().to_string(),
        })
        .collect();

    let per_ingredient = per_ingredient.then(|| {
        calculate_per_ingredient(&formulation)
            .into_iter()
            .filter_map(|(index, nutrients)| {
                formulation.ingredient(index).map(|ing| IngredientNutrients {
                    index,
                    description: ing.food().description().to_string(),
                    amount_g: ing.amount_g(),
                    nutrients,
                })
            })
            .collect()
    });

    Ok(NutritionResponse {
        id: stored.id,
        name: formulation.name().to_string(),
        total_weight_g: formulation.total_weight(),
        energy: calculate_energy(&formulation),
        nutrients,
        per_ingredient,
    })
}

/// One nutrient's total per 100 g; `None` when no ingredient carries it
pub fn get_nutrient(db: &Database, id: i64, name: &str) -> Result<Option<Decimal>, String> {
    let (_, formulation) = load(db, id)?;
    Ok(nutrient_value(&calculate_totals(&formulation), name))
}

pub fn get_cost(db: &Database, id: i64) -> Result<CostResponse, String> {
    let (stored, formulation) = load(db, id)?;

    let lines = formulation
        .ingredients()
        .iter()
        .enumerate()
        .map(|(index, ing)| {
            let cost_per_g = ing.cost().map(IngredientCost::cost_per_gram);
            CostLine {
                index,
                description: ing.food().description().to_string(),
                amount_g: ing.amount_g(),
                cost_per_g,
                cost: cost_per_g.and_then(|c| c.checked_mul(ing.amount_g())).map(|c| c.round_dp(6)),
            }
        })
        .collect();

    Ok(CostResponse {
        id: stored.id,
        name: formulation.name().to_string(),
        total_weight_g: formulation.total_weight(),
        summary: calculate_cost(&formulation),
        lines,
    })
}

// ============================================================================
// Import / Export Tools
// ============================================================================

/// Serialized document, suitable for `import_formulation`
pub fn export_formulation(db: &Database, id: i64) -> Result<String, String> {
    let (_, formulation) = load(db, id)?;
    to_json(&formulation).map_err(|e| format!("Failed to export formulation: {}", e))
}

/// Store a serialized document as a new formulation, optionally renamed
pub fn import_formulation(db: &Database, document: &str, name: Option<&str>) -> Result<FormulationView, String> {
    let mut imported = from_json(document).map_err(|e| format!("Invalid formulation document: {}", e))?;
    if let Some(name) = name {
        formulation::rename(&mut imported, name).map_err(op_error)?;
    }
    if imported.name().is_empty() {
        return Err("Formulation name cannot be empty".to_string());
    }

    let stored = db
        .with_conn(|conn| StoredFormulation::create(conn, &imported))
        .map_err(|e| format!("Failed to import formulation: {}", e))?;

    info!(id = stored.id, name = %stored.name, ingredients = imported.len(), "Imported formulation");
    Ok(view(&stored, &imported))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::{DataType, Food, Nutrient};
    use crate::nutrition::CanonicalUnit;

    struct Fixture {
        db: Database,
        oats: i64,
        honey: i64,
    }

    fn food(conn: &rusqlite::Connection, fdc_id: i64, name: &str, nutrients: Vec<Nutrient>) -> i64 {
        let food = Food::new(fdc_id, name, DataType::Foundation, None, nutrients).unwrap();
        StoredFood::upsert(conn, &food, None).unwrap().id
    }

    fn fixture() -> Fixture {
        let db = Database::in_memory().unwrap();
        db.with_conn(run_migrations).unwrap();
        let (oats, honey) = db
            .with_conn(|conn| {
                let oats = food(
                    conn,
                    1,
                    "Oats",
                    vec![
                        Nutrient::new("Protein", CanonicalUnit::Gram, Decimal::from(13)).unwrap(),
                        Nutrient::new("Energy (kcal)", CanonicalUnit::Kilocalorie, Decimal::from(379)).unwrap(),
                    ],
                );
                let honey = food(
                    conn,
                    2,
                    "Honey",
                    vec![Nutrient::new("Energy (kcal)", CanonicalUnit::Kilocalorie, Decimal::from(304)).unwrap()],
                );
                Ok((oats, honey))
            })
            .unwrap();
        Fixture { db, oats, honey }
    }

    fn granola(fx: &Fixture) -> i64 {
        let id = create_formulation(&fx.db, "Granola", None).unwrap().id;
        add_ingredient(&fx.db, id, fx.oats, "80", None).unwrap();
        add_ingredient(&fx.db, id, fx.honey, "20", Some("g")).unwrap();
        id
    }

    #[test]
    fn test_create_and_add() {
        let fx = fixture();
        let id = granola(&fx);

        let view = get_formulation(&fx.db, id).unwrap();
        assert_eq!(view.total_weight_g, Decimal::from(100));
        assert_eq!(view.ingredients.len(), 2);
        assert_eq!(view.ingredients[0].percentage, Decimal::from(80));
    }

    #[test]
    fn test_add_with_mass_unit() {
        let fx = fixture();
        let id = create_formulation(&fx.db, "Bulk", Some("grams")).unwrap().id;
        let response = add_ingredient(&fx.db, id, fx.oats, "1,5", Some("kg")).unwrap();

        assert_eq!(response.result, 0);
        assert_eq!(response.formulation.total_weight_g, Decimal::from(1500));
        assert!(add_ingredient(&fx.db, id, fx.oats, "1", Some("cup")).is_err());
        assert!(add_ingredient(&fx.db, id, 999, "1", None).unwrap_err().contains("not found"));
    }

    #[test]
    fn test_failed_edit_leaves_document_untouched() {
        let fx = fixture();
        let id = granola(&fx);
        assert!(toggle_lock(&fx.db, id, 0).unwrap().result);

        let err = set_ingredient_amount(&fx.db, id, 0, "10", None).unwrap_err();
        assert!(err.contains("locked"));
        let err = toggle_lock(&fx.db, id, 1).unwrap_err();
        assert!(err.contains("unlocked"));

        let view = get_formulation(&fx.db, id).unwrap();
        assert_eq!(view.ingredients[0].amount_g, Decimal::from(80));
        assert!(view.ingredients[0].locked);
        assert!(!view.ingredients[1].locked);
    }

    #[test]
    fn test_percent_mode_and_target_weight() {
        let fx = fixture();
        let id = granola(&fx);
        set_quantity_mode(&fx.db, id, "%").unwrap();

        let view = set_ingredient_amount(&fx.db, id, 1, "30", None).unwrap();
        assert_eq!(view.total_weight_g, Decimal::from(100));
        assert_eq!(view.ingredients[0].amount_g, Decimal::from(70));

        let view = adjust_to_target_weight(&fx.db, id, "1", Some("kg")).unwrap();
        assert_eq!(view.total_weight_g, Decimal::from(1000));
        assert_eq!(view.ingredients[1].percentage, Decimal::from(30));

        let view = normalize_to_100g(&fx.db, id).unwrap();
        assert_eq!(view.total_weight_g, Decimal::from(100));
    }

    #[test]
    fn test_nutrition_totals() {
        let fx = fixture();
        let id = granola(&fx);

        let nutrition = get_nutrition(&fx.db, id, true).unwrap();
        let protein = nutrition.nutrients.iter().find(|n| n.name == "Protein").unwrap();
        assert_eq!(protein.amount, Decimal::new(104, 1));
        assert_eq!(protein.unit, "g");
        // 0.8 * 379 + 0.2 * 304
        assert_eq!(nutrition.energy.kcal, Decimal::new(3640, 1));
        assert_eq!(nutrition.per_ingredient.map(|p| p.len()), Some(2));

        assert_eq!(get_nutrient(&fx.db, id, "protein").unwrap(), Some(Decimal::new(104, 1)));
        assert_eq!(get_nutrient(&fx.db, id, "Sodium").unwrap(), None);
    }

    #[test]
    fn test_cost() {
        let fx = fixture();
        let id = granola(&fx);
        set_ingredient_cost(&fx.db, id, 0, Some("1"), Some("kg"), Some("4")).unwrap();

        let cost = get_cost(&fx.db, id).unwrap();
        assert_eq!(cost.summary.priced, 1);
        assert_eq!(cost.summary.unpriced, 1);
        assert_eq!(cost.lines[0].cost, Some(Decimal::new(32, 2)));
        assert!(set_ingredient_cost(&fx.db, id, 0, Some("1"), None, None).is_err());

        set_ingredient_cost(&fx.db, id, 0, None, None, None).unwrap();
        assert_eq!(get_cost(&fx.db, id).unwrap().summary.priced, 0);
    }

    #[test]
    fn test_export_import_and_rename() {
        let fx = fixture();
        let id = granola(&fx);
        let document = export_formulation(&fx.db, id).unwrap();

        let err = import_formulation(&fx.db, &document, None).unwrap_err();
        assert!(err.contains("already exists"));

        let copy = import_formulation(&fx.db, &document, Some("Granola II")).unwrap();
        assert_ne!(copy.id, id);
        assert_eq!(copy.total_weight_g, Decimal::from(100));

        assert!(rename_formulation(&fx.db, copy.id, "Granola").is_err());
        assert_eq!(rename_formulation(&fx.db, copy.id, " Muesli ").unwrap().name, "Muesli");
        assert_eq!(list_formulations(&fx.db, None, 50, 0).unwrap().count, 2);
    }

    #[test]
    fn test_remove_and_delete() {
        let fx = fixture();
        let id = granola(&fx);

        let view = remove_ingredient(&fx.db, id, 0).unwrap();
        assert_eq!(view.ingredients.len(), 1);
        assert_eq!(view.ingredients[0].description, "Honey");
        assert!(remove_ingredient(&fx.db, id, 5).is_err());

        assert!(delete_formulation(&fx.db, id).unwrap());
        assert!(get_formulation(&fx.db, id).is_err());
    }
}
