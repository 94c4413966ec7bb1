//! Formulator MCP Server Implementation
//!
//! Exposes the food library, formulation editing and nutrient calculation as
//! MCP tools over stdio.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::db::Database;
use crate::provider::{FoodSource, ResponseCache};
use crate::tools::foods::{self, ManualFoodCreate, ManualNutrient};
use crate::tools::formulations;
use crate::tools::status::StatusTracker;

/// Formulator MCP Service
#[derive(Clone)]
pub struct FormulatorService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    /// `None` when no USDA API key is configured
    food_source: Option<Arc<dyn FoodSource>>,
    tool_router: ToolRouter<FormulatorService>,
}

impl FormulatorService {
    pub fn new(
        database_path: PathBuf,
        database: Database,
        food_source: Option<Arc<dyn FoodSource>>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        let tracker = StatusTracker::new(database_path, cache, food_source.is_some());
        Self {
            status_tracker: Arc::new(Mutex::new(tracker)),
            database,
            food_source,
            tool_router: Self::tool_router(),
        }
    }

    fn source(&self) -> Result<&dyn FoodSource, McpError> {
        self.food_source.as_deref().ok_or_else(|| {
            McpError::internal_error("USDA_API_KEY is not set; FoodData Central tools are unavailable", None)
        })
    }
}

fn to_result<T: Serialize>(result: Result<T, String>) -> Result<CallToolResult, McpError> {
    let value = result.map_err(|e| McpError::internal_error(e, None))?;
    let json = serde_json::to_string_pretty(&value).map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// ============================================================================
// Food Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchFoodsParams {
    pub query: String,
    /// Hits per page (default 25)
    pub page_size: Option<u32>,
    /// Restrict to data types such as "Foundation", "SR Legacy", "Branded"
    #[serde(default)]
    pub data_types: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ImportFoodParams {
    pub fdc_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddManualFoodParams {
    pub description: String,
    pub brand: Option<String>,
    /// Nutrient amounts per 100 g
    #[serde(default)]
    pub nutrients: Vec<ManualNutrient>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IdParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListParams {
    pub query: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

// ============================================================================
// Formulation Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateFormulationParams {
    pub name: String,
    /// "grams" (default) or "percent"
    pub quantity_mode: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RenameFormulationParams {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetQuantityModeParams {
    pub id: i64,
    /// "grams" or "percent"
    pub quantity_mode: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddIngredientParams {
    /// Formulation id
    pub id: i64,
    /// Food library id
    pub food_id: i64,
    /// Amount as text, e.g. "250" or "1,5"
    pub amount: String,
    /// g (default), kg, mg, lb or oz
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IngredientParams {
    pub id: i64,
    /// Zero-based ingredient position
    pub index: usize,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetIngredientAmountParams {
    pub id: i64,
    pub index: usize,
    pub amount: String,
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetIngredientCostParams {
    pub id: i64,
    pub index: usize,
    /// Pack size; omit together with pack_price to clear the cost
    pub pack_amount: Option<String>,
    /// g (default), kg, mg, lb or oz
    pub pack_unit: Option<String>,
    pub pack_price: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TargetWeightParams {
    pub id: i64,
    pub target: String,
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetNutritionParams {
    pub id: i64,
    /// Also return each ingredient's absolute contribution
    #[serde(default)]
    pub per_ingredient: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetNutrientParams {
    pub id: i64,
    /// Canonical nutrient name, e.g. "Protein" or "Sodium, Na"
    pub name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ImportFormulationParams {
    /// JSON document from export_formulation
    pub document: String,
    /// Store under this name instead of the document's
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
struct DeleteResponse {
    deleted: bool,
    id: i64,
}

#[derive(Debug, Serialize)]
struct NutrientValueResponse {
    id: i64,
    name: String,
    /// Per 100 g; null when no ingredient carries the nutrient
    amount: Option<rust_decimal::Decimal>,
}

// ============================================================================
// Tool Router
// ============================================================================

#[tool_router]
impl FormulatorService {
    // --- Status ---

    #[tool(description = "Get the current status of the formulator service including build info, database, cache and process information")]
    async fn formulator_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status();
        let json = serde_json::to_string_pretty(&status)
            .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Get instructions for building the food library and editing formulations. Call this first when unsure how the tools fit together.")]
    fn formulation_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::FORMULATION_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(FORMULATION_INSTRUCTIONS)]))
    }

    // --- Food Library ---

    #[tool(description = "Search USDA FoodData Central. Foundation and SR Legacy foods are listed first.")]
    async fn search_foods(&self, Parameters(p): Parameters<SearchFoodsParams>) -> Result<CallToolResult, McpError> {
        let source = self.source()?;
        to_result(foods::search_foods(source, &p.query, p.page_size, p.data_types).await)
    }

    #[tool(description = "Fetch a food from FoodData Central by fdc_id, normalize its nutrients and store it in the food library")]
    async fn import_food(&self, Parameters(p): Parameters<ImportFoodParams>) -> Result<CallToolResult, McpError> {
        let source = self.source()?;
        to_result(foods::import_food(&self.database, source, p.fdc_id).await)
    }

    #[tool(description = "Add a food by hand with nutrient amounts per 100 g")]
    fn add_manual_food(&self, Parameters(p): Parameters<AddManualFoodParams>) -> Result<CallToolResult, McpError> {
        let data = ManualFoodCreate {
            description: p.description,
            brand: p.brand,
            nutrients: p.nutrients,
        };
        to_result(foods::add_manual_food(&self.database, data))
    }

    #[tool(description = "Get a library food with its normalized nutrients and normalization report")]
    fn get_food(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let food = foods::get_food(&self.database, p.id).and_then(|f| f.ok_or_else(|| format!("Food not found with id: {}", p.id)));
        to_result(food)
    }

    #[tool(description = "List library foods, optionally filtered by description")]
    fn list_foods(&self, Parameters(p): Parameters<ListParams>) -> Result<CallToolResult, McpError> {
        to_result(foods::list_foods(&self.database, p.query.as_deref(), p.limit, p.offset))
    }

    #[tool(description = "Delete a library food. Formulations that use it keep their own snapshot.")]
    fn delete_food(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        to_result(foods::delete_food(&self.database, p.id).map(|deleted| DeleteResponse { deleted, id: p.id }))
    }

    // --- Formulations ---

    #[tool(description = "Create an empty formulation in grams or percent mode")]
    fn create_formulation(&self, Parameters(p): Parameters<CreateFormulationParams>) -> Result<CallToolResult, McpError> {
        to_result(formulations::create_formulation(&self.database, &p.name, p.quantity_mode.as_deref()))
    }

    #[tool(description = "Get a formulation with its ingredients, amounts, percentages and locks")]
    fn get_formulation(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        to_result(formulations::get_formulation(&self.database, p.id))
    }

    #[tool(description = "List formulations, most recently edited first")]
    fn list_formulations(&self, Parameters(p): Parameters<ListParams>) -> Result<CallToolResult, McpError> {
        to_result(formulations::list_formulations(&self.database, p.query.as_deref(), p.limit, p.offset))
    }

    #[tool(description = "Delete a formulation")]
    fn delete_formulation(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        to_result(formulations::delete_formulation(&self.database, p.id).map(|deleted| DeleteResponse { deleted, id: p.id }))
    }

    #[tool(description = "Rename a formulation (names are unique)")]
    fn rename_formulation(&self, Parameters(p): Parameters<RenameFormulationParams>) -> Result<CallToolResult, McpError> {
        to_result(formulations::rename_formulation(&self.database, p.id, &p.name))
    }

    #[tool(description = "Switch between grams mode (edits change the batch weight) and percent mode (the batch weight is held)")]
    fn set_quantity_mode(&self, Parameters(p): Parameters<SetQuantityModeParams>) -> Result<CallToolResult, McpError> {
        to_result(formulations::set_quantity_mode(&self.database, p.id, &p.quantity_mode))
    }

    // --- Ingredients ---

    #[tool(description = "Add a library food to a formulation. In percent mode the amount is taken from the unlocked ingredients.")]
    fn add_ingredient(&self, Parameters(p): Parameters<AddIngredientParams>) -> Result<CallToolResult, McpError> {
        to_result(formulations::add_ingredient(&self.database, p.id, p.food_id, &p.amount, p.unit.as_deref()))
    }

    #[tool(description = "Remove an ingredient by index. In percent mode its mass goes back to the unlocked ingredients.")]
    fn remove_ingredient(&self, Parameters(p): Parameters<IngredientParams>) -> Result<CallToolResult, McpError> {
        to_result(formulations::remove_ingredient(&self.database, p.id, p.index))
    }

    #[tool(description = "Set an unlocked ingredient's amount. In percent mode the other unlocked ingredients absorb the change.")]
    fn set_ingredient_amount(&self, Parameters(p): Parameters<SetIngredientAmountParams>) -> Result<CallToolResult, McpError> {
        to_result(formulations::set_ingredient_amount(&self.database, p.id, p.index, &p.amount, p.unit.as_deref()))
    }

    #[tool(description = "Lock or unlock an ingredient's amount. With two or more ingredients one must stay unlocked.")]
    fn toggle_lock(&self, Parameters(p): Parameters<IngredientParams>) -> Result<CallToolResult, McpError> {
        to_result(formulations::toggle_lock(&self.database, p.id, p.index))
    }

    #[tool(description = "Set or clear an ingredient's pack price, used by get_cost")]
    fn set_ingredient_cost(&self, Parameters(p): Parameters<SetIngredientCostParams>) -> Result<CallToolResult, McpError> {
        to_result(formulations::set_ingredient_cost(
            &self.database,
            p.id,
            p.index,
            p.pack_amount.as_deref(),
            p.pack_unit.as_deref(),
            p.pack_price.as_deref(),
        ))
    }

    // --- Batch Weight ---

    #[tool(description = "Rescale the unlocked ingredients so the batch weighs the target. Locked amounts never change.")]
    fn adjust_to_target_weight(&self, Parameters(p): Parameters<TargetWeightParams>) -> Result<CallToolResult, McpError> {
        to_result(formulations::adjust_to_target_weight(&self.database, p.id, &p.target, p.unit.as_deref()))
    }

    #[tool(description = "Rescale the unlocked ingredients so the batch weighs 100 g")]
    fn normalize_to_100g(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        to_result(formulations::normalize_to_100g(&self.database, p.id))
    }

    // --- Calculations ---

    #[tool(description = "Nutrient totals per 100 g of the batch in label order, with energy in kcal and kJ")]
    fn get_nutrition(&self, Parameters(p): Parameters<GetNutritionParams>) -> Result<CallToolResult, McpError> {
        to_result(formulations::get_nutrition(&self.database, p.id, p.per_ingredient))
    }

    #[tool(description = "One nutrient's total per 100 g of the batch")]
    fn get_nutrient(&self, Parameters(p): Parameters<GetNutrientParams>) -> Result<CallToolResult, McpError> {
        let amount = formulations::get_nutrient(&self.database, p.id, &p.name);
        to_result(amount.map(|amount| NutrientValueResponse { id: p.id, name: p.name, amount }))
    }

    #[tool(description = "Batch cost and cost per kg from ingredient pack prices")]
    fn get_cost(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        to_result(formulations::get_cost(&self.database, p.id))
    }

    // --- Import / Export ---

    #[tool(description = "Export a formulation as a JSON document, including its food snapshots")]
    fn export_formulation(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let document = formulations::export_formulation(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        Ok(CallToolResult::success(vec![Content::text(document)]))
    }

    #[tool(description = "Store a JSON document from export_formulation as a new formulation")]
    fn import_formulation(&self, Parameters(p): Parameters<ImportFormulationParams>) -> Result<CallToolResult, McpError> {
        to_result(formulations::import_formulation(&self.database, &p.document, p.name.as_deref()))
    }
}

#[tool_handler]
impl ServerHandler for FormulatorService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "formulator".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Food Formulator".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Food Formulator - multi-ingredient food formulation with USDA FoodData Central nutrients. \
                 Call formulation_instructions first. \
                 Food library: search_foods, import_food, add_manual_food, get/list/delete_food. \
                 Formulations: create/get/list/delete_formulation, rename_formulation, set_quantity_mode. \
                 Ingredients: add_ingredient, remove_ingredient, set_ingredient_amount, toggle_lock, set_ingredient_cost. \
                 Batch weight: adjust_to_target_weight, normalize_to_100g. \
                 Results: get_nutrition, get_nutrient, get_cost. \
                 Transfer: export_formulation, import_formulation."
                    .into(),
            ),
        }
    }
}
