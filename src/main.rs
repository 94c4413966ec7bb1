//! Food Formulator
//!
//! MCP server for multi-ingredient food formulation.

use std::sync::Arc;

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use formulator::build_info;
use formulator::config::AppConfig;
use formulator::db::{migrations, Database};
use formulator::mcp::FormulatorService;
use formulator::provider::{FoodSource, ProviderError, UsdaClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stderr only: stdout carries the MCP protocol
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("formulator=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let config = AppConfig::from_env()?;
    eprintln!("Database path: {}", config.database_path.display());

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = Database::new(&config.database_path)?;
    database.with_conn(|conn| {
        migrations::run_migrations(conn)?;
        let version = migrations::get_schema_version(conn)?;
        eprintln!("Database schema version: {}", version);
        Ok(())
    })?;

    let cache = config.build_cache();
    let food_source: Option<Arc<dyn FoodSource>> = match UsdaClient::new(
        config.usda_api_key.clone(),
        config.usda_base_url.as_str(),
        config.http_timeout,
        Arc::clone(&cache),
    ) {
        Ok(client) => {
            info!(base_url = %config.usda_base_url, cache = ?config.cache_mode, "FoodData Central client ready");
            Some(Arc::new(client))
        }
        Err(ProviderError::MissingApiKey) => {
            warn!("USDA_API_KEY is not set; search_foods and import_food are disabled");
            None
        }
        Err(e) => return Err(e.into()),
    };

    let service = FormulatorService::new(config.database_path.clone(), database, food_source, cache);

    let server = service.serve((stdin(), stdout())).await?;
    server.waiting().await?;

    Ok(())
}
