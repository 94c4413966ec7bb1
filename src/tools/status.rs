//! Formulator Status Tool
//!
//! Runtime status of the service and the workflow guide for assistants.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::nutrition::catalog;
use crate::provider::ResponseCache;

/// Workflow guide returned by `formulation_instructions`
pub const FORMULATION_INSTRUCTIONS: &str = r#"
# Food Formulator Instructions

## Overview

A formulation is an ordered list of ingredients, each a food from the
library with an amount in grams. Nutrient totals are reported per 100 g of
the finished batch, using USDA FoodData Central conventions (food values are
per 100 g of the food).

## Building the food library

1. `search_foods(query)` searches FoodData Central. Hits come back with
   Foundation and SR Legacy first, Branded last.
2. `import_food(fdc_id)` fetches the food, normalizes its nutrients and stores
   the snapshot. The response carries a normalization report: rows dropped
   for bad data, duplicate rows collapsed, and nutrients computed (energy,
   nitrogen, estimated water for branded foods).
3. `add_manual_food` enters a food by hand (values per 100 g). Units are
   inferred from the nutrient name when omitted.

Re-importing a food replaces the library snapshot. Existing formulations keep
the snapshot they were built with.

## Editing a formulation

- `create_formulation(name, quantity_mode)`; mode is `grams` (default) or
  `percent`.
- `add_ingredient(id, food_id, amount, unit)`; unit is g, kg, mg, lb or oz.
  Amounts accept a decimal comma ("1,5").
- In **grams** mode edits change the batch weight.
- In **percent** mode the batch weight is held: adding, removing or changing
  an ingredient moves mass between the *unlocked* ingredients.
- `toggle_lock(id, index)` pins an ingredient's amount. With two or more
  ingredients at least one must stay unlocked.
- `adjust_to_target_weight(id, target, unit)` rescales the unlocked
  ingredients so the batch weighs the target; locked amounts never change.
- `normalize_to_100g(id)` is the same with a 100 g target.

Failed edits change nothing.

## Results

- `get_nutrition(id)`: totals per 100 g in label order, plus energy in kcal
  and kJ.
- `get_cost(id)`: batch cost and cost per kg from ingredient pack prices
  (`set_ingredient_cost`).
- `export_formulation(id)` / `import_formulation(document)` move a
  formulation as JSON.
"#;

/// Runtime status of the formulator service
#[derive(Debug, Serialize)]
pub struct FormulatorStatus {
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    pub database_path: String,
    pub database_size_bytes: Option<u64>,

    pub usda_configured: bool,
    pub cache_entries: usize,
    pub alias_table_version: u32,

    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
    cache: Arc<dyn ResponseCache>,
    usda_configured: bool,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf, cache: Arc<dyn ResponseCache>, usda_configured: bool) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
            cache,
            usda_configured,
        }
    }

    pub fn get_status(&self) -> FormulatorStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path).ok().map(|m| m.len());

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));
        let memory_usage_bytes = sys.process(Pid::from_u32(pid)).map(|p| p.memory()).unwrap_or(0);

        FormulatorStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            usda_configured: self.usda_configured,
            cache_entries: self.cache.size(),
            alias_table_version: catalog::ALIAS_TABLE_VERSION,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryCache;

    #[test]
    fn test_status_reports_cache_and_process() {
        let cache: Arc<dyn ResponseCache> = Arc::new(InMemoryCache::default());
        cache.set("food:1:full", serde_json::json!({}), None);

        let tracker = StatusTracker::new(PathBuf::from("/nonexistent/formulator.db"), cache, false);
        let status = tracker.get_status();

        assert_eq!(status.cache_entries, 1);
        assert_eq!(status.database_size_bytes, None);
        assert_eq!(status.process_id, std::process::id());
        assert!(!status.usda_configured);
    }
}
