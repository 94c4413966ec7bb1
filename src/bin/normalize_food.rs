//! Normalize a saved FoodData Central food payload and print the result
//! Usage: cargo run --bin normalize_food -- <food.json>

use formulator::nutrition::{catalog, normalize_food};
use formulator::provider::payload::parse_food;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("Usage: normalize_food <food.json>");
            std::process::exit(2);
        }
    };

    let text = std::fs::read_to_string(&path)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    let raw = parse_food(&value).ok_or("payload has no fdcId")?;
    let normalized = normalize_food(&raw)?;
    let food = &normalized.food;

    println!("{} [{}] fdc_id {}", food.description(), food.data_type(), food.external_id());
    println!("{} raw rows -> {} nutrients", raw.nutrient_records.len(), food.nutrients().len());

    let mut category = "";
    for nutrient in food.nutrients() {
        let current = catalog::category_for(nutrient.name());
        if current != category {
            println!("\n{}", current);
            category = current;
        }
        println!("  {:<40} {:>14} {}", nutrient.name(), nutrient.amount(), nutrient.unit());
    }

    let report = &normalized.report;
    println!(
        "\nDropped {} (denylisted {}, malformed {}, unknown unit {}, incompatible unit {})",
        report.dropped(),
        report.denylisted,
        report.malformed,
        report.unknown_unit,
        report.incompatible_unit
    );
    println!(
        "Collapsed {}, merged breakdown {}, derived {}",
        report.collapsed, report.merged_breakdown, report.derived
    );
    for issue in &report.issues {
        println!("  - {}", issue);
    }

    Ok(())
}
