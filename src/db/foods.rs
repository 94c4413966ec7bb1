//! Food library
//!
//! Normalized food snapshots, keyed by FoodData Central id. Manual foods have
//! no fdc id and are only reachable by row id.

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::connection::{DbError, DbResult};
use crate::models::record::{food_to_record, record_to_food, FoodRecord};
use crate::models::{DataType, Food};
use crate::nutrition::NormalizationReport;

/// A stored food snapshot
#[derive(Debug, Clone, Serialize)]
pub struct StoredFood {
    pub id: i64,
    pub fdc_id: Option<i64>,
    pub description: String,
    pub data_type: String,
    pub brand: Option<String>,
    pub snapshot: FoodRecord,
    pub report: Option<serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
}

/// Decode a JSON text column; `column` is its position in `SELECT *`
fn json_column<T: serde::de::DeserializeOwned>(column: usize, text: &str) -> rusqlite::Result<T> {
    serde_json::from_str(text).map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

impl StoredFood {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let snapshot: String = row.get("snapshot")?;
        let report: Option<String> = row.get("report")?;
        Ok(Self {
            id: row.get("id")?,
            fdc_id: row.get("fdc_id")?,
            description: row.get("description")?,
            data_type: row.get("data_type")?,
            brand: row.get("brand")?,
            snapshot: json_column(5, &snapshot)?,
            report: report
                .as_deref()
                .map(|r| json_column(6, r))
                .transpose()?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Store a food. Fetched foods replace any earlier snapshot with the same
    /// fdc id; manual foods always get a new row.
    pub fn upsert(conn: &Connection, food: &Food, report: Option<&NormalizationReport>) -> DbResult<Self> {
        let snapshot = serde_json::to_string(&food_to_record(food))?;
        let report = report.map(serde_json::to_string).transpose()?;
        let fdc_id = (*food.data_type() != DataType::Manual).then(|| food.external_id());
        let timestamp = now();

        conn.execute(
            r#"
            INSERT INTO foods (fdc_id, description, data_type, brand, snapshot, report, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            ON CONFLICT(fdc_id) DO UPDATE SET
                description = excluded.description,
                data_type = excluded.data_type,
                brand = excluded.brand,
                snapshot = excluded.snapshot,
                report = excluded.report,
                updated_at = excluded.updated_at
            "#,
            params![
                fdc_id,
                food.description(),
                food.data_type().as_str(),
                food.brand(),
                snapshot,
                report,
                timestamp,
            ],
        )?;

        let stored = match fdc_id {
            Some(fdc_id) => Self::get_by_fdc_id(conn, fdc_id)?,
            None => Self::get_by_id(conn, conn.last_insert_rowid())?,
        };
        stored.ok_or_else(|| DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM foods WHERE id = ?1")?;
        Ok(stmt.query_row([id], Self::from_row).optional()?)
    }

    pub fn get_by_fdc_id(conn: &Connection, fdc_id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM foods WHERE fdc_id = ?1")?;
        Ok(stmt.query_row([fdc_id], Self::from_row).optional()?)
    }

    /// List foods, optionally filtered by description substring
    pub fn list(conn: &Connection, query: Option<&str>, limit: i64, offset: i64) -> DbResult<Vec<Self>> {
        let pattern = format!("%{}%", query.unwrap_or("").trim());
        let mut stmt = conn.prepare(
            "SELECT * FROM foods WHERE description LIKE ?1 ORDER BY description ASC, id ASC LIMIT ?2 OFFSET ?3",
        )?;
        let foods = stmt
            .query_map(params![pattern, limit, offset], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM foods WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// Rebuild the immutable food from its snapshot
    pub fn to_food(&self) -> DbResult<Food> {
        Ok(record_to_food(&self.snapshot)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::Nutrient;
    use crate::nutrition::CanonicalUnit;
    use rust_decimal::Decimal;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn egg(protein: i64) -> Food {
        Food::new(
            171287,
            "Egg, whole, raw",
            DataType::SrLegacy,
            None,
            vec![Nutrient::new("Protein", CanonicalUnit::Gram, Decimal::from(protein)).unwrap()],
        )
        .unwrap()
    }

    #[test]
    fn test_upsert_replaces_snapshot() {
        let conn = conn();
        let first = StoredFood::upsert(&conn, &egg(12), None).unwrap();
        let second = StoredFood::upsert(&conn, &egg(13), Some(&NormalizationReport::default())).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.fdc_id, Some(171287));
        assert!(second.report.is_some());
        assert_eq!(second.to_food().unwrap().amount_of("Protein"), Some(Decimal::from(13)));
        assert_eq!(StoredFood::list(&conn, None, 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_manual_foods_get_own_rows() {
        let conn = conn();
        let food = Food::new(0, "House spice mix", DataType::Manual, None, vec![]).unwrap();
        let a = StoredFood::upsert(&conn, &food, None).unwrap();
        let b = StoredFood::upsert(&conn, &food, None).unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.fdc_id, None);
        assert_eq!(b.to_food().unwrap(), food);
    }

    #[test]
    fn test_list_filter_and_delete() {
        let conn = conn();
        let stored = StoredFood::upsert(&conn, &egg(12), None).unwrap();

        assert_eq!(StoredFood::list(&conn, Some("egg"), 10, 0).unwrap().len(), 1);
        assert!(StoredFood::list(&conn, Some("cheese"), 10, 0).unwrap().is_empty());
        assert!(StoredFood::delete(&conn, stored.id).unwrap());
        assert!(!StoredFood::delete(&conn, stored.id).unwrap());
        assert!(StoredFood::get_by_fdc_id(&conn, 171287).unwrap().is_none());
    }
}
