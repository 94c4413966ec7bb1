//! Saved formulations
//!
//! Each formulation is stored as one serialized document. Names are unique
//! (case-insensitive).

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::connection::{DbError, DbResult};
use crate::models::record::{deserialize, serialize, FormulationRecord};
use crate::models::Formulation;

/// A stored formulation document
#[derive(Debug, Clone, Serialize)]
pub struct StoredFormulation {
    pub id: i64,
    pub name: String,
    pub document: FormulationRecord,
    pub ingredient_count: i64,
    pub total_weight: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Listing row without the document
#[derive(Debug, Clone, Serialize)]
pub struct FormulationSummary {
    pub id: i64,
    pub name: String,
    pub ingredient_count: i64,
    pub total_weight: String,
    pub updated_at: String,
}

impl StoredFormulation {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let document: String = row.get("document")?;
        let document = serde_json::from_str(&document)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            document,
            ingredient_count: row.get("ingredient_count")?,
            total_weight: row.get("total_weight")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a new formulation; the name must be free
    pub fn create(conn: &Connection, formulation: &Formulation) -> DbResult<Self> {
        if Self::get_by_name(conn, formulation.name())?.is_some() {
            return Err(DbError::Conflict(format!("Formulation {:?}", formulation.name())));
        }

        let document = serde_json::to_string(&serialize(formulation))?;
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        conn.execute(
            r#"
            INSERT INTO formulations (name, document, ingredient_count, total_weight, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
            params![
                formulation.name(),
                document,
                formulation.len() as i64,
                formulation.total_weight().to_string(),
                timestamp,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM formulations WHERE id = ?1")?;
        Ok(stmt.query_row([id], Self::from_row).optional()?)
    }

    pub fn get_by_name(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM formulations WHERE name = ?1")?;
        Ok(stmt.query_row([name.trim()], Self::from_row).optional()?)
    }

    /// List formulations, most recently updated first
    pub fn list(conn: &Connection, query: Option<&str>, limit: i64, offset: i64) -> DbResult<Vec<FormulationSummary>> {
        let pattern = format!("%{}%", query.unwrap_or("").trim());
        let mut stmt = conn.prepare(
            r#"
            SELECT id, name, ingredient_count, total_weight, updated_at
            FROM formulations
            WHERE name LIKE ?1
            ORDER BY updated_at DESC, id DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )?;
        let rows = stmt
            .query_map(params![pattern, limit, offset], |row| {
                Ok(FormulationSummary {
                    id: row.get("id")?,
                    name: row.get("name")?,
                    ingredient_count: row.get("ingredient_count")?,
                    total_weight: row.get("total_weight")?,
                    updated_at: row.get("updated_at")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Replace the stored document (and name) of an existing formulation
    pub fn save(conn: &Connection, id: i64, formulation: &Formulation) -> DbResult<Self> {
        if let Some(other) = Self::get_by_name(conn, formulation.name())? {
            if other.id != id {
                return Err(DbError::Conflict(format!("Formulation {:?}", formulation.name())));
            }
        }

        let document = serde_json::to_string(&serialize(formulation))?;
        let rows = conn.execute(
            r#"
            UPDATE formulations
            SET name = ?1, document = ?2, ingredient_count = ?3, total_weight = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
            params![
                formulation.name(),
                document,
                formulation.len() as i64,
                formulation.total_weight().to_string(),
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                id,
            ],
        )?;
        if rows == 0 {
            return Err(DbError::NotFound(format!("Formulation {}", id)));
        }

        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::NotFound(format!("Formulation {}", id)))
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM formulations WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// Rebuild the live formulation from its document
    pub fn load(&self) -> DbResult<Formulation> {
        Ok(deserialize(&self.document)?)
    }
}
