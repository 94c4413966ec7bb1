//! Database module
//!
//! Handles SQLite connection, migrations, the food library and saved
//! formulation documents.

pub mod connection;
pub mod foods;
pub mod formulations;
pub mod migrations;

pub use connection::{Database, DbError, DbResult};
pub use foods::StoredFood;
pub use formulations::{FormulationSummary, StoredFormulation};
