//! Formulator Tools module
//!
//! MCP tool implementations: food library, formulations and status.

pub mod foods;
pub mod formulations;
pub mod status;
