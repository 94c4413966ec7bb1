//! Food Formulator Library
//!
//! Nutrient normalization and formulation editing over USDA FoodData Central
//! data, with a SQLite food library and an MCP surface.

pub mod build_info;
pub mod config;
pub mod db;
pub mod formulation;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod provider;
pub mod tools;
