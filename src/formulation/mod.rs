//! Formulation Module
//!
//! Mutation rules for a formulation's ingredient list: lock handling,
//! percent-mode redistribution and batch-weight scaling.

pub mod reconcile;
mod service;

pub use service::{
    add_ingredient, adjust_to_target_weight, distribute_percentages, normalize_to_100g, remove_ingredient,
    rename, set_ingredient_amount, set_ingredient_cost, set_quantity_mode, toggle_lock, FormulationError,
    FormulationResult,
};
pub(crate) use service::restore_lock_invariant;
