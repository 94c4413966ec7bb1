//! Formulation service
//!
//! Every ingredient-list mutation goes through here. Each operation works on
//! a copy of the formulation and commits only on success, so a failed call
//! leaves the caller's formulation exactly as it was.
//!
//! Invariants held after every call:
//! - with more than one ingredient, at least one is unlocked
//! - percentages sum to exactly 100 (or are all zero for an empty batch)
//! - in percent mode, add/remove/edit keep the batch weight constant

use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

use super::reconcile::{percentages, redistribute};
use crate::models::{Food, Formulation, Ingredient, IngredientCost, ModelError, QuantityMode};

/// Formulation service errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulationError {
    #[error("Ingredient index {index} out of range (formulation has {len} ingredients)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Ingredient {index} is locked")]
    LockedIngredient { index: usize },

    #[error("Unlocked ingredients hold {available} g and cannot yield {required} g")]
    InsufficientUnlockedCapacity { required: Decimal, available: Decimal },

    #[error("No other unlocked ingredient can absorb a change to ingredient {index}")]
    NoRedistributionPartner { index: usize },

    #[error("Target {target} g cannot be reached with {locked} g locked")]
    UnreachableTarget { target: Decimal, locked: Decimal },

    #[error("At least one ingredient must stay unlocked")]
    NoUnlockedIngredient,

    #[error("Amount must be non-negative (got {0})")]
    InvalidAmount(Decimal),

    #[error("Target weight must be positive (got {0})")]
    InvalidTarget(Decimal),

    #[error("Formulation has no ingredients")]
    EmptyFormulation,

    #[error("Formulation name cannot be empty")]
    InvalidName,

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Result type for formulation operations
pub type FormulationResult<T> = Result<T, FormulationError>;

fn check_index(formulation: &Formulation, index: usize) -> FormulationResult<()> {
    if index >= formulation.len() {
        return Err(FormulationError::IndexOutOfRange {
            index,
            len: formulation.len(),
        });
    }
    Ok(())
}

fn check_amount(amount_g: Decimal) -> FormulationResult<()> {
    if amount_g < Decimal::ZERO {
        return Err(FormulationError::InvalidAmount(amount_g));
    }
    Ok(())
}

// ============================================================================
// Ingredient List
// ============================================================================

/// Append `food` as a new unlocked ingredient and return its index.
///
/// In percent mode the new amount is carved out of the unlocked ingredients
/// in proportion to their current amounts, so the batch weight is unchanged.
pub fn add_ingredient(
    formulation: &mut Formulation,
    food: Arc<Food>,
    amount_g: Decimal,
) -> FormulationResult<usize> {
    check_amount(amount_g)?;
    let mut next = formulation.clone();

    if next.quantity_mode() == QuantityMode::Percent && !next.is_empty() {
        let unlocked = next.unlocked_indices();
        let capacity: Decimal = unlocked
            .iter()
            .map(|&i| next.ingredients()[i].amount_g())
            .sum();
        if amount_g > capacity {
            return Err(FormulationError::InsufficientUnlockedCapacity {
                required: amount_g,
                available: capacity,
            });
        }
        if !amount_g.is_zero() {
            redistribute(next.ingredients_mut(), &unlocked, capacity - amount_g);
        }
    }

    let description = food.description().to_string();
    next.ingredients_mut().push(Ingredient::new(food, amount_g)?);
    distribute_percentages(&mut next);

    let index = next.len() - 1;
    debug!(index, %amount_g, food = %description, "Added ingredient");
    *formulation = next;
    Ok(index)
}

/// Remove the ingredient at `index` and return it.
///
/// If the removal leaves more than one ingredient and all of them locked,
/// the ingredient that followed the removed one (or the new last one) is
/// unlocked. In percent mode the removed mass goes back to the unlocked
/// ingredients.
pub fn remove_ingredient(formulation: &mut Formulation, index: usize) -> FormulationResult<Ingredient> {
    check_index(formulation, index)?;
    let mut next = formulation.clone();
    let removed = next.ingredients_mut().remove(index);

    if next.len() > 1 && next.unlocked_count() == 0 {
        let successor = index.min(next.len() - 1);
        next.ingredients_mut()[successor].set_locked(false);
        info!(
            unlocked = successor,
            "Auto-unlocked ingredient to keep one degree of freedom"
        );
    }

    if next.quantity_mode() == QuantityMode::Percent && !removed.amount_g().is_zero() {
        let unlocked = next.unlocked_indices();
        if !unlocked.is_empty() {
            let current: Decimal = unlocked
                .iter()
                .map(|&i| next.ingredients()[i].amount_g())
                .sum();
            redistribute(next.ingredients_mut(), &unlocked, current + removed.amount_g());
        }
    }

    distribute_percentages(&mut next);
    *formulation = next;
    Ok(removed)
}

/// Set one ingredient's amount.
///
/// Locked ingredients cannot be edited. In percent mode the change is
/// absorbed by the other unlocked ingredients in proportion to their share
/// of the unlocked total; without such a partner the edit is rejected.
pub fn set_ingredient_amount(
    formulation: &mut Formulation,
    index: usize,
    new_amount_g: Decimal,
) -> FormulationResult<()> {
    check_index(formulation, index)?;
    check_amount(new_amount_g)?;
    if formulation.ingredients()[index].is_locked() {
        return Err(FormulationError::LockedIngredient { index });
    }

    let mut next = formulation.clone();

    if next.quantity_mode() == QuantityMode::Percent {
        let old = next.ingredients()[index].amount_g();
        let delta = new_amount_g - old;

        if !delta.is_zero() {
            let partners: Vec<usize> = next
                .unlocked_indices()
                .into_iter()
                .filter(|&i| i != index)
                .collect();
            if partners.is_empty() {
                return Err(FormulationError::NoRedistributionPartner { index });
            }

            let available: Decimal = partners
                .iter()
                .map(|&i| next.ingredients()[i].amount_g())
                .sum();
            if delta > available {
                return Err(FormulationError::InsufficientUnlockedCapacity {
                    required: delta,
                    available,
                });
            }
            redistribute(next.ingredients_mut(), &partners, available - delta);
        }
    }

    next.ingredients_mut()[index].set_amount_g(new_amount_g);
    distribute_percentages(&mut next);
    *formulation = next;
    Ok(())
}

/// Flip the lock on one ingredient and return the new state.
///
/// Locking is refused when it would leave no unlocked ingredient among two
/// or more. A formulation with a single ingredient may lock it.
pub fn toggle_lock(formulation: &mut Formulation, index: usize) -> FormulationResult<bool> {
    check_index(formulation, index)?;

    let locking = !formulation.ingredients()[index].is_locked();
    if locking && formulation.len() > 1 && formulation.unlocked_count() <= 1 {
        return Err(FormulationError::NoUnlockedIngredient);
    }

    formulation.ingredients_mut()[index].set_locked(locking);
    Ok(locking)
}

/// Attach or clear the purchase price of one ingredient
pub fn set_ingredient_cost(
    formulation: &mut Formulation,
    index: usize,
    cost: Option<IngredientCost>,
) -> FormulationResult<()> {
    check_index(formulation, index)?;
    formulation.ingredients_mut()[index].set_cost(cost);
    Ok(())
}

// ============================================================================
// Batch Weight
// ============================================================================

/// Rescale the unlocked ingredients so the batch weighs `target_g`.
///
/// Locked amounts are untouched and unlocked ingredients keep their relative
/// proportions.
pub fn adjust_to_target_weight(formulation: &mut Formulation, target_g: Decimal) -> FormulationResult<()> {
    if formulation.is_empty() {
        return Err(FormulationError::EmptyFormulation);
    }
    if target_g <= Decimal::ZERO {
        return Err(FormulationError::InvalidTarget(target_g));
    }

    let locked = formulation.locked_weight();
    if target_g < locked {
        return Err(FormulationError::UnreachableTarget { target: target_g, locked });
    }

    let unlocked = formulation.unlocked_indices();
    if unlocked.is_empty() {
        if target_g == locked {
            return Ok(());
        }
        return Err(FormulationError::UnreachableTarget { target: target_g, locked });
    }

    let mut next = formulation.clone();
    redistribute(next.ingredients_mut(), &unlocked, target_g - locked);
    distribute_percentages(&mut next);

    debug!(%target_g, %locked, "Adjusted formulation to target weight");
    *formulation = next;
    Ok(())
}

/// Scale the batch to 100 g (see `adjust_to_target_weight`)
pub fn normalize_to_100g(formulation: &mut Formulation) -> FormulationResult<()> {
    adjust_to_target_weight(formulation, Decimal::ONE_HUNDRED)
}

/// Refresh every ingredient's percentage from the current amounts.
/// Never changes an amount.
pub fn distribute_percentages(formulation: &mut Formulation) {
    let pcts = percentages(formulation.ingredients());
    for (ingredient, pct) in formulation.ingredients_mut().iter_mut().zip(pcts) {
        ingredient.set_percentage(pct);
    }
}

// ============================================================================
// Formulation Settings
// ============================================================================

pub fn set_quantity_mode(formulation: &mut Formulation, mode: QuantityMode) {
    formulation.set_quantity_mode(mode);
    distribute_percentages(formulation);
}

pub fn rename(formulation: &mut Formulation, name: &str) -> FormulationResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FormulationError::InvalidName);
    }
    formulation.set_name(name.to_string());
    Ok(())
}

/// Re-establish the lock invariant on a formulation loaded from outside
/// (persisted state written by older tools may have every row locked).
/// Returns the index that was unlocked, if any.
pub(crate) fn restore_lock_invariant(formulation: &mut Formulation) -> Option<usize> {
    if formulation.len() > 1 && formulation.unlocked_count() == 0 {
        formulation.ingredients_mut()[0].set_locked(false);
        return Some(0);
    }
    None
}
