//! Proportional redistribution helpers
//!
//! Every redistribution rounds to a fixed scale and then pushes the rounding
//! residual onto the largest participating ingredient, so sums land exactly
//! on their target. A negative residual larger than that ingredient's amount
//! takes it to zero and carries on to the next largest.

use rust_decimal::Decimal;

use crate::models::Ingredient;

/// Decimal places kept on redistributed gram amounts
pub const AMOUNT_SCALE: u32 = 6;

/// Decimal places kept on derived percentages
pub const PERCENT_SCALE: u32 = 6;

/// Rescale the amounts at `targets` so they sum exactly to `target_sum`,
/// keeping their relative proportions. When every target is at zero the
/// mass is shared equally.
pub fn redistribute(ingredients: &mut [Ingredient], targets: &[usize], target_sum: Decimal) {
    if targets.is_empty() {
        return;
    }

    let current: Decimal = targets.iter().map(|&i| ingredients[i].amount_g()).sum();

    if current > Decimal::ZERO {
        for &i in targets {
            let scaled = (ingredients[i].amount_g() * target_sum / current).round_dp(AMOUNT_SCALE);
            ingredients[i].set_amount_g(scaled);
        }
    } else {
        let share = (target_sum / Decimal::from(targets.len())).round_dp(AMOUNT_SCALE);
        for &i in targets {
            ingredients[i].set_amount_g(share);
        }
    }

    settle_residual(ingredients, targets, target_sum);
}

/// `targets` from largest amount to smallest; ties keep index order
fn by_size(ingredients: &[Ingredient], targets: &[usize]) -> Vec<usize> {
    let mut order = targets.to_vec();
    order.sort_by(|&a, &b| ingredients[b].amount_g().cmp(&ingredients[a].amount_g()).then(a.cmp(&b)));
    order
}

/// Add `residual` to `values` in `order`, never taking a value below zero.
/// Returns whatever could not be absorbed.
fn absorb(values: &mut [Decimal], order: &[usize], mut residual: Decimal) -> Decimal {
    for &idx in order {
        if residual.is_zero() {
            break;
        }
        let adjusted = values[idx] + residual;
        if adjusted >= Decimal::ZERO {
            values[idx] = adjusted;
            residual = Decimal::ZERO;
        } else {
            residual = adjusted;
            values[idx] = Decimal::ZERO;
        }
    }
    residual
}

/// Spread `target_sum - sum(targets)` over the targets, largest first
fn settle_residual(ingredients: &mut [Ingredient], targets: &[usize], target_sum: Decimal) {
    let sum: Decimal = targets.iter().map(|&i| ingredients[i].amount_g()).sum();
    let residual = target_sum - sum;
    if residual.is_zero() {
        return;
    }

    let order = by_size(ingredients, targets);
    let mut amounts: Vec<Decimal> = ingredients.iter().map(Ingredient::amount_g).collect();
    absorb(&mut amounts, &order, residual);
    for &idx in targets {
        ingredients[idx].set_amount_g(amounts[idx]);
    }
}

/// Percentages of each ingredient in the batch, rounded and reconciled to
/// exactly 100. All zero when the batch weighs nothing.
pub fn percentages(ingredients: &[Ingredient]) -> Vec<Decimal> {
    let total: Decimal = ingredients.iter().map(Ingredient::amount_g).sum();
    if total.is_zero() {
        return vec![Decimal::ZERO; ingredients.len()];
    }

    let hundred = Decimal::ONE_HUNDRED;
    let mut pcts: Vec<Decimal> = ingredients
        .iter()
        .map(|i| (i.amount_g() * hundred / total).round_dp(PERCENT_SCALE))
        .collect();

    let residual = hundred - pcts.iter().copied().sum::<Decimal>();
    if !residual.is_zero() {
        let all: Vec<usize> = (0..ingredients.len()).collect();
        absorb(&mut pcts, &by_size(ingredients, &all), residual);
    }
    pcts
}
