//! Numeric input parsing
//!
//! Turns user- or provider-supplied text into decimals. Accepts a decimal
//! comma, thousands separators and scientific notation.

use std::str::FromStr;

use rust_decimal::Decimal;

/// Parse a number typed by a user or carried as text in an upstream payload.
///
/// When both `,` and `.` appear, the rightmost one is the decimal separator
/// and the other is treated as a thousands separator. A lone `,` is a decimal
/// comma. Returns `None` for empty or non-numeric text.
pub fn parse_user_number(text: &str) -> Option<Decimal> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace() && *c != '_').collect();
    if cleaned.is_empty() {
        return None;
    }

    let comma = cleaned.rfind(',');
    let dot = cleaned.rfind('.');
    let normalized = match (comma, dot) {
        (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => {
            if cleaned.matches(',').count() > 1 {
                cleaned.replace(',', "")
            } else {
                cleaned.replace(',', ".")
            }
        }
        _ => cleaned,
    };

    if normalized.contains(['e', 'E']) {
        return Decimal::from_scientific(&normalized).ok();
    }
    Decimal::from_str(&normalized).ok()
}
