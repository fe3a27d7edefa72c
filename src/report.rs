//! Presentation helpers. Rounding happens here and nowhere upstream.

use crate::cost::{evaluate_cost, CostBreakdown};
use crate::error::Result;

/// Decimal places shown for attempt counts.
pub const DISPLAY_DECIMALS: i32 = 2;

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Attempt counts as displayed.
pub fn rounded_visits(visits: &[f64]) -> Vec<f64> {
    visits.iter().map(|&v| round_to(v, DISPLAY_DECIMALS)).collect()
}

/// Cost computed the legacy way: visits rounded to display precision before
/// multiplying by unit cost. Kept to compare against full-precision figures.
pub fn legacy_rounded_cost(visits: &[f64], unit_costs: &[f64]) -> Result<CostBreakdown> {
    evaluate_cost(&rounded_visits(visits), unit_costs)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

/// Format a cost given in millions: `"1 234.05w"` from 100 up (one won is
/// 100 million), `"42M"` below. Fractions of a million are truncated.
pub fn format_cost(value: f64) -> String {
    if !value.is_finite() || value <= 0.0 {
        return "0M".to_string();
    }
    if value >= 100.0 {
        let millions = value.trunc() as u64;
        format!("{}.{:02}w", group_thousands(millions / 100), millions % 100)
    } else {
        format!("{}M", value.trunc() as u64)
    }
}
