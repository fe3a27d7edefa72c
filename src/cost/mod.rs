//! Expected cost of a refine path.

pub mod prices;

pub use prices::*;

use crate::error::{Result, UpgradeError};
use serde::Serialize;

/// Expected spend per level and in total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub per_level: Vec<f64>,
    pub total: f64,
}

/// `per_level[i] = visits[i] * unit_costs[i]`.
pub fn evaluate_cost(visits: &[f64], unit_costs: &[f64]) -> Result<CostBreakdown> {
    evaluate_cost_from(visits, unit_costs, 0)
}

/// Cost of a refine that starts on level `start`. Levels below the start are
/// not charged, even when a downgrade sends the item back through them.
pub fn evaluate_cost_from(
    visits: &[f64],
    unit_costs: &[f64],
    start: usize,
) -> Result<CostBreakdown> {
    if visits.len() != unit_costs.len() {
        return Err(UpgradeError::LengthMismatch {
            expected: visits.len(),
            actual: unit_costs.len(),
        });
    }
    let per_level: Vec<f64> = visits
        .iter()
        .zip(unit_costs)
        .enumerate()
        .map(|(i, (v, c))| if i < start { 0.0 } else { v * c })
        .collect();
    let total = per_level.iter().sum();
    Ok(CostBreakdown { per_level, total })
}
