//! Matrix build, absorption and cost for one fixed configuration.

use crate::cost::{evaluate_cost_from, CostBreakdown};
use crate::error::{Result, UpgradeError};
use crate::markov::{
    build_transition_matrix, dispersion, fundamental_matrix, solve_absorption_from, Dispersion,
    ExpectedVisits, SolverConfig, UpgradeConfiguration,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// Level the item starts on (0 for a fresh +0 item).
    pub start_level: usize,
    pub visits: ExpectedVisits,
    pub cost: CostBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispersion: Option<Dispersion>,
}

impl Evaluation {
    pub fn total_attempts(&self) -> f64 {
        self.visits.total()
    }

    pub fn total_cost(&self) -> f64 {
        self.cost.total
    }

    /// Attach the spread of the attempt counts for `config`.
    pub fn with_dispersion(mut self, config: &UpgradeConfiguration, solver: &SolverConfig) -> Self {
        self.dispersion = Some(spread(config, self.start_level, solver));
        self
    }
}

pub(crate) fn check_start_level(start_level: usize, levels: usize) -> Result<()> {
    if start_level >= levels {
        return Err(UpgradeError::InvalidStartLevel {
            start: start_level,
            levels,
        });
    }
    Ok(())
}

/// Expected attempts and cost per level for `config`, refining from
/// `start_level` to the top, with one unit cost per level.
pub fn evaluate(
    config: &UpgradeConfiguration,
    unit_costs: &[f64],
    start_level: usize,
    solver: &SolverConfig,
) -> Result<Evaluation> {
    check_start_level(start_level, config.len())?;
    let matrix = build_transition_matrix(config);
    let visits = solve_absorption_from(&matrix, start_level, solver);
    let cost = evaluate_cost_from(&visits.visits, unit_costs, start_level)?;
    Ok(Evaluation {
        start_level,
        visits,
        cost,
        dispersion: None,
    })
}

/// Spread of the attempt counts for `config`, starting from `start_level`.
pub fn spread(
    config: &UpgradeConfiguration,
    start_level: usize,
    solver: &SolverConfig,
) -> Dispersion {
    let n = fundamental_matrix(&build_transition_matrix(config), solver);
    dispersion(&n, start_level.min(config.len().saturating_sub(1)))
}
