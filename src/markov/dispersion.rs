//! Spread of the attempt counts around their expectation.
//!
//! Variances come from the fundamental matrix: for visits to level `j`,
//! `Var = N (2 N_dg - I) - N_sq`; for the total attempt count `t = N 1`,
//! `Var = (2N - I) t - t_sq`. Intervals use the normal approximation.

use super::types::FundamentalMatrix;
use serde::Serialize;

pub const Z_95: f64 = 1.96;
pub const Z_99: f64 = 2.58;

/// Coefficient of variation below which a path counts as low risk.
pub const LOW_RISK_CV: f64 = 0.20;
/// Coefficient of variation below which a path counts as medium risk.
pub const MEDIUM_RISK_CV: f64 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_cv(cv: f64) -> Self {
        if cv < LOW_RISK_CV {
            RiskLevel::Low
        } else if cv < MEDIUM_RISK_CV {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelSpread {
    pub mean: f64,
    pub variance: f64,
    pub std: f64,
    pub ci95: Interval,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalSpread {
    pub mean: f64,
    pub variance: f64,
    pub std: f64,
    pub ci95: Interval,
    pub ci99: Interval,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dispersion {
    pub total: TotalSpread,
    pub by_level: Vec<LevelSpread>,
    /// `std / mean` of the total attempt count.
    pub cv: f64,
    pub risk: RiskLevel,
}

/// Dispersion of the attempt counts for a walk starting at `start`.
pub fn dispersion(n: &FundamentalMatrix, start: usize) -> Dispersion {
    let size = n.size();
    let row = n.row(start);

    let by_level: Vec<LevelSpread> = (0..size)
        .map(|j| {
            let mean = row[j];
            let variance = (mean * (2.0 * n.get(j, j) - 1.0) - mean * mean).max(0.0);
            let std = variance.sqrt();
            LevelSpread {
                mean,
                variance,
                std,
                ci95: Interval {
                    lower: (mean - Z_95 * std).max(0.0),
                    upper: mean + Z_95 * std,
                },
            }
        })
        .collect();

    // t[i] = expected total attempts from level i
    let t: Vec<f64> = (0..size).map(|i| n.row(i).iter().sum()).collect();
    let mean = t[start];
    let weighted: f64 = (0..size)
        .map(|k| {
            let identity = if k == start { 1.0 } else { 0.0 };
            (2.0 * n.get(start, k) - identity) * t[k]
        })
        .sum();
    let variance = (weighted - mean * mean).max(0.0);
    let std = variance.sqrt();

    let total = TotalSpread {
        mean,
        variance,
        std,
        ci95: Interval {
            lower: (mean - Z_95 * std).max(1.0),
            upper: mean + Z_95 * std,
        },
        ci99: Interval {
            lower: (mean - Z_99 * std).max(1.0),
            upper: mean + Z_99 * std,
        },
    };

    let cv = if mean > 0.0 { std / mean } else { 0.0 };

    Dispersion {
        total,
        by_level,
        cv,
        risk: RiskLevel::from_cv(cv),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markov::{build_transition_matrix, fundamental_matrix};
    use crate::markov::{SolverConfig, UpgradeConfiguration};

    fn spread(rates: &[f64], exempt: &[bool]) -> Dispersion {
        let config = UpgradeConfiguration::from_rates(rates, exempt).unwrap();
        let n = fundamental_matrix(&build_transition_matrix(&config), &SolverConfig::default());
        dispersion(&n, 0)
    }

    #[test]
    fn test_single_level_geometric_variance() {
        let d = spread(&[25.0], &[false]);
        // (1 - p) / p^2 with p = 0.25
        assert!((d.total.variance - 12.0).abs() < 1e-9);
        assert!((d.by_level[0].variance - 12.0).abs() < 1e-9);
        assert!((d.total.mean - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_certain_path_has_no_spread() {
        let d = spread(&[100.0, 100.0, 100.0], &[false, false, false]);
        assert!(d.total.variance.abs() < 1e-12);
        assert_eq!(d.risk, RiskLevel::Low);
        assert!((d.total.ci95.lower - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_independent_levels_variances_add() {
        // Exempt levels are independent geometric trials
        let d = spread(&[50.0, 25.0], &[true, true]);
        let expected = (0.5 / 0.25) + (0.75 / 0.0625);
        assert!((d.total.variance - expected).abs() < 1e-9);
    }

    #[test]
    fn test_risk_thresholds() {
        assert_eq!(RiskLevel::from_cv(0.1), RiskLevel::Low);
        assert_eq!(RiskLevel::from_cv(0.2), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_cv(0.34), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_cv(0.35), RiskLevel::High);
    }

    #[test]
    fn test_interval_lower_bounds_clamped() {
        let d = spread(&[5.0], &[false]);
        assert!(d.total.ci95.lower >= 1.0);
        assert!(d.by_level[0].ci95.lower >= 0.0);
    }
}
