use crate::error::{Result, UpgradeError};
use serde::{Deserialize, Serialize};

/// Terms summed by the truncated-series fallback when `I - Q` is singular.
pub const FALLBACK_SERIES_TERMS: usize = 100_000;

/// Pivots smaller than this make the elimination treat the system as singular.
pub const PIVOT_EPSILON: f64 = 1e-10;

/// One transient level of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    /// Percentage in [0, 100].
    pub success_rate: f64,
    /// A failed attempt keeps the item on this level instead of dropping it.
    pub downgrade_exempt: bool,
}

impl Level {
    pub fn new(success_rate: f64, downgrade_exempt: bool) -> Self {
        Self {
            success_rate,
            downgrade_exempt,
        }
    }

    /// Probability of one attempt succeeding.
    pub fn probability(&self) -> f64 {
        self.success_rate / 100.0
    }
}

/// Validated sequence of `n` levels. Level `n` (complete) is implicit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradeConfiguration {
    levels: Vec<Level>,
}

impl UpgradeConfiguration {
    /// Rejects any rate outside [0, 100] (NaN included) before anything is built.
    pub fn new(levels: Vec<Level>) -> Result<Self> {
        if levels.is_empty() {
            return Err(UpgradeError::EmptyConfiguration);
        }
        for (i, level) in levels.iter().enumerate() {
            if !(0.0..=100.0).contains(&level.success_rate) {
                return Err(UpgradeError::InvalidRate {
                    level: i + 1,
                    rate: level.success_rate,
                });
            }
        }
        Ok(Self { levels })
    }

    /// Convenience constructor from parallel rate/flag slices.
    pub fn from_rates(rates: &[f64], downgrade_exempt: &[bool]) -> Result<Self> {
        if rates.len() != downgrade_exempt.len() {
            return Err(UpgradeError::LengthMismatch {
                expected: rates.len(),
                actual: downgrade_exempt.len(),
            });
        }
        Self::new(
            rates
                .iter()
                .zip(downgrade_exempt)
                .map(|(&rate, &exempt)| Level::new(rate, exempt))
                .collect(),
        )
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Number of transient levels (`n`).
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// A failure at index `i` stays put at index 0 or on an exempt level.
    pub fn stays_on_failure(&self, i: usize) -> bool {
        i == 0 || self.levels[i].downgrade_exempt
    }
}

/// Dense row-major `(n+1) x (n+1)` one-attempt transition matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrix {
    size: usize,
    data: Vec<f64>,
}

impl TransitionMatrix {
    pub(crate) fn zeros(size: usize) -> Self {
        Self {
            size,
            data: vec![0.0; size * size],
        }
    }

    /// Matrix dimension, `n + 1`.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of transient states, `n`.
    pub fn transient_count(&self) -> usize {
        self.size - 1
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.size + col]
    }

    pub(crate) fn add(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.size + col] += value;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.size..(row + 1) * self.size]
    }

    /// Transient block `Q` (absorbing row and column dropped), row-major `n x n`.
    pub fn transient_block(&self) -> Vec<f64> {
        let n = self.transient_count();
        let mut q = Vec::with_capacity(n * n);
        for i in 0..n {
            q.extend_from_slice(&self.row(i)[..n]);
        }
        q
    }
}

/// Which path of the absorption solver produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveMethod {
    /// Direct inversion of `I - Q`.
    Inverse,
    /// Bounded sum of powers of `Q`.
    TruncatedSeries,
}

/// Expected attempts per transient level before absorption, unrounded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpectedVisits {
    pub visits: Vec<f64>,
    pub method: SolveMethod,
}

impl ExpectedVisits {
    /// Expected total attempts over the whole path.
    pub fn total(&self) -> f64 {
        self.visits.iter().sum()
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }
}

/// `N = (I - Q)^-1`, row-major `n x n`.
#[derive(Debug, Clone, PartialEq)]
pub struct FundamentalMatrix {
    pub(crate) n: usize,
    pub(crate) data: Vec<f64>,
    pub method: SolveMethod,
}

impl FundamentalMatrix {
    pub fn size(&self) -> usize {
        self.n
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.n..(row + 1) * self.n]
    }
}

/// Configuration for the absorption solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Highest power `K` summed by the fallback series.
    pub series_terms: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            series_terms: FALLBACK_SERIES_TERMS,
        }
    }
}

impl SolverConfig {
    /// Smaller series bound for quick checks.
    pub fn with_series_terms(series_terms: usize) -> Self {
        Self { series_terms }
    }
}
