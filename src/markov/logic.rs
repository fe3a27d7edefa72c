use super::types::*;
use tracing::{debug, warn};

/// Raised by the elimination when `I - Q` has no usable pivot. Never leaves
/// this module: the solver answers it with the truncated series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SingularSystem;

/// Build the `(n+1) x (n+1)` one-attempt transition matrix.
pub fn build_transition_matrix(config: &UpgradeConfiguration) -> TransitionMatrix {
    let n = config.len();
    let mut matrix = TransitionMatrix::zeros(n + 1);

    for (i, level) in config.levels().iter().enumerate() {
        let p = level.probability();
        let fail = 1.0 - p;
        matrix.add(i, i + 1, p);
        if config.stays_on_failure(i) {
            matrix.add(i, i, fail);
        } else {
            matrix.add(i, i - 1, fail);
        }
    }
    matrix.add(n, n, 1.0);

    matrix
}

/// Expected attempts per level starting from level 0.
pub fn solve_absorption(matrix: &TransitionMatrix, solver: &SolverConfig) -> ExpectedVisits {
    solve_absorption_from(matrix, 0, solver)
}

/// Expected attempts per level starting from `start` (clamped to the last
/// transient level).
pub fn solve_absorption_from(
    matrix: &TransitionMatrix,
    start: usize,
    solver: &SolverConfig,
) -> ExpectedVisits {
    let n = matrix.transient_count();
    let start = start.min(n.saturating_sub(1));
    let q = matrix.transient_block();

    match invert_identity_minus(&q, n) {
        Ok(inverse) => ExpectedVisits {
            visits: inverse[start * n..(start + 1) * n]
                .iter()
                .map(|v| v.max(0.0))
                .collect(),
            method: SolveMethod::Inverse,
        },
        Err(SingularSystem) => {
            debug!(n, start, terms = solver.series_terms, "I - Q singular, summing series");
            ExpectedVisits {
                visits: series_row(&q, n, start, solver.series_terms),
                method: SolveMethod::TruncatedSeries,
            }
        }
    }
}

/// Full fundamental matrix `N = (I - Q)^-1`, with the same fallback policy as
/// [`solve_absorption`].
pub fn fundamental_matrix(matrix: &TransitionMatrix, solver: &SolverConfig) -> FundamentalMatrix {
    let n = matrix.transient_count();
    let q = matrix.transient_block();

    match invert_identity_minus(&q, n) {
        Ok(inverse) => FundamentalMatrix {
            n,
            data: inverse.into_iter().map(|v| v.max(0.0)).collect(),
            method: SolveMethod::Inverse,
        },
        Err(SingularSystem) => {
            debug!(n, terms = solver.series_terms, "I - Q singular, summing full series");
            let mut data = Vec::with_capacity(n * n);
            for start in 0..n {
                data.extend(series_row(&q, n, start, solver.series_terms));
            }
            FundamentalMatrix {
                n,
                data,
                method: SolveMethod::TruncatedSeries,
            }
        }
    }
}

/// Gauss-Jordan inversion of `I - Q` with partial pivoting.
fn invert_identity_minus(q: &[f64], n: usize) -> Result<Vec<f64>, SingularSystem> {
    let width = 2 * n;
    let mut aug = vec![0.0_f64; n * width];
    for i in 0..n {
        for j in 0..n {
            let identity = if i == j { 1.0 } else { 0.0 };
            aug[i * width + j] = identity - q[i * n + j];
        }
        aug[i * width + n + i] = 1.0;
    }

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&a, &b| {
                aug[a * width + col]
                    .abs()
                    .total_cmp(&aug[b * width + col].abs())
            })
            .unwrap_or(col);
        if pivot_row != col {
            for j in 0..width {
                aug.swap(col * width + j, pivot_row * width + j);
            }
        }

        let pivot = aug[col * width + col];
        if !pivot.is_finite() || pivot.abs() < PIVOT_EPSILON {
            return Err(SingularSystem);
        }
        for j in 0..width {
            aug[col * width + j] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[row * width + col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..width {
                aug[row * width + j] -= factor * aug[col * width + j];
            }
        }
    }

    let mut inverse = Vec::with_capacity(n * n);
    for i in 0..n {
        inverse.extend_from_slice(&aug[i * width + n..(i + 1) * width]);
    }
    if inverse.iter().any(|v| !v.is_finite()) {
        return Err(SingularSystem);
    }
    Ok(inverse)
}

/// Row `start` of `sum_{k=0..=terms} Q^k`, accumulated as `e_start * Q^k`.
///
/// Every partial sum is bounded by `terms + 1` because `Q` is substochastic,
/// so the result stays finite; a non-finite step still stops the loop and
/// keeps the last finite sum.
fn series_row(q: &[f64], n: usize, start: usize, terms: usize) -> Vec<f64> {
    let mut acc = vec![0.0_f64; n];
    let mut term = vec![0.0_f64; n];
    let mut next = vec![0.0_f64; n];
    term[start] = 1.0;

    for k in 0..=terms {
        if acc.iter().zip(&term).any(|(a, t)| !(a + t).is_finite()) {
            warn!(k, "series diverged to a non-finite value, truncating");
            break;
        }
        for (a, t) in acc.iter_mut().zip(&term) {
            *a += t;
        }
        if term.iter().all(|&t| t == 0.0) {
            break;
        }

        next.iter_mut().for_each(|v| *v = 0.0);
        for (i, &t) in term.iter().enumerate() {
            if t == 0.0 {
                continue;
            }
            for (j, v) in next.iter_mut().enumerate() {
                *v += t * q[i * n + j];
            }
        }
        std::mem::swap(&mut term, &mut next);
    }

    acc
}
