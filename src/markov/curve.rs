//! Cumulative completion probability by number of attempts.

use super::types::TransitionMatrix;
use serde::Serialize;

/// Default cap on the number of attempts plotted.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10_000;

/// The curve stops once the cumulative probability passes this percentage.
pub const COMPLETION_CUTOFF_PERCENT: f64 = 99.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompletionPoint {
    pub attempts: usize,
    /// Probability, in percent, that the item is complete after `attempts`.
    pub cumulative_percent: f64,
}

/// Probability of having reached the last level after each attempt count,
/// starting at `start`.
///
/// The chance of finishing on exactly attempt `k` is the mass sitting on the
/// last transient level after `k - 1` attempts times that level's success
/// probability.
pub fn completion_curve(
    matrix: &TransitionMatrix,
    start: usize,
    max_attempts: usize,
) -> Vec<CompletionPoint> {
    let n = matrix.transient_count();
    if n == 0 {
        return Vec::new();
    }
    let q = matrix.transient_block();
    let last = n - 1;
    let finish = matrix.get(last, n);

    let mut distribution = vec![0.0_f64; n];
    distribution[start.min(last)] = 1.0;
    let mut next = vec![0.0_f64; n];
    let mut cumulative = 0.0_f64;
    let mut points = Vec::new();

    for attempts in 1..=max_attempts {
        cumulative += distribution[last] * finish * 100.0;
        points.push(CompletionPoint {
            attempts,
            cumulative_percent: cumulative,
        });
        if cumulative > COMPLETION_CUTOFF_PERCENT {
            break;
        }

        next.iter_mut().for_each(|v| *v = 0.0);
        for (i, &mass) in distribution.iter().enumerate() {
            if mass == 0.0 {
                continue;
            }
            for (j, v) in next.iter_mut().enumerate() {
                *v += mass * q[i * n + j];
            }
        }
        std::mem::swap(&mut distribution, &mut next);
    }

    points
}

/// Fewest attempts after which completion probability reaches `percent`.
pub fn attempts_for_confidence(points: &[CompletionPoint], percent: f64) -> Option<usize> {
    points
        .iter()
        .find(|p| p.cumulative_percent >= percent)
        .map(|p| p.attempts)
}
