//! Simulation report generation.

use crate::markov::ExpectedVisits;
use serde::Serialize;

/// Outcome of refining one simulated item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStats {
    pub attempts_per_level: Vec<u64>,
    pub total_attempts: u64,
    pub completed: bool,
}

/// Aggregated results from multiple simulation runs.
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub num_runs: u32,
    pub runs_completed: u32,
    pub runs_timed_out: u32,

    // Aggregated stats
    pub avg_attempts_per_level: Vec<f64>,
    pub avg_total_attempts: f64,
    pub min_total_attempts: u64,
    pub max_total_attempts: u64,
    pub median_total_attempts: u64,

    // Individual run stats, only when requested
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub run_stats: Vec<RunStats>,
}

impl SimReport {
    /// Create a new report from completed run stats.
    pub fn from_runs(runs: Vec<RunStats>, levels: usize, keep_runs: bool) -> Self {
        let num_runs = runs.len() as u32;
        let runs_completed = runs.iter().filter(|r| r.completed).count() as u32;
        let divisor = num_runs.max(1) as f64;

        let mut avg_attempts_per_level = vec![0.0_f64; levels];
        for run in &runs {
            for (avg, &count) in avg_attempts_per_level.iter_mut().zip(&run.attempts_per_level) {
                *avg += count as f64;
            }
        }
        avg_attempts_per_level.iter_mut().for_each(|v| *v /= divisor);

        let avg_total_attempts =
            runs.iter().map(|r| r.total_attempts as f64).sum::<f64>() / divisor;

        let mut totals: Vec<u64> = runs.iter().map(|r| r.total_attempts).collect();
        totals.sort_unstable();

        Self {
            num_runs,
            runs_completed,
            runs_timed_out: num_runs - runs_completed,
            avg_attempts_per_level,
            avg_total_attempts,
            min_total_attempts: totals.first().copied().unwrap_or(0),
            max_total_attempts: totals.last().copied().unwrap_or(0),
            median_total_attempts: totals.get(totals.len() / 2).copied().unwrap_or(0),
            run_stats: if keep_runs { runs } else { Vec::new() },
        }
    }

    /// Largest relative gap between simulated and analytical attempts per
    /// level. Levels expected to take no attempts are skipped.
    pub fn max_relative_error(&self, expected: &ExpectedVisits) -> f64 {
        self.avg_attempts_per_level
            .iter()
            .zip(&expected.visits)
            .filter(|(_, e)| **e > 0.0)
            .map(|(&s, &e)| ((s - e) / e).abs())
            .fold(0.0, f64::max)
    }

    pub fn completion_rate(&self) -> f64 {
        if self.num_runs == 0 {
            return 0.0;
        }
        self.runs_completed as f64 / self.num_runs as f64
    }
}
