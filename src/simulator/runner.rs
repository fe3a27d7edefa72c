//! Monte Carlo runner: refines simulated items attempt by attempt.

use super::config::SimConfig;
use super::report::{RunStats, SimReport};
use crate::markov::UpgradeConfiguration;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Attempt to refine an item sitting on `current` (0-based). Returns the
/// level after the attempt. A complete item (`current >= n`) stays put.
pub fn attempt_upgrade<R: Rng>(
    config: &UpgradeConfiguration,
    current: usize,
    rng: &mut R,
) -> usize {
    let Some(&level) = config.levels().get(current) else {
        return current;
    };
    if rng.gen::<f64>() < level.probability() {
        current + 1
    } else if config.stays_on_failure(current) {
        current
    } else {
        current - 1
    }
}

/// Refine one item from +0 until complete or out of attempts.
pub fn simulate_single_run<R: Rng>(
    config: &UpgradeConfiguration,
    max_attempts: u64,
    rng: &mut R,
) -> RunStats {
    simulate_run_from(config, 0, max_attempts, rng)
}

/// Refine one item already on `start` until complete or out of attempts.
pub fn simulate_run_from<R: Rng>(
    config: &UpgradeConfiguration,
    start: usize,
    max_attempts: u64,
    rng: &mut R,
) -> RunStats {
    let n = config.len();
    let mut attempts_per_level = vec![0u64; n];
    let mut current = start.min(n);
    let mut total_attempts = 0u64;

    while current < n && total_attempts < max_attempts {
        attempts_per_level[current] += 1;
        total_attempts += 1;
        current = attempt_upgrade(config, current, rng);
    }

    RunStats {
        attempts_per_level,
        total_attempts,
        completed: current == n,
    }
}

/// Run the full simulation and return a report.
pub fn run_simulation(config: &SimConfig, path: &UpgradeConfiguration) -> SimReport {
    let mut all_runs = Vec::with_capacity(config.num_runs as usize);

    for run_idx in 0..config.num_runs {
        // Create RNG for this run
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(run_idx as u64)),
            None => ChaCha8Rng::from_entropy(),
        };
        all_runs.push(simulate_run_from(
            path,
            config.start_level,
            config.max_attempts_per_run,
            &mut rng,
        ));
    }

    let report = SimReport::from_runs(all_runs, path.len(), config.keep_runs);
    debug!(
        runs = report.num_runs,
        completed = report.runs_completed,
        timed_out = report.runs_timed_out,
        avg_total = report.avg_total_attempts,
        "simulation finished"
    );
    report
}
