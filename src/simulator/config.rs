//! Simulation configuration.

/// Configuration for a Monte Carlo run of a refine path.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of items refined from +0 to the top
    pub num_runs: u32,

    /// Random seed for reproducibility (None = random)
    pub seed: Option<u64>,

    /// Attempts allowed per item before the run counts as timed out
    pub max_attempts_per_run: u64,

    /// Keep per-run stats in the report
    pub keep_runs: bool,

    /// Level every simulated item starts on
    pub start_level: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_runs: 10_000,
            seed: None,
            max_attempts_per_run: 1_000_000,
            keep_runs: false,
            start_level: 0,
        }
    }
}

impl SimConfig {
    /// Quick seeded check
    pub fn quick(seed: u64) -> Self {
        Self {
            num_runs: 1_000,
            seed: Some(seed),
            ..Default::default()
        }
    }

    /// Enough runs to compare against the analytical figures
    pub fn cross_check(seed: u64) -> Self {
        Self {
            num_runs: 20_000,
            seed: Some(seed),
            ..Default::default()
        }
    }
}
