//! Monte Carlo simulator for refine paths.
//!
//! Refines thousands of simulated items attempt by attempt to check the
//! analytical expectations:
//! - Attempts spent on each level
//! - Spread of total attempts (min, median, max)
//! - Paths that never complete (timed-out runs)

mod config;
mod report;
mod runner;

pub use config::SimConfig;
pub use report::{RunStats, SimReport};
pub use runner::{attempt_upgrade, run_simulation, simulate_run_from, simulate_single_run};
