//! Absorbing Markov chain model of a refine path.
//!
//! Levels `0..n` are transient, level `n` (fully refined) absorbs. A success
//! moves one level up; a failure stays put on level 0 and on downgrade-exempt
//! levels, and drops one level everywhere else.

pub mod curve;
pub mod dispersion;
pub mod logic;
pub mod types;

pub use curve::{
    attempts_for_confidence, completion_curve, CompletionPoint, COMPLETION_CUTOFF_PERCENT,
    DEFAULT_MAX_ATTEMPTS,
};
pub use dispersion::{dispersion, Dispersion, Interval, LevelSpread, RiskLevel, TotalSpread};
pub use logic::*;
pub use types::*;
