//! Upways - Expected Cost of Multi-Level Item Refinement
//!
//! Models a +0 to +N refine as an absorbing Markov chain, solves it for the
//! expected attempts per level and searches every choice of refine method
//! for the cheapest path.

pub mod build_info;
pub mod cost;
pub mod error;
pub mod markov;
pub mod methods;
pub mod optimizer;
pub mod persistence;
pub mod pipeline;
pub mod report;
pub mod simulator;

pub use error::{Result, UpgradeError};
