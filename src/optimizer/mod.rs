//! Cheapest assignment of refine methods to levels.
//!
//! Every combination of the free levels' methods is evaluated (matrix build,
//! absorption, cost) and the lowest expected total cost wins. Candidates are
//! numbered in a fixed enumeration order and ties go to the lower number, in
//! serial and parallel runs alike.

pub mod enumerate;
pub mod logic;
pub mod types;

pub use enumerate::{candidate_count, decode, AssignmentOdometer};
pub use logic::*;
pub use types::*;
