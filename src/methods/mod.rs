//! Refine methods (scrolls, stones, manuals) and the item data they read.

pub mod catalog;
pub mod data;
pub mod types;

pub use catalog::*;
pub use data::{find_item, load_item_data, ItemData};
pub use types::*;
