//! Data models referenced by orders

pub mod dining_table;

pub use dining_table::{DiningTable, TableOccupancy};
