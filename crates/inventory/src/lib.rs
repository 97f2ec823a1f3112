//! Inventory domain module: stock batches, order lines and the allocation rule.
//!
//! This crate contains business rules for allocation, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod allocation;
pub mod batch;
pub mod order_line;

pub use allocation::{allocate, is_valid_sku};
pub use batch::Batch;
pub use order_line::OrderLine;
