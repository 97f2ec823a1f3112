//! Allocation rule: which batch receives an order line.
//!
//! Pure functions over in-memory batches. Absence of a suitable batch is reported as
//! `None`; turning that into a business failure is the caller's job.

use crate::batch::Batch;
use crate::order_line::OrderLine;

/// Allocate `line` to the highest-priority batch that can take it.
///
/// Batches are sorted in place by [`Batch::cmp_priority`] (stable, so equal-priority
/// batches keep their input order), then scanned first-fit. The chosen batch is
/// mutated and its reference returned.
pub fn allocate(line: &OrderLine, batches: &mut [Batch]) -> Option<String> {
    batches.sort_by(Batch::cmp_priority);

    let batch = batches.iter_mut().find(|b| b.can_allocate(line))?;
    batch.allocate(line.clone());
    Some(batch.reference().to_string())
}

/// True iff at least one batch stocks `sku`.
///
/// Distinguishes "no such product" from "product exists but is out of stock".
pub fn is_valid_sku(sku: &str, batches: &[Batch]) -> bool {
    batches.iter().any(|b| b.sku() == sku)
}
