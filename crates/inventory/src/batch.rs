use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDate;

use allocation_core::{DomainError, DomainResult, Entity};

use crate::order_line::OrderLine;

/// Entity: a purchased lot of stock for one SKU.
///
/// Identity is the `reference` alone. Two `Batch` values with the same reference are
/// the same batch even if their other fields differ.
///
/// Quantities are never stored directly: `allocated_quantity` and
/// `available_quantity` are derived from the allocation set on every read, so
/// `available = purchased - sum(allocated line qty)` holds by construction.
#[derive(Debug, Clone)]
pub struct Batch {
    reference: String,
    sku: String,
    purchased_quantity: u32,
    eta: Option<NaiveDate>,
    allocations: HashSet<OrderLine>,
    /// Storage revision this instance was loaded at (0 for never-persisted batches).
    version: u64,
}

impl Batch {
    /// Register a new batch with no allocations.
    ///
    /// `eta == None` means the stock is already in the warehouse.
    pub fn new(
        reference: impl Into<String>,
        sku: impl Into<String>,
        purchased_quantity: u32,
        eta: Option<NaiveDate>,
    ) -> DomainResult<Self> {
        let reference = reference.into();
        let sku = sku.into();

        if reference.trim().is_empty() {
            return Err(DomainError::validation("reference cannot be empty"));
        }
        if sku.trim().is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if purchased_quantity == 0 {
            return Err(DomainError::validation("quantity must be greater than zero"));
        }

        Ok(Self {
            reference,
            sku,
            purchased_quantity,
            eta,
            allocations: HashSet::new(),
            version: 0,
        })
    }

    /// Rehydrate a batch from storage.
    ///
    /// Rejects stored state that breaks the batch invariants instead of trusting it.
    pub fn restore(
        reference: impl Into<String>,
        sku: impl Into<String>,
        purchased_quantity: u32,
        eta: Option<NaiveDate>,
        allocations: impl IntoIterator<Item = OrderLine>,
        version: u64,
    ) -> DomainResult<Self> {
        let mut batch = Self::new(reference, sku, purchased_quantity, eta)?;
        batch.version = version;

        for line in allocations {
            if line.sku() != batch.sku {
                return Err(DomainError::invariant(format!(
                    "batch {} holds a line for sku {} (batch sku {})",
                    batch.reference,
                    line.sku(),
                    batch.sku
                )));
            }
            batch.allocations.insert(line);
        }

        let allocated: u64 = batch.allocations.iter().map(|l| u64::from(l.qty())).sum();
        if allocated > u64::from(batch.purchased_quantity) {
            return Err(DomainError::invariant(format!(
                "batch {} over-allocated: {allocated} > {}",
                batch.reference, batch.purchased_quantity
            )));
        }

        Ok(batch)
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn eta(&self) -> Option<NaiveDate> {
        self.eta
    }

    pub fn purchased_quantity(&self) -> u32 {
        self.purchased_quantity
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn allocations(&self) -> impl Iterator<Item = &OrderLine> {
        self.allocations.iter()
    }

    pub fn is_allocated(&self, line: &OrderLine) -> bool {
        self.allocations.contains(line)
    }

    pub fn allocated_quantity(&self) -> u32 {
        self.allocations.iter().map(OrderLine::qty).sum()
    }

    pub fn available_quantity(&self) -> u32 {
        self.purchased_quantity - self.allocated_quantity()
    }

    /// True iff the SKUs match and enough stock remains.
    pub fn can_allocate(&self, line: &OrderLine) -> bool {
        self.sku == line.sku() && self.available_quantity() >= line.qty()
    }

    /// Allocate `line` to this batch if it fits.
    ///
    /// Re-allocating an equal line is a no-op. Returns whether the allocation set
    /// changed.
    pub fn allocate(&mut self, line: OrderLine) -> bool {
        if self.is_allocated(&line) || !self.can_allocate(&line) {
            return false;
        }
        self.allocations.insert(line)
    }

    /// Remove `line` if it was allocated here; no-op otherwise.
    pub fn deallocate(&mut self, line: &OrderLine) -> bool {
        self.allocations.remove(line)
    }

    /// Allocation priority: batches without an ETA (in the warehouse) come first,
    /// then dated batches by earliest ETA.
    ///
    /// This is deliberately not an `Ord` impl: two distinct batches can share a
    /// priority, which would contradict reference-based equality.
    pub fn cmp_priority(&self, other: &Self) -> Ordering {
        match (self.eta, other.eta) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(&b),
        }
    }

    /// Strictly higher allocation priority than `other`.
    pub fn is_preferred_over(&self, other: &Self) -> bool {
        self.cmp_priority(other) == Ordering::Less
    }
}

impl Entity for Batch {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.reference
    }
}

impl PartialEq for Batch {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity_as(other)
    }
}

impl Eq for Batch {}

impl core::hash::Hash for Batch {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.reference.hash(state);
    }
}
