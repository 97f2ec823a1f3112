
use allocation_core::{DomainError, DomainResult, ValueObject};

/// Value object: a request to allocate `qty` units of `sku` for an order.
///
/// Equality and hashing cover all three fields, so two lines with identical fields are
/// interchangeable (a batch holding one "already holds" the other).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderLine {
    order_id: String,
    sku: String,
    qty: u32,
}

impl OrderLine {
    pub fn new(
        order_id: impl Into<String>,
        sku: impl Into<String>,
        qty: u32,
    ) -> DomainResult<Self> {
        let order_id = order_id.into();
        let sku = sku.into();

        if order_id.trim().is_empty() {
            return Err(DomainError::validation("order_id cannot be empty"));
        }
        if sku.trim().is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if qty == 0 {
            return Err(DomainError::validation("quantity must be greater than zero"));
        }

        Ok(Self { order_id, sku, qty })
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn qty(&self) -> u32 {
        self.qty
    }
}

impl ValueObject for OrderLine {}

impl core::fmt::Display for OrderLine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}x{}", self.order_id, self.sku, self.qty)
    }
}
