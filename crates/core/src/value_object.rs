//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**; they are defined entirely by their attribute
//! values. Two value objects with the same values are interchangeable.

/// Marker trait for value objects.
///
/// - **Value Object**: no identity (two order lines with the same fields are equal)
/// - **Entity**: has identity (two batches with the same reference are the same batch)
///
/// Value objects are immutable: to "modify" one, build a new one. `Eq + Hash` are
/// required so they can be used as set members and map keys.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// struct Quantity(u32);
///
/// impl ValueObject for Quantity {}
/// ```
pub trait ValueObject: Clone + Eq + core::hash::Hash + core::fmt::Debug {}
