//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Two entities are the same entity when their identifiers are equal, regardless of
/// any other state they carry.
pub trait Entity {
    /// Identifier type (e.g. a batch reference).
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Identity comparison (ignores every field except the identifier).
    fn same_identity_as(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
