//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Users and workshops are entities: two records with the same id are the
/// same user/workshop even when every other field differs.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Whether `other` denotes the same entity (identity, not value equality).
    fn same_identity_as(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
