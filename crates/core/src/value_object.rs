//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity** - they are defined entirely by their
//! attribute values. Two value objects with the same values are equal.

/// Marker trait for value objects.
///
/// - **Value Object**: no identity (an [`Email`](crate::Email) is just its normalized text)
/// - **Entity**: has identity (two users with the same id are the same user)
///
/// Value objects are immutable; to "modify" one, build a new one. Construction
/// is where validation and normalization happen, so any instance in hand is
/// already valid.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
