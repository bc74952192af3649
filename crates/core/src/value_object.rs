//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity and are compared by their attribute values.
/// In this workspace that covers bin codes, size classes and allocation
/// decisions: two decisions naming the same bin, reason and overflow are the
/// same decision regardless of when they were produced.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
