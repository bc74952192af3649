//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Bins are entities keyed by their bin code; inventory units by their unit id.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
