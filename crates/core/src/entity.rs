//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Accounts keep their identity while their name and balance change; stores
/// key them by this id.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
