//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Stock units are entities: two units of the same variant are interchangeable
/// for reservation purposes but remain distinct records in the ledger.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
