//! Identity of the things moderation acts on.

/// Anything with a stable id that can appear in an audit record.
///
/// Moderated resources (comments, events, users) are owned by the CRUD layer;
/// this core only needs their identity.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;

    /// Short, stable type tag used in audit records (e.g. `"comment"`).
    fn entity_type(&self) -> &'static str;
}
