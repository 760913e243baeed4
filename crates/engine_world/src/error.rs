//! World-level error types.

use crate::entity::Entity;

/// Errors raised by [`World`](crate::World) mutations and entity pool
/// bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The entity is dead, stale, or was never allocated.
    #[error("entity {0} is not alive")]
    EntityNotAlive(Entity),

    /// No component type is registered under this name or id.
    #[error("component type is not registered: {0}")]
    UnregisteredComponent(String),

    /// No resource type is registered under this name or id.
    #[error("resource type is not registered: {0}")]
    UnregisteredResource(String),

    /// A relation operation was attempted on a plain component.
    #[error("component type is not a relation: {0}")]
    NotARelation(&'static str),

    /// The entity does not carry the component.
    #[error("entity {entity} has no component {component}")]
    ComponentMissing {
        entity: Entity,
        component: &'static str,
    },

    /// The component is attached but its value was never assigned.
    #[error("component {component} of entity {entity} has no value")]
    ComponentUnassigned {
        entity: Entity,
        component: &'static str,
    },

    /// A boxed value was handed to a column of a different type.
    #[error("value does not match type {0}")]
    TypeMismatch(&'static str),

    /// The dense id space is exhausted.
    #[error("cannot register {0}: type limit of {max} reached", max = crate::MAX_TYPES)]
    TooManyTypes(&'static str),

    /// Two distinct Rust types reported the same stable name.
    #[error("type name {0} is already registered for a different type")]
    DuplicateName(&'static str),

    /// The entity pool has been used already.
    #[error("world is not empty: {0} entities have been allocated")]
    NotEmpty(usize),

    /// An [`EntityDump`](crate::EntityDump) is internally inconsistent.
    #[error("invalid entity dump: {0}")]
    InvalidEntityDump(String),
}
