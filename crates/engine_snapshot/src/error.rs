//! Snapshot error types.

use engine_world::{Entity, WorldError};

/// Which id space a type name was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Component,
    Resource,
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Component => f.write_str("component"),
            Self::Resource => f.write_str("resource"),
        }
    }
}

/// Where in the document a payload was being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    /// Record `position` of the `Components` section, belonging to `entity`.
    Entity { position: usize, entity: Entity },
    /// The `Resources` section.
    Resource,
}

impl std::fmt::Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entity { position, entity } => write!(f, "entity #{position} ({entity})"),
            Self::Resource => f.write_str("resources"),
        }
    }
}

/// Errors that can occur while serialising or deserialising a world.
///
/// Every variant is fatal for the call that produced it. A failed
/// [`deserialize`](crate::deserialize()) may leave the target world partially
/// populated; discard or [`reset`](engine_world::World::reset) it.
#[derive(Debug, thiserror::Error)]
pub enum SerdeError {
    /// The input is not a structurally valid snapshot document.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// A type name has no registration in the world.
    #[error("{kind} type is not registered: {name}")]
    UnregisteredType { kind: TypeKind, name: String },

    /// The number of component records differs from the number of alive
    /// entities.
    #[error("found components for {records} entities, but world has {alive} alive entities")]
    EntityCountMismatch { records: usize, alive: usize },

    /// The target world already allocated entities.
    #[error("target world must be empty, but {0} entities have been allocated")]
    InvalidTargetState(usize),

    /// A registered resource has no slot to decode into.
    #[error("resource type registered but not initialized: {0}")]
    ResourceNotInitialized(String),

    /// A payload does not match the shape of its resolved type.
    #[error("cannot decode {type_name} at {site}: {source}")]
    FieldDecode {
        site: Site,
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be encoded.
    #[error("cannot encode {type_name} at {site}: {source}")]
    FieldEncode {
        site: Site,
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    /// Decompression failed.
    #[error("corrupt compressed stream: {0}")]
    CorruptStream(#[source] std::io::Error),

    /// Compression level outside `0..=9`.
    #[error("invalid compression level {0}, expected 0..=9")]
    InvalidCompressionLevel(u32),

    /// Compression failed while writing.
    #[error("compression failed: {0}")]
    Compress(#[source] std::io::Error),

    /// The world rejected a mutation.
    #[error(transparent)]
    World(#[from] WorldError),
}

impl SerdeError {
    pub(crate) fn unregistered_component(name: impl Into<String>) -> Self {
        Self::UnregisteredType {
            kind: TypeKind::Component,
            name: name.into(),
        }
    }

    pub(crate) fn unregistered_resource(name: impl Into<String>) -> Self {
        Self::UnregisteredType {
            kind: TypeKind::Resource,
            name: name.into(),
        }
    }
}
