//! # engine_world
//!
//! The in-process ECS world that snapshots are taken from and restored into.
//!
//! This crate provides:
//!
//! - [`Entity`]: generational `(index, generation)` identifiers.
//! - [`EntityPool`] / [`EntityDump`]: slot recycling and its restorable
//!   bookkeeping state.
//! - [`Component`] / [`Resource`] traits and their type-erased capability
//!   bundles ([`ComponentInfo`], [`ResourceInfo`]).
//! - [`TypeRegistry`]: stable name ↔ type ↔ dense id resolution.
//! - [`ArchetypeTable`]: storage grouped by component combination, with
//!   per-row relation targets.
//! - [`World`]: the façade tying it together.

pub mod archetype;
pub mod component;
pub mod entity;
pub mod error;
pub mod registry;
pub mod world;

pub use archetype::{ArchetypeId, ArchetypeTable, Column};
pub use component::{
    BoxedValue, Component, ComponentId, ComponentInfo, MAX_TYPES, Resource, ResourceId,
    ResourceInfo,
};
pub use entity::{Entity, EntityDump, EntityPool};
pub use error::WorldError;
pub use registry::TypeRegistry;
pub use world::World;
