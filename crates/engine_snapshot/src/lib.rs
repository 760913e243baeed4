//! # engine_snapshot
//!
//! JSON snapshots of an [`engine_world::World`]: the entity pool, every
//! entity's components and relation targets, and the world's resources,
//! optionally gzipped.
//!
//! This crate provides:
//!
//! - [`serialize()`] / [`deserialize()`]: the two entry points.
//! - [`options`]: per-call [`SerdeOptions`] (compression, skip lists).
//! - [`filter`]: the per-call [`InclusionFilter`].
//! - [`entities`], [`components`], [`resources`]: the section codecs.
//! - [`document`]: the document structure with opaque payloads.
//! - [`compress`]: gzip helpers.
//! - [`error`]: [`SerdeError`].
//!
//! ```rust
//! use engine_snapshot::{SerdeOptions, deserialize, serialize};
//! use engine_world::{Component, Resource, World};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Position { x: f64, y: f64 }
//! impl Component for Position {}
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Turn(u32);
//! impl Resource for Turn {}
//!
//! let mut source = World::new();
//! let e = source.spawn_with(Position { x: 1.0, y: 2.0 }).unwrap();
//! source.add_resource(Turn(12)).unwrap();
//!
//! let bytes = serialize(&source, &SerdeOptions::new().compress()).unwrap();
//!
//! let mut target = World::new();
//! target.register_component::<Position>().unwrap();
//! target.add_resource(Turn(0)).unwrap();
//! deserialize(&bytes, &mut target, &SerdeOptions::new().compress()).unwrap();
//!
//! assert_eq!(target.get::<Position>(e), Some(&Position { x: 1.0, y: 2.0 }));
//! assert_eq!(target.resource::<Turn>(), Some(&Turn(12)));
//! ```

pub mod components;
pub mod compress;
pub mod deserialize;
pub mod document;
pub mod entities;
pub mod error;
pub mod filter;
pub mod options;
pub mod resources;
pub mod serialize;

pub use deserialize::deserialize;
pub use document::{Document, PayloadMap, RELATION_TARGET_SUFFIX};
pub use error::{SerdeError, Site, TypeKind};
pub use filter::InclusionFilter;
pub use options::{BEST_COMPRESSION, BEST_SPEED, DEFAULT_COMPRESSION, SerdeOptions};
pub use serialize::serialize;
