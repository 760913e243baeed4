//! Per-call snapshot options.

use std::any::TypeId;

use engine_world::{Component, Resource};

/// Fastest gzip compression.
pub const BEST_SPEED: u32 = 1;
/// Smallest gzip output.
pub const BEST_COMPRESSION: u32 = 9;
/// The gzip default trade-off.
pub const DEFAULT_COMPRESSION: u32 = 6;

/// A type named by a skip option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SkippedType {
    pub type_id: TypeId,
    pub name: &'static str,
}

/// Options controlling what a [`serialize`](crate::serialize()) or
/// [`deserialize`](crate::deserialize()) call includes.
///
/// Options compose; where two overlap, the broader one wins
/// (`skip_entities` implies `skip_all_components`). Pass the same
/// compression and skip options to both sides of a round trip.
///
/// ```rust
/// use engine_snapshot::SerdeOptions;
///
/// let options = SerdeOptions::new().compress().skip_all_resources();
/// assert!(options.is_compressed());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SerdeOptions {
    pub(crate) skip_all_resources: bool,
    pub(crate) skip_all_components: bool,
    pub(crate) skip_entities: bool,
    pub(crate) compression: Option<u32>,
    pub(crate) skip_components: Vec<SkippedType>,
    pub(crate) skip_resources: Vec<SkippedType>,
}

impl SerdeOptions {
    /// Options that include everything, uncompressed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gzip the document at [`DEFAULT_COMPRESSION`].
    #[must_use]
    pub fn compress(self) -> Self {
        self.compress_level(DEFAULT_COMPRESSION)
    }

    /// Gzip the document at `level` (`0..=9`).
    #[must_use]
    pub fn compress_level(mut self, level: u32) -> Self {
        self.compression = Some(level);
        self
    }

    /// Skip every resource.
    #[must_use]
    pub fn skip_all_resources(mut self) -> Self {
        self.skip_all_resources = true;
        self
    }

    /// Skip every component. Entities are still written and restored.
    #[must_use]
    pub fn skip_all_components(mut self) -> Self {
        self.skip_all_components = true;
        self
    }

    /// Skip entities, and with them all components and relations.
    #[must_use]
    pub fn skip_entities(mut self) -> Self {
        self.skip_entities = true;
        self
    }

    /// Skip component type `T`. When deserialising, `T` must still be
    /// registered.
    #[must_use]
    pub fn skip_component<T: Component>(mut self) -> Self {
        self.skip_components.push(SkippedType {
            type_id: TypeId::of::<T>(),
            name: <T as Component>::type_name(),
        });
        self
    }

    /// Skip resource type `T`. When deserialising, `T` must still be
    /// registered.
    #[must_use]
    pub fn skip_resource<T: Resource>(mut self) -> Self {
        self.skip_resources.push(SkippedType {
            type_id: TypeId::of::<T>(),
            name: <T as Resource>::type_name(),
        });
        self
    }

    /// Returns `true` if compression is enabled.
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.compression.is_some()
    }

    /// Returns the compression level, if compression is enabled.
    #[must_use]
    pub fn compression_level(&self) -> Option<u32> {
        self.compression
    }
}
