//! Core [`Component`] and [`Resource`] traits and their type-erased
//! capability bundles.
//!
//! Every type stored in a [`World`](crate::World) is registered once. The
//! registration captures a small bundle of function pointers
//! ([`ComponentInfo`], [`ResourceInfo`]) that encode and decode values of
//! that type without the caller knowing the concrete type. Codecs only ever
//! go through these bundles.
//!
//! ## Stable names
//!
//! A type's stable name defaults to [`std::any::type_name`], which is fully
//! qualified and distinct per generic instantiation (`Grid<i32>` and
//! `Grid<f32>` never collide). Names must be identical in the writing and
//! the reading process; override `type_name` to pin a name that survives
//! module moves or compiler upgrades.

use std::any::{Any, TypeId};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;

/// Upper bound on registered component types, and separately on resource
/// types. Ids are dense in `0..MAX_TYPES`.
pub const MAX_TYPES: usize = 256;

/// A type-erased, owned component or resource value.
pub type BoxedValue = Box<dyn Any + Send + Sync>;

/// Encode a type-erased value to raw JSON.
pub type EncodeFn = fn(&dyn Any) -> serde_json::Result<Box<RawValue>>;

/// Decode raw JSON into a fresh type-erased value.
pub type DecodeFn = fn(&RawValue) -> serde_json::Result<BoxedValue>;

/// Decode raw JSON over an existing value, in place.
pub type DecodeIntoFn = fn(&RawValue, &mut dyn Any) -> serde_json::Result<()>;

/// Dense identifier of a registered component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u8);

impl ComponentId {
    /// Index into dense per-type tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// Dense identifier of a registered resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u8);

impl ResourceId {
    /// Index into dense per-type tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "resource#{}", self.0)
    }
}

/// The core component trait.
///
/// # Examples
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use engine_world::Component;
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {}
///
/// /// Points at the parent entity through the relation target.
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct ChildOf;
///
/// impl Component for ChildOf {
///     fn is_relation() -> bool {
///         true
///     }
/// }
/// ```
pub trait Component: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The stable name used to identify this type in snapshots.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Relation components carry a target [`Entity`](crate::Entity) per
    /// instance, stored next to the component value.
    fn is_relation() -> bool {
        false
    }
}

/// The core resource trait. Resources are world-global singletons.
pub trait Resource: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The stable name used to identify this type in snapshots.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Capability bundle of a registered component type.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    /// Dense id.
    pub id: ComponentId,
    /// Stable name.
    pub name: &'static str,
    /// Rust type identity.
    pub type_id: TypeId,
    /// Whether instances carry a relation target.
    pub is_relation: bool,
    /// Encoder.
    pub encode: EncodeFn,
    /// Decoder producing a fresh value.
    pub decode: DecodeFn,
}

impl ComponentInfo {
    /// Build the bundle for `T` under the given id.
    #[must_use]
    pub fn of<T: Component>(id: ComponentId) -> Self {
        Self {
            id,
            name: T::type_name(),
            type_id: TypeId::of::<T>(),
            is_relation: T::is_relation(),
            encode: encode_erased::<T>,
            decode: decode_erased::<T>,
        }
    }
}

/// Capability bundle of a registered resource type.
#[derive(Debug, Clone)]
pub struct ResourceInfo {
    /// Dense id.
    pub id: ResourceId,
    /// Stable name.
    pub name: &'static str,
    /// Rust type identity.
    pub type_id: TypeId,
    /// Encoder.
    pub encode: EncodeFn,
    /// In-place decoder; overwrites the existing resource value.
    pub decode_into: DecodeIntoFn,
}

impl ResourceInfo {
    /// Build the bundle for `T` under the given id.
    #[must_use]
    pub fn of<T: Resource>(id: ResourceId) -> Self {
        Self {
            id,
            name: T::type_name(),
            type_id: TypeId::of::<T>(),
            encode: encode_erased::<T>,
            decode_into: decode_into_erased::<T>,
        }
    }
}

fn type_error<T>() -> serde_json::Error {
    <serde_json::Error as serde::ser::Error>::custom(format!(
        "value is not a {}",
        std::any::type_name::<T>()
    ))
}

fn encode_erased<T: Serialize + 'static>(value: &dyn Any) -> serde_json::Result<Box<RawValue>> {
    let value = value.downcast_ref::<T>().ok_or_else(type_error::<T>)?;
    serde_json::value::to_raw_value(value)
}

fn decode_erased<T: DeserializeOwned + Send + Sync + 'static>(
    raw: &RawValue,
) -> serde_json::Result<BoxedValue> {
    let value: T = serde_json::from_str(raw.get())?;
    Ok(Box::new(value))
}

fn decode_into_erased<T: DeserializeOwned + 'static>(
    raw: &RawValue,
    slot: &mut dyn Any,
) -> serde_json::Result<()> {
    let slot = slot.downcast_mut::<T>().ok_or_else(type_error::<T>)?;
    *slot = serde_json::from_str(raw.get())?;
    Ok(())
}
