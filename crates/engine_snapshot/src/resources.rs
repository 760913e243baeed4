//! Resource codec.

use engine_world::{ResourceId, World};
use serde_json::value::RawValue;
use tracing::{debug, warn};

use crate::document::PayloadMap;
use crate::error::{SerdeError, Site};
use crate::filter::InclusionFilter;

/// Encode every included resource that has a value.
///
/// # Errors
///
/// Returns [`SerdeError::FieldEncode`] if a value fails to encode.
pub fn serialize(world: &World, filter: &InclusionFilter) -> Result<PayloadMap, SerdeError> {
    let mut map = PayloadMap::new();
    if filter.all_resources_skipped() {
        return Ok(map);
    }

    for info in world.registry().resources() {
        if filter.resource_excluded(info.id) {
            continue;
        }
        let Some(value) = world.resource_raw(info.id) else {
            continue;
        };
        let raw = (info.encode)(value).map_err(|source| SerdeError::FieldEncode {
            site: Site::Resource,
            type_name: info.name.to_string(),
            source,
        })?;
        map.insert(info.name, raw);
    }

    debug!(resources = map.len(), "encoded resources");
    Ok(map)
}

/// Resolve the `Resources` section and check that every included resource
/// has a slot to decode into. Returns the payloads to apply.
///
/// # Errors
///
/// Returns [`SerdeError::UnregisteredType`] for unknown names, or
/// [`SerdeError::ResourceNotInitialized`] for a registered type without a
/// value in `world`.
pub fn plan<'a>(
    world: &World,
    filter: &InclusionFilter,
    map: &'a PayloadMap,
) -> Result<Vec<(ResourceId, &'a RawValue)>, SerdeError> {
    if filter.all_resources_skipped() {
        return Ok(Vec::new());
    }

    let mut planned = Vec::with_capacity(map.len());
    let mut skipped = 0;
    for (name, raw) in map.iter() {
        let info = world
            .registry()
            .resolve_resource(name)
            .ok_or_else(|| SerdeError::unregistered_resource(name))?;
        if filter.resource_excluded(info.id) {
            skipped += 1;
            continue;
        }
        if !world.has_resource(info.id) {
            return Err(SerdeError::ResourceNotInitialized(name.to_string()));
        }
        planned.push((info.id, raw));
    }

    if skipped > 0 {
        warn!(resources = skipped, "document holds data for skipped resource types");
    }
    Ok(planned)
}

/// Decode planned payloads over the existing resource values.
///
/// # Errors
///
/// Returns [`SerdeError::FieldDecode`] for payloads of the wrong shape.
pub fn apply(world: &mut World, planned: Vec<(ResourceId, &RawValue)>) -> Result<(), SerdeError> {
    let count = planned.len();
    for (id, raw) in planned {
        let (name, decode_into) = match world.registry().resource(id) {
            Some(info) => (info.name, info.decode_into),
            None => return Err(SerdeError::unregistered_resource(id.to_string())),
        };
        let slot = world
            .resource_raw_mut(id)
            .ok_or_else(|| SerdeError::ResourceNotInitialized(name.to_string()))?;
        decode_into(raw, slot).map_err(|source| SerdeError::FieldDecode {
            site: Site::Resource,
            type_name: name.to_string(),
            source,
        })?;
    }
    debug!(resources = count, "decoded resources");
    Ok(())
}
