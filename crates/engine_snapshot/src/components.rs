//! Component codec.
//!
//! Writes one record per alive entity, keyed by component type name, with a
//! relation's target emitted just before the relation's own payload.
//! Reading is split in two: [`decode`] resolves, checks and decodes every
//! record without touching the world, then [`apply`] attaches the results.

use std::collections::HashSet;

use engine_world::{BoxedValue, ComponentId, Entity, TypeRegistry, World, WorldError};
use tracing::{debug, warn};

use crate::document::{PayloadMap, target_key, target_owner};
use crate::error::{SerdeError, Site};
use crate::filter::InclusionFilter;

/// The decoded contents of one component record.
pub struct DecodedEntity {
    /// The entity the record belongs to.
    pub entity: Entity,
    /// Fresh component values, in record order.
    pub values: Vec<(ComponentId, BoxedValue)>,
    /// Relation targets, keyed by relation component.
    pub targets: Vec<(ComponentId, Entity)>,
}

/// Encode the `Types` list and one record per alive entity.
///
/// # Errors
///
/// Returns [`SerdeError::FieldEncode`] if a value fails to encode, or
/// [`SerdeError::World`] for a component attached without a value.
pub fn serialize(
    world: &World,
    filter: &InclusionFilter,
) -> Result<(Vec<String>, Vec<PayloadMap>), SerdeError> {
    if filter.entities_skipped() {
        return Ok((Vec::new(), Vec::new()));
    }
    if filter.all_components_skipped() {
        return Ok((Vec::new(), world.entities().map(|_| PayloadMap::new()).collect()));
    }

    let registry = world.registry();
    let types = registry
        .components()
        .filter(|info| !filter.component_excluded(info.id))
        .map(|info| info.name.to_string())
        .collect();

    let mut records = Vec::with_capacity(world.entity_count());
    for (position, entity) in world.entities().enumerate() {
        let site = Site::Entity { position, entity };
        let mut record = PayloadMap::new();

        for id in world.components_of(entity) {
            if filter.component_excluded(id) {
                continue;
            }
            let info = registry
                .component(id)
                .ok_or_else(|| WorldError::UnregisteredComponent(id.to_string()))?;
            let value = world
                .component_raw(entity, id)
                .ok_or(WorldError::ComponentUnassigned {
                    entity,
                    component: info.name,
                })?;
            let encode_error = |source| SerdeError::FieldEncode {
                site,
                type_name: info.name.to_string(),
                source,
            };

            if info.is_relation {
                let target = world.relation_target_raw(entity, id).unwrap_or(Entity::INVALID);
                let raw = serde_json::value::to_raw_value(&target).map_err(encode_error)?;
                record.insert(target_key(info.name), raw);
            }
            let raw = (info.encode)(value).map_err(encode_error)?;
            record.insert(info.name, raw);
        }
        records.push(record);
    }

    debug!(records = records.len(), "encoded component records");
    Ok((types, records))
}

/// Resolve, check and decode the component section against `alive`, the
/// alive entities of the document's pool block in block order.
///
/// Nothing is mutated; every error this codec can detect before touching
/// the world is reported here.
///
/// # Errors
///
/// - [`SerdeError::UnregisteredType`] for a name in `types` or a record key
///   that the registry does not know.
/// - [`SerdeError::MalformedDocument`] for a record key not listed in
///   `types`, or inconsistent relation targets.
/// - [`SerdeError::EntityCountMismatch`] if the record count differs from
///   the alive count.
/// - [`SerdeError::FieldDecode`] for payloads of the wrong shape.
pub fn decode(
    registry: &TypeRegistry,
    filter: &InclusionFilter,
    types: &[String],
    records: &[PayloadMap],
    alive: &[Entity],
) -> Result<Vec<DecodedEntity>, SerdeError> {
    let mut listed = HashSet::with_capacity(types.len());
    for name in types {
        if registry.resolve_component(name).is_none() {
            return Err(SerdeError::unregistered_component(name.as_str()));
        }
        listed.insert(name.as_str());
    }

    for (position, record) in records.iter().enumerate() {
        for key in record.keys() {
            let name = target_owner(key).unwrap_or(key);
            if registry.resolve_component(name).is_none() {
                return Err(SerdeError::unregistered_component(name));
            }
            if !listed.contains(name) {
                return Err(SerdeError::MalformedDocument(format!(
                    "record #{position} references {name}, which is not listed in Types"
                )));
            }
        }
    }

    if records.len() != alive.len() {
        return Err(SerdeError::EntityCountMismatch {
            records: records.len(),
            alive: alive.len(),
        });
    }

    if filter.all_components_skipped() {
        return Ok(Vec::new());
    }

    let alive_set: HashSet<Entity> = alive.iter().copied().collect();
    let mut skipped = 0;
    let mut decoded = Vec::with_capacity(records.len());
    for (position, (record, &entity)) in records.iter().zip(alive).enumerate() {
        let (entry, skipped_here) =
            decode_record(registry, filter, record, position, entity, &alive_set)?;
        skipped += skipped_here;
        decoded.push(entry);
    }

    if skipped > 0 {
        warn!(fields = skipped, "document holds data for skipped component types");
    }
    debug!(records = decoded.len(), "decoded component records");
    Ok(decoded)
}

fn decode_record(
    registry: &TypeRegistry,
    filter: &InclusionFilter,
    record: &PayloadMap,
    position: usize,
    entity: Entity,
    alive: &HashSet<Entity>,
) -> Result<(DecodedEntity, usize), SerdeError> {
    let site = Site::Entity { position, entity };
    let malformed = |msg: String| SerdeError::MalformedDocument(format!("{site}: {msg}"));

    let mut values = Vec::new();
    let mut found_targets = Vec::new();
    let mut skipped = 0;

    for (key, raw) in record.iter() {
        if let Some(owner) = target_owner(key) {
            let target: Entity =
                serde_json::from_str(raw.get()).map_err(|source| SerdeError::FieldDecode {
                    site,
                    type_name: key.to_string(),
                    source,
                })?;
            found_targets.push((owner, target));
            continue;
        }

        let info = registry
            .resolve_component(key)
            .ok_or_else(|| SerdeError::unregistered_component(key))?;
        if filter.component_excluded(info.id) {
            skipped += 1;
            continue;
        }
        let value = (info.decode)(raw).map_err(|source| SerdeError::FieldDecode {
            site,
            type_name: info.name.to_string(),
            source,
        })?;
        values.push((info.id, value));
    }

    let mut targets = Vec::with_capacity(found_targets.len());
    for (owner, target) in found_targets {
        let info = registry
            .resolve_component(owner)
            .ok_or_else(|| SerdeError::unregistered_component(owner))?;
        if !info.is_relation {
            return Err(malformed(format!("{owner} is not a relation but has a target")));
        }
        if record.get(owner).is_none() {
            return Err(malformed(format!("target for {owner} without the component")));
        }
        if filter.component_excluded(info.id) {
            continue;
        }
        if target != Entity::INVALID && !alive.contains(&target) {
            return Err(malformed(format!("{owner} targets {target}, which is not alive")));
        }
        targets.push((info.id, target));
    }

    for (id, _) in &values {
        if registry.is_relation(*id) && !targets.iter().any(|(t, _)| t == id) {
            let name = registry.component(*id).map_or("?", |info| info.name);
            return Err(malformed(format!("relation {name} has no target")));
        }
    }

    Ok((
        DecodedEntity {
            entity,
            values,
            targets,
        },
        skipped,
    ))
}

/// Attach decoded records: every component in one batch, then the values,
/// then the relation targets.
///
/// # Errors
///
/// Propagates [`SerdeError::World`] if the world rejects a mutation.
pub fn apply(world: &mut World, decoded: Vec<DecodedEntity>) -> Result<(), SerdeError> {
    let mut attached = 0;
    for DecodedEntity {
        entity,
        values,
        targets,
    } in decoded
    {
        if values.is_empty() {
            continue;
        }
        let ids: Vec<ComponentId> = values.iter().map(|(id, _)| *id).collect();
        world.add_components(entity, &ids)?;
        attached += ids.len();
        for (id, value) in values {
            world.assign(entity, id, value)?;
        }
        for (id, target) in targets {
            world.set_relation(entity, id, target)?;
        }
    }
    debug!(components = attached, "attached components");
    Ok(())
}
