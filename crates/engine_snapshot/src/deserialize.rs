//! Snapshot bytes → world.
//!
//! Everything that can be checked without touching the world is checked
//! first: decompression, parsing, type resolution, record counts, relation
//! targets, component payloads and resource slots. Only then is the pool
//! restored and the decoded data attached. Resource payloads are decoded in
//! place last, so a malformed resource payload is the one decode error that
//! can surface after the world has been mutated.

use std::borrow::Cow;

use engine_world::World;
use tracing::{debug, info};

use crate::compress::{check_level, decompress};
use crate::document::Document;
use crate::error::SerdeError;
use crate::filter::InclusionFilter;
use crate::options::SerdeOptions;
use crate::{components, entities, resources};

/// Restore a snapshot produced by [`serialize`](crate::serialize()) into
/// `world`.
///
/// The world must be prepared:
///
/// - it must never have allocated an entity (a new or
///   [`reset`](World::reset) world), unless entities are skipped;
/// - every component and resource type named in the document must be
///   registered, including the ones `options` skips;
/// - every resource to be restored must already hold a placeholder value.
///
/// Record *i* of the `Components` section is applied to
/// `World.Entities[World.Alive[i]]` of the document.
///
/// # Errors
///
/// - [`SerdeError::CorruptStream`] if decompression fails.
/// - [`SerdeError::MalformedDocument`] for invalid JSON, a missing or
///   inconsistent `World` block, or inconsistent relation targets.
/// - [`SerdeError::UnregisteredType`] for names the registry does not know.
/// - [`SerdeError::EntityCountMismatch`] if records and alive entities
///   differ in number.
/// - [`SerdeError::ResourceNotInitialized`] for a resource without a
///   placeholder.
/// - [`SerdeError::InvalidTargetState`] if the world already allocated
///   entities.
/// - [`SerdeError::FieldDecode`] for payloads of the wrong shape.
pub fn deserialize(data: &[u8], world: &mut World, options: &SerdeOptions) -> Result<(), SerdeError> {
    if let Some(level) = options.compression {
        check_level(level)?;
    }
    let filter = InclusionFilter::new(world.registry(), options)?;

    let json = if options.is_compressed() {
        Cow::Owned(decompress(data)?)
    } else {
        Cow::Borrowed(data)
    };
    let document = Document::from_slice(&json)?;
    debug!(bytes = json.len(), "parsed document");

    let restore = if filter.entities_skipped() {
        None
    } else {
        let pool = document
            .world
            .as_ref()
            .ok_or_else(|| SerdeError::MalformedDocument("missing World block".to_string()))?;
        pool.validate()
            .map_err(|e| SerdeError::MalformedDocument(e.to_string()))?;
        let alive = pool.alive_entities();
        let decoded = components::decode(
            world.registry(),
            &filter,
            &document.types,
            &document.components,
            &alive,
        )?;
        Some((pool, decoded))
    };

    let planned = resources::plan(world, &filter, &document.resources)?;

    let restored = match restore {
        Some((pool, decoded)) => {
            let alive = entities::load(world, pool)?;
            components::apply(world, decoded)?;
            alive.len()
        }
        None => 0,
    };
    let resource_count = planned.len();
    resources::apply(world, planned)?;

    info!(
        entities = restored,
        resources = resource_count,
        bytes = data.len(),
        compressed = options.is_compressed(),
        "deserialized world"
    );
    Ok(())
}
