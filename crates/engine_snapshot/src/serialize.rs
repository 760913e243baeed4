//! World → snapshot bytes.

use engine_world::World;
use tracing::{debug, info};

use crate::compress::{check_level, compress};
use crate::document::Document;
use crate::error::SerdeError;
use crate::filter::InclusionFilter;
use crate::options::SerdeOptions;
use crate::{components, entities, resources};

/// Serialise `world` into a JSON snapshot, gzipped if `options` asks for
/// it.
///
/// The world is only read. Entities appear in the world's enumeration
/// order, which is stable within one call but not guaranteed across engine
/// versions.
///
/// # Errors
///
/// - [`SerdeError::InvalidCompressionLevel`] for a level above 9.
/// - [`SerdeError::UnregisteredType`] if a skipped type is not registered.
/// - [`SerdeError::FieldEncode`] if a component or resource fails to encode.
/// - [`SerdeError::Compress`] if the gzip writer fails.
pub fn serialize(world: &World, options: &SerdeOptions) -> Result<Vec<u8>, SerdeError> {
    if let Some(level) = options.compression {
        check_level(level)?;
    }
    let filter = InclusionFilter::new(world.registry(), options)?;

    let pool = (!filter.entities_skipped()).then(|| entities::dump(world));
    let (types, records) = components::serialize(world, &filter)?;
    let resource_map = resources::serialize(world, &filter)?;

    let document = Document {
        world: pool,
        types,
        components: records,
        resources: resource_map,
    };
    let json = document.to_bytes()?;
    debug!(bytes = json.len(), "assembled document");

    let bytes = match options.compression {
        Some(level) => compress(&json, level)?,
        None => json,
    };

    info!(
        entities = document.components.len(),
        types = document.types.len(),
        resources = document.resources.len(),
        bytes = bytes.len(),
        compressed = options.is_compressed(),
        "serialized world"
    );
    Ok(bytes)
}
