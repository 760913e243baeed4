//! Entity pool codec.
//!
//! The pool block is produced and restored as a unit; nothing else in the
//! crate reads its fields apart from the alive list that positions the
//! component records.

use engine_world::{Entity, EntityDump, World};
use tracing::debug;

use crate::error::SerdeError;

/// Capture the pool state of `world`.
#[must_use]
pub fn dump(world: &World) -> EntityDump {
    let dump = world.dump_entities();
    debug!(
        slots = dump.entities.len(),
        alive = dump.alive.len(),
        free = dump.available,
        "dumped entity pool"
    );
    dump
}

/// Fails unless `world` has never allocated an entity.
///
/// # Errors
///
/// Returns [`SerdeError::InvalidTargetState`] with the number of slots the
/// world has allocated.
pub fn check_target(world: &World) -> Result<(), SerdeError> {
    match world.ever_allocated() {
        0 => Ok(()),
        n => Err(SerdeError::InvalidTargetState(n)),
    }
}

/// Restore a pool block into an untouched world. Returns the alive entities
/// in block order.
///
/// # Errors
///
/// Returns [`SerdeError::InvalidTargetState`] if the world has allocated
/// entities, or [`SerdeError::World`] if the block is inconsistent.
pub fn load(world: &mut World, dump: &EntityDump) -> Result<Vec<Entity>, SerdeError> {
    check_target(world)?;
    Ok(world.load_entities(dump)?)
}
