//! Entity identifiers and the recycling entity pool.
//!
//! An [`Entity`] is a slot index plus a generation counter. The
//! [`EntityPool`] hands out slots, recycles freed slots through an implicit
//! free list, and bumps the generation on every free so stale handles never
//! compare equal to a recycled identity.
//!
//! The pool's full bookkeeping can be captured as an [`EntityDump`] and
//! restored into an untouched pool, after which allocation continues with
//! exactly the identities the source pool would have produced.

use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// Number of slots at the start of the table that are never handed out.
const RESERVED_SLOTS: usize = 1;

/// A generational entity identifier.
///
/// Serialised as a two-element array `[index, generation]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    /// The null / invalid entity sentinel. Occupies reserved slot 0.
    pub const INVALID: Entity = Entity {
        index: 0,
        generation: 0,
    };

    /// Create an entity from raw parts.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the slot index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation counter of the slot at the time this handle
    /// was issued.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Returns `true` unless this is [`Entity::INVALID`].
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.index != 0
    }
}

impl From<(u32, u32)> for Entity {
    fn from((index, generation): (u32, u32)) -> Self {
        Self { index, generation }
    }
}

impl From<Entity> for (u32, u32) {
    fn from(entity: Entity) -> Self {
        (entity.index, entity.generation)
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

/// The complete bookkeeping state of an [`EntityPool`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityDump {
    /// Every slot ever allocated, reserved slots included. For a free slot
    /// the `index` half holds the next free slot.
    pub entities: Vec<Entity>,
    /// Indices of alive slots, in the world's enumeration order.
    pub alive: Vec<u32>,
    /// Head of the free list.
    pub next: u32,
    /// Number of slots on the free list.
    pub available: u32,
}

impl EntityDump {
    /// Check that the dump describes a consistent pool.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidEntityDump`] describing the first
    /// inconsistency found.
    pub fn validate(&self) -> Result<(), WorldError> {
        let invalid = |msg: String| Err(WorldError::InvalidEntityDump(msg));
        let slots = self.entities.len();

        if slots < RESERVED_SLOTS {
            return invalid("missing reserved slot".to_string());
        }
        if self.alive.len() + self.available as usize + RESERVED_SLOTS != slots {
            return invalid(format!(
                "{} alive and {} free entities do not fill {} slots",
                self.alive.len(),
                self.available,
                slots
            ));
        }

        let mut used = vec![false; slots];
        used[..RESERVED_SLOTS].fill(true);

        for &index in &self.alive {
            let i = index as usize;
            if i < RESERVED_SLOTS || i >= slots {
                return invalid(format!("alive index {index} out of range"));
            }
            if used[i] {
                return invalid(format!("alive index {index} listed twice"));
            }
            if self.entities[i].index != index {
                return invalid(format!("alive slot {index} holds a free-list link"));
            }
            used[i] = true;
        }

        let mut cursor = self.next;
        for _ in 0..self.available {
            let i = cursor as usize;
            if i >= slots || used[i] {
                return invalid(format!("free list is broken at slot {cursor}"));
            }
            used[i] = true;
            cursor = self.entities[i].index;
        }

        Ok(())
    }

    /// Returns the alive entities in [`EntityDump::alive`] order.
    ///
    /// Indices that fall outside the slot table are skipped; call
    /// [`EntityDump::validate`] first to rule those out.
    #[must_use]
    pub fn alive_entities(&self) -> Vec<Entity> {
        self.alive
            .iter()
            .filter_map(|&index| self.entities.get(index as usize).copied())
            .collect()
    }
}

/// Allocates and recycles generational entity identifiers.
///
/// Slot 0 is reserved for [`Entity::INVALID`]. A freed slot's `index` field
/// doubles as the link to the next free slot.
#[derive(Debug, Clone)]
pub struct EntityPool {
    entities: Vec<Entity>,
    alive: Vec<bool>,
    next: u32,
    available: u32,
}

impl EntityPool {
    /// Creates an empty pool with only the reserved slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: vec![Entity::INVALID; RESERVED_SLOTS],
            alive: vec![false; RESERVED_SLOTS],
            next: 0,
            available: 0,
        }
    }

    /// Allocates an entity, recycling the most recently freed slot first.
    pub fn alloc(&mut self) -> Entity {
        if self.available > 0 {
            let index = self.next;
            let slot = &mut self.entities[index as usize];
            self.next = slot.index;
            slot.index = index;
            self.available -= 1;
            self.alive[index as usize] = true;
            return *slot;
        }

        let entity = Entity::new(self.entities.len() as u32, 0);
        self.entities.push(entity);
        self.alive.push(true);
        entity
    }

    /// Frees an alive entity and bumps its slot generation.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EntityNotAlive`] for dead or stale handles.
    pub fn free(&mut self, entity: Entity) -> Result<(), WorldError> {
        if !self.is_alive(entity) {
            return Err(WorldError::EntityNotAlive(entity));
        }
        let i = entity.index as usize;
        let slot = &mut self.entities[i];
        slot.generation = slot.generation.wrapping_add(1);
        slot.index = self.next;
        self.next = entity.index;
        self.available += 1;
        self.alive[i] = false;
        Ok(())
    }

    /// Returns `true` if the handle refers to the current generation of an
    /// alive slot.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        let i = entity.index as usize;
        entity.is_valid()
            && self.alive.get(i).copied().unwrap_or(false)
            && self.entities[i].generation == entity.generation
    }

    /// Returns the number of alive entities.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.entities.len() - RESERVED_SLOTS - self.available as usize
    }

    /// Returns the number of slots ever allocated, alive or free.
    #[must_use]
    pub fn ever_allocated(&self) -> usize {
        self.entities.len() - RESERVED_SLOTS
    }

    /// Snapshot the pool. `alive_order` fixes the order of
    /// [`EntityDump::alive`] and must enumerate every alive entity once.
    #[must_use]
    pub fn dump(&self, alive_order: impl IntoIterator<Item = Entity>) -> EntityDump {
        EntityDump {
            entities: self.entities.clone(),
            alive: alive_order.into_iter().map(Entity::index).collect(),
            next: self.next,
            available: self.available,
        }
    }

    /// Restore a dump into this pool and return the alive entities in dump
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotEmpty`] if any entity was ever allocated from
    /// this pool, or [`WorldError::InvalidEntityDump`] if the dump is
    /// inconsistent. The pool is unchanged on error.
    pub fn load(&mut self, dump: &EntityDump) -> Result<Vec<Entity>, WorldError> {
        if self.ever_allocated() != 0 {
            return Err(WorldError::NotEmpty(self.ever_allocated()));
        }
        dump.validate()?;

        self.entities = dump.entities.clone();
        self.alive = vec![false; dump.entities.len()];
        for &index in &dump.alive {
            self.alive[index as usize] = true;
        }
        self.next = dump.next;
        self.available = dump.available;

        Ok(dump.alive_entities())
    }

    /// Forget every allocation.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for EntityPool {
    fn default() -> Self {
        Self::new()
    }
}
