//! World state storage.
//!
//! The [`World`] owns the entity pool, the type registry, archetype storage,
//! and resource slots. Typed accessors sit on top of a type-erased core
//! ([`World::add_components`], [`World::assign`], [`World::set_relation`],
//! [`World::component_raw`], ...) that snapshot codecs drive through the
//! registry's capability bundles.

use std::any::Any;
use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::archetype::{ArchetypeId, ArchetypeTable};
use crate::component::{BoxedValue, Component, ComponentId, Resource, ResourceId};
use crate::entity::{Entity, EntityDump, EntityPool};
use crate::error::WorldError;
use crate::registry::TypeRegistry;

#[derive(Debug, Clone, Copy)]
struct Location {
    archetype: ArchetypeId,
    row: usize,
}

/// Entity, component, relation, and resource storage.
pub struct World {
    registry: TypeRegistry,
    pool: EntityPool,
    /// Archetype tables in creation order; table 0 holds component-less
    /// entities.
    archetypes: Vec<ArchetypeTable>,
    type_set_to_archetype: HashMap<BTreeSet<ComponentId>, ArchetypeId>,
    /// Indexed by entity slot.
    locations: Vec<Option<Location>>,
    /// Indexed by resource id. `None` until the resource is added.
    resources: Vec<Option<BoxedValue>>,
}

impl World {
    /// Create a new empty world.
    #[must_use]
    pub fn new() -> Self {
        let empty = ArchetypeTable::new(ArchetypeId::EMPTY, BTreeSet::new(), |_| false);
        let mut type_set_to_archetype = HashMap::new();
        type_set_to_archetype.insert(BTreeSet::new(), ArchetypeId::EMPTY);
        Self {
            registry: TypeRegistry::new(),
            pool: EntityPool::new(),
            archetypes: vec![empty],
            type_set_to_archetype,
            locations: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Access the type registry.
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Register a component type.
    ///
    /// # Errors
    ///
    /// See [`TypeRegistry::register_component`].
    pub fn register_component<T: Component>(&mut self) -> Result<ComponentId, WorldError> {
        self.registry.register_component::<T>()
    }

    /// Register a resource type without creating its slot.
    ///
    /// # Errors
    ///
    /// See [`TypeRegistry::register_resource`].
    pub fn register_resource<T: Resource>(&mut self) -> Result<ResourceId, WorldError> {
        let id = self.registry.register_resource::<T>()?;
        if self.resources.len() <= id.index() {
            self.resources.resize_with(id.index() + 1, || None);
        }
        Ok(id)
    }

    // -- Entity lifecycle --

    /// Spawn an entity without components.
    pub fn spawn(&mut self) -> Entity {
        let entity = self.pool.alloc();
        self.place(entity, ArchetypeId::EMPTY);
        entity
    }

    /// Spawn an entity carrying one component.
    ///
    /// # Errors
    ///
    /// Propagates registration failures.
    pub fn spawn_with<T: Component>(&mut self, value: T) -> Result<Entity, WorldError> {
        let entity = self.spawn();
        self.insert(entity, value)?;
        Ok(entity)
    }

    /// Despawn an entity and drop its components. Relations that targeted
    /// it are reset to [`Entity::INVALID`].
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EntityNotAlive`] for dead or stale handles.
    pub fn despawn(&mut self, entity: Entity) -> Result<(), WorldError> {
        let location = self.location(entity)?;
        self.remove_row(location);
        self.locations[entity.index() as usize] = None;
        self.pool.free(entity)?;

        let cleared: usize = self
            .archetypes
            .iter_mut()
            .flat_map(|table| table.columns.iter_mut())
            .map(|column| column.replace_target(entity, Entity::INVALID))
            .sum();
        if cleared > 0 {
            debug!(%entity, relations = cleared, "cleared relation targets");
        }
        Ok(())
    }

    /// Returns `true` if the entity is alive.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.pool.is_alive(entity)
    }

    /// All alive entities, in archetype creation order then row order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.archetypes
            .iter()
            .flat_map(|table| table.entities.iter().copied())
    }

    /// Returns the number of alive entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.pool.alive_count()
    }

    /// Returns the number of entity slots ever allocated, alive or dead.
    #[must_use]
    pub fn ever_allocated(&self) -> usize {
        self.pool.ever_allocated()
    }

    /// Returns the number of archetype tables, including the empty one.
    #[must_use]
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    // -- Typed component access --

    /// Insert or overwrite a component. A newly attached relation component
    /// targets [`Entity::INVALID`] until [`World::set_relation`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EntityNotAlive`] for dead entities, or a
    /// registration failure.
    pub fn insert<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), WorldError> {
        let id = self.registry.register_component::<T>()?;
        self.add_components(entity, &[id])?;
        self.assign(entity, id, Box::new(value))
    }

    /// Insert or overwrite a relation component together with its target.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotARelation`] if `T` is not a relation, or
    /// [`WorldError::EntityNotAlive`] if either entity is dead.
    pub fn insert_relation<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
        target: Entity,
    ) -> Result<(), WorldError> {
        if !T::is_relation() {
            return Err(WorldError::NotARelation(T::type_name()));
        }
        self.insert(entity, value)?;
        let id = self.registry.register_component::<T>()?;
        self.set_relation(entity, id, target)
    }

    /// Returns a component of an entity.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        let id = self.registry.component_id::<T>()?;
        self.component_raw(entity, id)?.downcast_ref::<T>()
    }

    /// Returns a component of an entity mutably.
    #[must_use]
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let id = self.registry.component_id::<T>()?;
        let location = self.location(entity).ok()?;
        self.archetypes[location.archetype.index()]
            .column_mut(id)?
            .get_mut(location.row)?
            .downcast_mut::<T>()
    }

    /// Returns `true` if the entity carries component `T`.
    #[must_use]
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.registry
            .component_id::<T>()
            .is_some_and(|id| self.has_component(entity, id))
    }

    /// Returns the target of relation component `T` on an entity.
    #[must_use]
    pub fn relation_target<T: Component>(&self, entity: Entity) -> Option<Entity> {
        let id = self.registry.component_id::<T>()?;
        self.relation_target_raw(entity, id)
    }

    // -- Type-erased component access --

    /// Returns `true` if the entity carries the component.
    #[must_use]
    pub fn has_component(&self, entity: Entity, id: ComponentId) -> bool {
        self.location(entity)
            .is_ok_and(|loc| self.archetypes[loc.archetype.index()].has_component(id))
    }

    /// Component types of an entity, sorted by id. Empty for dead entities.
    #[must_use]
    pub fn components_of(&self, entity: Entity) -> Vec<ComponentId> {
        match self.location(entity) {
            Ok(loc) => self.archetypes[loc.archetype.index()]
                .component_types
                .iter()
                .copied()
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Returns the value of a component, if attached and assigned.
    #[must_use]
    pub fn component_raw(&self, entity: Entity, id: ComponentId) -> Option<&(dyn Any + Send + Sync)> {
        let location = self.location(entity).ok()?;
        self.archetypes[location.archetype.index()]
            .column(id)?
            .get(location.row)
    }

    /// Returns the target of a relation component, if attached.
    #[must_use]
    pub fn relation_target_raw(&self, entity: Entity, id: ComponentId) -> Option<Entity> {
        let location = self.location(entity).ok()?;
        self.archetypes[location.archetype.index()]
            .column(id)?
            .target(location.row)
    }

    /// Attach a batch of component types to an entity in one archetype move.
    ///
    /// Newly attached components are unassigned until [`World::assign`] is
    /// called; types the entity already carries keep their values.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EntityNotAlive`] or
    /// [`WorldError::UnregisteredComponent`].
    pub fn add_components(&mut self, entity: Entity, ids: &[ComponentId]) -> Result<(), WorldError> {
        let location = self.location(entity)?;
        if let Some(unknown) = ids.iter().find(|id| self.registry.component(**id).is_none()) {
            return Err(WorldError::UnregisteredComponent(unknown.to_string()));
        }

        let current = &self.archetypes[location.archetype.index()].component_types;
        if ids.iter().all(|id| current.contains(id)) {
            return Ok(());
        }
        let mut types = current.clone();
        types.extend(ids.iter().copied());

        let target = self.get_or_create_archetype(types);
        self.move_entity(entity, location, target);
        Ok(())
    }

    /// Assign the value of an attached component.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::TypeMismatch`] if the boxed value is not of the
    /// component's type, or [`WorldError::ComponentMissing`] if the component
    /// is not attached.
    pub fn assign(&mut self, entity: Entity, id: ComponentId, value: BoxedValue) -> Result<(), WorldError> {
        let info = self
            .registry
            .component(id)
            .ok_or_else(|| WorldError::UnregisteredComponent(id.to_string()))?;
        if (*value).type_id() != info.type_id {
            return Err(WorldError::TypeMismatch(info.name));
        }
        let name = info.name;
        let location = self.location(entity)?;
        let column = self.archetypes[location.archetype.index()]
            .column_mut(id)
            .ok_or(WorldError::ComponentMissing {
                entity,
                component: name,
            })?;
        column.set(location.row, value);
        Ok(())
    }

    /// Point an attached relation component at `target`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotARelation`], [`WorldError::ComponentMissing`],
    /// or [`WorldError::EntityNotAlive`] if `target` is neither alive nor
    /// [`Entity::INVALID`].
    pub fn set_relation(&mut self, entity: Entity, id: ComponentId, target: Entity) -> Result<(), WorldError> {
        let info = self
            .registry
            .component(id)
            .ok_or_else(|| WorldError::UnregisteredComponent(id.to_string()))?;
        if !info.is_relation {
            return Err(WorldError::NotARelation(info.name));
        }
        if target != Entity::INVALID && !self.pool.is_alive(target) {
            return Err(WorldError::EntityNotAlive(target));
        }
        let name = info.name;
        let location = self.location(entity)?;
        let column = self.archetypes[location.archetype.index()]
            .column_mut(id)
            .ok_or(WorldError::ComponentMissing {
                entity,
                component: name,
            })?;
        column.set_target(location.row, target);
        Ok(())
    }

    // -- Resources --

    /// Register a resource type and store its value, replacing any previous
    /// value.
    ///
    /// # Errors
    ///
    /// Propagates registration failures.
    pub fn add_resource<T: Resource>(&mut self, value: T) -> Result<ResourceId, WorldError> {
        let id = self.register_resource::<T>()?;
        self.resources[id.index()] = Some(Box::new(value));
        Ok(id)
    }

    /// Returns a resource value.
    #[must_use]
    pub fn resource<T: Resource>(&self) -> Option<&T> {
        let id = self.registry.resource_id::<T>()?;
        self.resource_raw(id)?.downcast_ref::<T>()
    }

    /// Returns a resource value mutably.
    #[must_use]
    pub fn resource_mut<T: Resource>(&mut self) -> Option<&mut T> {
        let id = self.registry.resource_id::<T>()?;
        self.resource_raw_mut(id)?.downcast_mut::<T>()
    }

    /// Returns `true` if the resource slot exists.
    #[must_use]
    pub fn has_resource(&self, id: ResourceId) -> bool {
        self.resource_raw(id).is_some()
    }

    /// Returns a resource value by id.
    #[must_use]
    pub fn resource_raw(&self, id: ResourceId) -> Option<&(dyn Any + Send + Sync)> {
        self.resources.get(id.index())?.as_deref()
    }

    /// Returns a resource value by id, mutably.
    #[must_use]
    pub fn resource_raw_mut(&mut self, id: ResourceId) -> Option<&mut (dyn Any + Send + Sync)> {
        self.resources.get_mut(id.index())?.as_deref_mut()
    }

    /// Remove a resource value, keeping the type registered.
    pub fn remove_resource<T: Resource>(&mut self) -> Option<T> {
        let id = self.registry.resource_id::<T>()?;
        let boxed = self.resources.get_mut(id.index())?.take()?;
        boxed.downcast::<T>().ok().map(|b| *b)
    }

    // -- Entity pool --

    /// Snapshot the entity pool. The alive list follows [`World::entities`].
    #[must_use]
    pub fn dump_entities(&self) -> EntityDump {
        self.pool.dump(self.entities())
    }

    /// Restore an entity pool snapshot. Every alive entity is placed without
    /// components. Returns the alive entities in dump order.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotEmpty`] unless the world has never allocated
    /// an entity, or [`WorldError::InvalidEntityDump`].
    pub fn load_entities(&mut self, dump: &EntityDump) -> Result<Vec<Entity>, WorldError> {
        let alive = self.pool.load(dump)?;
        for &entity in &alive {
            self.place(entity, ArchetypeId::EMPTY);
        }
        debug!(alive = alive.len(), slots = dump.entities.len(), "loaded entity pool");
        Ok(alive)
    }

    /// Remove all entities and resource values. Registrations survive.
    pub fn reset(&mut self) {
        self.pool.reset();
        self.locations.clear();
        for table in &mut self.archetypes {
            let types = std::mem::take(&mut table.component_types);
            let registry = &self.registry;
            *table = ArchetypeTable::new(table.id, types, |id| registry.is_relation(id));
        }
        for slot in &mut self.resources {
            *slot = None;
        }
    }

    // -- Internals --

    fn location(&self, entity: Entity) -> Result<Location, WorldError> {
        if !self.pool.is_alive(entity) {
            return Err(WorldError::EntityNotAlive(entity));
        }
        self.locations
            .get(entity.index() as usize)
            .copied()
            .flatten()
            .ok_or(WorldError::EntityNotAlive(entity))
    }

    fn place(&mut self, entity: Entity, archetype: ArchetypeId) {
        let row = self.archetypes[archetype.index()].push_entity(entity);
        let slot = entity.index() as usize;
        if self.locations.len() <= slot {
            self.locations.resize(slot + 1, None);
        }
        self.locations[slot] = Some(Location { archetype, row });
    }

    /// Remove a row, fixing up the entity swapped into its place.
    fn remove_row(&mut self, location: Location) -> crate::archetype::RowData {
        let (moved, data) = self.archetypes[location.archetype.index()].swap_remove(location.row);
        if let Some(moved) = moved {
            self.locations[moved.index() as usize] = Some(location);
        }
        data
    }

    fn move_entity(&mut self, entity: Entity, from: Location, to: ArchetypeId) {
        let data = self.remove_row(from);
        self.place(entity, to);
        let row = self.archetypes[to.index()].len() - 1;
        let table = &mut self.archetypes[to.index()];
        for (component, value, target) in data {
            if let Some(column) = table.column_mut(component) {
                if let Some(value) = value {
                    column.set(row, value);
                }
                if let Some(target) = target {
                    column.set_target(row, target);
                }
            }
        }
    }

    fn get_or_create_archetype(&mut self, types: BTreeSet<ComponentId>) -> ArchetypeId {
        if let Some(&id) = self.type_set_to_archetype.get(&types) {
            return id;
        }
        let id = ArchetypeId(self.archetypes.len() as u32);
        let registry = &self.registry;
        let table = ArchetypeTable::new(id, types.clone(), |c| registry.is_relation(c));
        self.archetypes.push(table);
        self.type_set_to_archetype.insert(types, id);
        id
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entity_count())
            .field("archetypes", &self.archetypes.len())
            .field("components", &self.registry.component_count())
            .field("resources", &self.registry.resource_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Position {
        x: f64,
        y: f64,
    }

    impl Component for Position {}

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Velocity {
        x: f64,
        y: f64,
    }

    impl Component for Velocity {}
    impl Resource for Velocity {}

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct ChildOf;

    impl Component for ChildOf {
        fn is_relation() -> bool {
            true
        }
    }

    #[test]
    fn test_spawn_and_get() {
        let mut world = World::new();
        let e = world.spawn_with(Position { x: 1.0, y: 2.0 }).unwrap();
        assert!(world.is_alive(e));
        assert_eq!(world.get::<Position>(e), Some(&Position { x: 1.0, y: 2.0 }));
        assert!(!world.has::<Velocity>(e));
    }

    #[test]
    fn test_insert_moves_between_archetypes_and_keeps_values() {
        let mut world = World::new();
        let a = world.spawn_with(Position { x: 1.0, y: 1.0 }).unwrap();
        let b = world.spawn_with(Position { x: 2.0, y: 2.0 }).unwrap();
        world.insert(a, Velocity { x: 5.0, y: 6.0 }).unwrap();

        assert_eq!(world.get::<Position>(a), Some(&Position { x: 1.0, y: 1.0 }));
        assert_eq!(world.get::<Velocity>(a), Some(&Velocity { x: 5.0, y: 6.0 }));
        assert_eq!(world.get::<Position>(b), Some(&Position { x: 2.0, y: 2.0 }));
        assert_eq!(world.archetype_count(), 3);
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut world = World::new();
        let e = world.spawn_with(Position { x: 1.0, y: 1.0 }).unwrap();
        world.get_mut::<Position>(e).unwrap().x = 9.0;
        assert_eq!(world.get::<Position>(e).unwrap().x, 9.0);
    }

    #[test]
    fn test_despawn_fixes_swapped_row() {
        let mut world = World::new();
        let a = world.spawn_with(Position { x: 1.0, y: 0.0 }).unwrap();
        let b = world.spawn_with(Position { x: 2.0, y: 0.0 }).unwrap();
        world.despawn(a).unwrap();

        assert!(!world.is_alive(a));
        assert_eq!(world.get::<Position>(b).unwrap().x, 2.0);
        assert_eq!(world.entity_count(), 1);
        assert_eq!(world.ever_allocated(), 2);
        assert!(world.despawn(a).is_err());
    }

    #[test]
    fn test_relation_targets() {
        let mut world = World::new();
        let parent = world.spawn();
        let child = world.spawn();
        world.insert_relation(child, ChildOf, parent).unwrap();
        assert_eq!(world.relation_target::<ChildOf>(child), Some(parent));

        world.insert(child, Position { x: 0.0, y: 0.0 }).unwrap();
        assert_eq!(world.relation_target::<ChildOf>(child), Some(parent));

        assert!(matches!(
            world.insert_relation(child, Position { x: 0.0, y: 0.0 }, parent),
            Err(WorldError::NotARelation(_))
        ));
    }

    #[test]
    fn test_despawn_resets_relations_to_it() {
        let mut world = World::new();
        let parent = world.spawn();
        let child = world.spawn();
        let grandchild = world.spawn_with(Position { x: 0.0, y: 0.0 }).unwrap();
        world.insert_relation(child, ChildOf, parent).unwrap();
        world.insert_relation(grandchild, ChildOf, child).unwrap();

        world.despawn(parent).unwrap();
        assert_eq!(world.relation_target::<ChildOf>(child), Some(Entity::INVALID));
        assert_eq!(world.relation_target::<ChildOf>(grandchild), Some(child));

        world.despawn(child).unwrap();
        assert_eq!(world.relation_target::<ChildOf>(grandchild), Some(Entity::INVALID));
        assert!(world.has::<ChildOf>(grandchild));
    }

    #[test]
    fn test_batch_attach_then_assign() {
        let mut world = World::new();
        let pos = world.register_component::<Position>().unwrap();
        let rel = world.register_component::<ChildOf>().unwrap();
        let parent = world.spawn();
        let e = world.spawn();

        world.add_components(e, &[pos, rel]).unwrap();
        assert!(world.has_component(e, pos));
        assert!(world.component_raw(e, pos).is_none());
        assert_eq!(world.relation_target_raw(e, rel), Some(Entity::INVALID));

        world.assign(e, pos, Box::new(Position { x: 3.0, y: 4.0 })).unwrap();
        world.assign(e, rel, Box::new(ChildOf)).unwrap();
        world.set_relation(e, rel, parent).unwrap();

        assert_eq!(world.get::<Position>(e), Some(&Position { x: 3.0, y: 4.0 }));
        assert_eq!(world.relation_target::<ChildOf>(e), Some(parent));
    }

    #[test]
    fn test_assign_rejects_wrong_type() {
        let mut world = World::new();
        let pos = world.register_component::<Position>().unwrap();
        let e = world.spawn();
        world.add_components(e, &[pos]).unwrap();
        assert!(matches!(
            world.assign(e, pos, Box::new(Velocity { x: 0.0, y: 0.0 })),
            Err(WorldError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_set_relation_requires_live_target() {
        let mut world = World::new();
        let rel = world.register_component::<ChildOf>().unwrap();
        let e = world.spawn();
        world.add_components(e, &[rel]).unwrap();
        let ghost = Entity::new(42, 0);
        assert!(matches!(
            world.set_relation(e, rel, ghost),
            Err(WorldError::EntityNotAlive(_))
        ));
    }

    #[test]
    fn test_resources() {
        let mut world = World::new();
        let id = world.register_resource::<Velocity>().unwrap();
        assert!(!world.has_resource(id));

        world.add_resource(Velocity { x: 1000.0, y: 0.0 }).unwrap();
        assert!(world.has_resource(id));
        world.resource_mut::<Velocity>().unwrap().y = 1.0;
        assert_eq!(world.resource::<Velocity>(), Some(&Velocity { x: 1000.0, y: 1.0 }));

        assert_eq!(
            world.remove_resource::<Velocity>(),
            Some(Velocity { x: 1000.0, y: 1.0 })
        );
        assert!(!world.has_resource(id));
    }

    #[test]
    fn test_dump_and_load_entities() {
        let mut source = World::new();
        let a = source.spawn_with(Position { x: 0.0, y: 0.0 }).unwrap();
        let b = source.spawn();
        let c = source.spawn();
        source.despawn(b).unwrap();

        let dump = source.dump_entities();
        let order: Vec<Entity> = source.entities().collect();
        assert_eq!(dump.alive_entities(), order);

        let mut target = World::new();
        let alive = target.load_entities(&dump).unwrap();
        assert_eq!(alive, order);
        assert!(target.is_alive(a) && target.is_alive(c));
        assert!(!target.is_alive(b));
        assert_eq!(source.spawn(), target.spawn());

        assert!(matches!(
            target.load_entities(&dump),
            Err(WorldError::NotEmpty(_))
        ));
    }

    #[test]
    fn test_reset_keeps_registrations() {
        let mut world = World::new();
        world.spawn_with(Position { x: 0.0, y: 0.0 }).unwrap();
        world.add_resource(Velocity { x: 0.0, y: 0.0 }).unwrap();
        world.reset();

        assert_eq!(world.entity_count(), 0);
        assert_eq!(world.ever_allocated(), 0);
        assert!(world.resource::<Velocity>().is_none());
        assert!(world.registry().component_id::<Position>().is_some());
        let e = world.spawn_with(Position { x: 1.0, y: 1.0 }).unwrap();
        assert_eq!(e, Entity::new(1, 0));
    }
}
