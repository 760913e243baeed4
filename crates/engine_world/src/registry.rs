//! Type registry: resolves between stable names, Rust types, and dense ids.
//!
//! Component and resource types live in separate id spaces. Registration is
//! idempotent per Rust type, and ids are handed out in registration order.

use std::any::TypeId;
use std::collections::HashMap;

use tracing::debug;

use crate::component::{
    Component, ComponentId, ComponentInfo, MAX_TYPES, Resource, ResourceId, ResourceInfo,
};
use crate::error::WorldError;

/// Registry of every component and resource type known to a world.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    components: Vec<ComponentInfo>,
    component_names: HashMap<&'static str, ComponentId>,
    component_types: HashMap<TypeId, ComponentId>,
    resources: Vec<ResourceInfo>,
    resource_names: HashMap<&'static str, ResourceId>,
    resource_types: HashMap<TypeId, ResourceId>,
}

impl TypeRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type, returning its id. Registering the same
    /// type again returns the existing id.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::TooManyTypes`] once [`MAX_TYPES`] component types
    /// exist, or [`WorldError::DuplicateName`] if another type already uses
    /// the same stable name.
    pub fn register_component<T: Component>(&mut self) -> Result<ComponentId, WorldError> {
        if let Some(&id) = self.component_types.get(&TypeId::of::<T>()) {
            return Ok(id);
        }
        let name = T::type_name();
        if self.component_names.contains_key(name) {
            return Err(WorldError::DuplicateName(name));
        }
        if self.components.len() >= MAX_TYPES {
            return Err(WorldError::TooManyTypes(name));
        }

        let id = ComponentId(self.components.len() as u8);
        self.components.push(ComponentInfo::of::<T>(id));
        self.component_names.insert(name, id);
        self.component_types.insert(TypeId::of::<T>(), id);
        debug!(name, id = id.0, relation = T::is_relation(), "registered component type");
        Ok(id)
    }

    /// Register a resource type, returning its id. Registering the same type
    /// again returns the existing id.
    ///
    /// # Errors
    ///
    /// Same conditions as [`TypeRegistry::register_component`], counted in
    /// the resource id space.
    pub fn register_resource<T: Resource>(&mut self) -> Result<ResourceId, WorldError> {
        if let Some(&id) = self.resource_types.get(&TypeId::of::<T>()) {
            return Ok(id);
        }
        let name = T::type_name();
        if self.resource_names.contains_key(name) {
            return Err(WorldError::DuplicateName(name));
        }
        if self.resources.len() >= MAX_TYPES {
            return Err(WorldError::TooManyTypes(name));
        }

        let id = ResourceId(self.resources.len() as u8);
        self.resources.push(ResourceInfo::of::<T>(id));
        self.resource_names.insert(name, id);
        self.resource_types.insert(TypeId::of::<T>(), id);
        debug!(name, id = id.0, "registered resource type");
        Ok(id)
    }

    /// Resolve a component by stable name.
    #[must_use]
    pub fn resolve_component(&self, name: &str) -> Option<&ComponentInfo> {
        self.component_names
            .get(name)
            .map(|id| &self.components[id.index()])
    }

    /// Resolve a resource by stable name.
    #[must_use]
    pub fn resolve_resource(&self, name: &str) -> Option<&ResourceInfo> {
        self.resource_names
            .get(name)
            .map(|id| &self.resources[id.index()])
    }

    /// Look up a component by Rust type identity.
    #[must_use]
    pub fn component_by_type(&self, type_id: TypeId) -> Option<&ComponentInfo> {
        self.component_types
            .get(&type_id)
            .map(|id| &self.components[id.index()])
    }

    /// Look up a resource by Rust type identity.
    #[must_use]
    pub fn resource_by_type(&self, type_id: TypeId) -> Option<&ResourceInfo> {
        self.resource_types
            .get(&type_id)
            .map(|id| &self.resources[id.index()])
    }

    /// Returns the id of component type `T`, if registered.
    #[must_use]
    pub fn component_id<T: Component>(&self) -> Option<ComponentId> {
        self.component_types.get(&TypeId::of::<T>()).copied()
    }

    /// Returns the id of resource type `T`, if registered.
    #[must_use]
    pub fn resource_id<T: Resource>(&self) -> Option<ResourceId> {
        self.resource_types.get(&TypeId::of::<T>()).copied()
    }

    /// Returns the bundle of a component id.
    #[must_use]
    pub fn component(&self, id: ComponentId) -> Option<&ComponentInfo> {
        self.components.get(id.index())
    }

    /// Returns the bundle of a resource id.
    #[must_use]
    pub fn resource(&self, id: ResourceId) -> Option<&ResourceInfo> {
        self.resources.get(id.index())
    }

    /// Returns `true` if the id names a relation component.
    #[must_use]
    pub fn is_relation(&self, id: ComponentId) -> bool {
        self.component(id).is_some_and(|info| info.is_relation)
    }

    /// All component types, in registration order.
    pub fn components(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.components.iter()
    }

    /// All resource types, in registration order.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceInfo> {
        self.resources.iter()
    }

    /// Returns the number of registered component types.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Returns the number of registered resource types.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }
}
