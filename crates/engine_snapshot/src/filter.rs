//! Per-call inclusion filter.
//!
//! Resolves the type lists of a [`SerdeOptions`] against a registry once, so
//! every membership test during the call is a single bit lookup.

use engine_world::{ComponentId, MAX_TYPES, ResourceId, TypeRegistry};
use fixedbitset::FixedBitSet;

use crate::error::SerdeError;
use crate::options::SerdeOptions;

/// Which types and sections a single call includes.
#[derive(Debug, Clone)]
pub struct InclusionFilter {
    components: FixedBitSet,
    resources: FixedBitSet,
    skip_entities: bool,
    skip_all_components: bool,
    skip_all_resources: bool,
}

impl InclusionFilter {
    /// Build the filter for one call.
    ///
    /// # Errors
    ///
    /// Returns [`SerdeError::UnregisteredType`] if an excluded type is not
    /// registered in `registry`.
    pub fn new(registry: &TypeRegistry, options: &SerdeOptions) -> Result<Self, SerdeError> {
        let mut components = FixedBitSet::with_capacity(MAX_TYPES);
        for skipped in &options.skip_components {
            let info = registry
                .component_by_type(skipped.type_id)
                .ok_or_else(|| SerdeError::unregistered_component(skipped.name))?;
            components.insert(info.id.index());
        }

        let mut resources = FixedBitSet::with_capacity(MAX_TYPES);
        for skipped in &options.skip_resources {
            let info = registry
                .resource_by_type(skipped.type_id)
                .ok_or_else(|| SerdeError::unregistered_resource(skipped.name))?;
            resources.insert(info.id.index());
        }

        Ok(Self {
            components,
            resources,
            skip_entities: options.skip_entities,
            skip_all_components: options.skip_all_components,
            skip_all_resources: options.skip_all_resources,
        })
    }

    /// Returns `true` if the component type is left out, individually or
    /// through a section toggle.
    #[must_use]
    pub fn component_excluded(&self, id: ComponentId) -> bool {
        self.all_components_skipped() || self.components.contains(id.index())
    }

    /// Returns `true` if the resource type is left out, individually or
    /// through a section toggle.
    #[must_use]
    pub fn resource_excluded(&self, id: ResourceId) -> bool {
        self.skip_all_resources || self.resources.contains(id.index())
    }

    #[must_use]
    pub fn entities_skipped(&self) -> bool {
        self.skip_entities
    }

    /// Also `true` when entities are skipped.
    #[must_use]
    pub fn all_components_skipped(&self) -> bool {
        self.skip_entities || self.skip_all_components
    }

    #[must_use]
    pub fn all_resources_skipped(&self) -> bool {
        self.skip_all_resources
    }
}
