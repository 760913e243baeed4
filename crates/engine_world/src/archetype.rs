//! Archetype definitions and storage.
//!
//! An archetype is a unique combination of component types. Entities sharing
//! the same set of components are grouped into the same table, one
//! [`Column`] per component type, rows aligned with the table's entity list.

use std::any::Any;
use std::collections::BTreeSet;

use crate::component::{BoxedValue, ComponentId};
use crate::entity::Entity;

/// Index of an archetype table inside a world. Tables are never removed, so
/// ids stay valid and reflect creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArchetypeId(pub u32);

impl ArchetypeId {
    /// The archetype of entities without components.
    pub const EMPTY: ArchetypeId = ArchetypeId(0);

    /// Index into the world's table list.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A row moved out of a table: one entry per column.
pub(crate) type RowData = Vec<(ComponentId, Option<BoxedValue>, Option<Entity>)>;

/// Storage for a single component type within one archetype.
///
/// Values are `None` between attaching a component and assigning its value.
/// Relation columns additionally keep one target per row.
pub struct Column {
    /// The component type stored in this column.
    pub component: ComponentId,
    values: Vec<Option<BoxedValue>>,
    targets: Option<Vec<Entity>>,
}

impl Column {
    /// Create a new empty column.
    #[must_use]
    pub fn new(component: ComponentId, is_relation: bool) -> Self {
        Self {
            component,
            values: Vec::new(),
            targets: is_relation.then(Vec::new),
        }
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the column has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns `true` if rows carry relation targets.
    #[must_use]
    pub fn is_relation(&self) -> bool {
        self.targets.is_some()
    }

    /// Append a row. Relation columns default a missing target to
    /// [`Entity::INVALID`].
    pub fn push(&mut self, value: Option<BoxedValue>, target: Option<Entity>) {
        self.values.push(value);
        if let Some(targets) = &mut self.targets {
            targets.push(target.unwrap_or(Entity::INVALID));
        }
    }

    /// Returns the value at `row`, if assigned.
    #[must_use]
    pub fn get(&self, row: usize) -> Option<&(dyn Any + Send + Sync)> {
        self.values.get(row)?.as_deref()
    }

    /// Returns the value at `row` mutably, if assigned.
    #[must_use]
    pub fn get_mut(&mut self, row: usize) -> Option<&mut (dyn Any + Send + Sync)> {
        self.values.get_mut(row)?.as_deref_mut()
    }

    /// Overwrite the value at `row`. Returns `false` if the row is out of
    /// range.
    pub fn set(&mut self, row: usize, value: BoxedValue) -> bool {
        match self.values.get_mut(row) {
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    /// Returns the relation target at `row`.
    #[must_use]
    pub fn target(&self, row: usize) -> Option<Entity> {
        self.targets.as_ref()?.get(row).copied()
    }

    /// Overwrite the relation target at `row`. Returns `false` for plain
    /// columns or rows out of range.
    pub fn set_target(&mut self, row: usize, target: Entity) -> bool {
        match self.targets.as_mut().and_then(|t| t.get_mut(row)) {
            Some(slot) => {
                *slot = target;
                true
            }
            None => false,
        }
    }

    /// Point every row targeting `from` at `to`. Returns the number of rows
    /// changed; always zero for plain columns.
    pub fn replace_target(&mut self, from: Entity, to: Entity) -> usize {
        let Some(targets) = &mut self.targets else {
            return 0;
        };
        let mut changed = 0;
        for slot in targets.iter_mut().filter(|t| **t == from) {
            *slot = to;
            changed += 1;
        }
        changed
    }

    /// Remove `row`, moving the last row into its place.
    pub fn swap_remove(&mut self, row: usize) -> (Option<BoxedValue>, Option<Entity>) {
        let value = self.values.swap_remove(row);
        let target = self.targets.as_mut().map(|t| t.swap_remove(row));
        (value, target)
    }
}

impl std::fmt::Debug for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("component", &self.component)
            .field("len", &self.len())
            .field("targets", &self.targets)
            .finish()
    }
}

/// A table of entities sharing the same archetype (set of component types).
#[derive(Debug)]
pub struct ArchetypeTable {
    /// The archetype identifier.
    pub id: ArchetypeId,
    /// Sorted set of component types that define this archetype.
    pub component_types: BTreeSet<ComponentId>,
    /// Entities in insertion order. `entities[i]` corresponds to row `i` in
    /// every column.
    pub entities: Vec<Entity>,
    /// One column per component type, in the same order as
    /// `component_types`.
    pub columns: Vec<Column>,
}

impl ArchetypeTable {
    /// Create a new, empty archetype table.
    #[must_use]
    pub fn new(
        id: ArchetypeId,
        component_types: BTreeSet<ComponentId>,
        is_relation: impl Fn(ComponentId) -> bool,
    ) -> Self {
        let columns = component_types
            .iter()
            .map(|&component| Column::new(component, is_relation(component)))
            .collect();

        Self {
            id,
            component_types,
            entities: Vec::new(),
            columns,
        }
    }

    /// Returns the number of entities in this table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if this table has no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns `true` if this archetype contains the given component type.
    #[must_use]
    pub fn has_component(&self, component: ComponentId) -> bool {
        self.component_types.contains(&component)
    }

    /// Returns the column for the given component type, if present.
    #[must_use]
    pub fn column(&self, component: ComponentId) -> Option<&Column> {
        self.columns.iter().find(|c| c.component == component)
    }

    /// Returns the column for the given component type mutably, if present.
    #[must_use]
    pub fn column_mut(&mut self, component: ComponentId) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.component == component)
    }

    /// Append an entity with every column unassigned. Returns its row.
    pub fn push_entity(&mut self, entity: Entity) -> usize {
        self.entities.push(entity);
        for column in &mut self.columns {
            column.push(None, None);
        }
        self.entities.len() - 1
    }

    /// Remove `row`, returning the entity that now occupies it (if any) and
    /// the removed row's data.
    pub(crate) fn swap_remove(&mut self, row: usize) -> (Option<Entity>, RowData) {
        self.entities.swap_remove(row);
        let data = self
            .columns
            .iter_mut()
            .map(|column| {
                let (value, target) = column.swap_remove(row);
                (column.component, value, target)
            })
            .collect();
        (self.entities.get(row).copied(), data)
    }
}
