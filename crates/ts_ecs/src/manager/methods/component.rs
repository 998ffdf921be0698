use alloc::vec::Vec;
use core::mem;

use crate::bitfield::BitFieldGenerator;
use crate::component::{Component, ComponentError, ComponentId, ComponentInfo};
use crate::entity::{Entity, EntityAddress, EntityError};
use crate::error::EcsError;
use crate::manager::EntityManager;
use crate::storage::BoxedValue;
use crate::utils::DebugName;

impl EntityManager {
    /// Adds a default `T` to `entity` and returns it.
    #[inline]
    pub fn add_component<T: Component>(&mut self, entity: Entity) -> Result<&mut T, EcsError> {
        self.add_component_with(entity, T::default())
    }

    /// Adds `value` to `entity` and returns it.
    ///
    /// A dense component moves the entity to another archetype; a sparse one
    /// only takes a slot in its archetype's sparse column.
    pub fn add_component_with<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
    ) -> Result<&mut T, EcsError> {
        let address = self.entities.require_address(entity)?;
        let id = self.registry.require::<T>();
        if self.holds(address, id) {
            return Err(ComponentError::AlreadyPresent {
                entity,
                name: DebugName::type_name::<T>(),
            }
            .into());
        }

        let slot = self.insert_slot(entity, address, id);
        let stored = self.storages.columns.expect_mut(id).get_mut::<T>(slot);
        *stored = value;
        Ok(stored)
    }

    /// The `T` of `entity`.
    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<&T, EcsError> {
        let address = self.entities.require_address(entity)?;
        let slot = self
            .registry
            .get::<T>()
            .and_then(|id| Some((id, self.find_slot(address, id)?)));
        match slot {
            Some((id, slot)) => Ok(self.storages.columns.expect(id).get::<T>(slot)),
            None => Err(missing::<T>(entity)),
        }
    }

    /// The `T` of `entity`, recording a modification of it.
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T, EcsError> {
        let address = self.entities.require_address(entity)?;
        let slot = self
            .registry
            .get::<T>()
            .and_then(|id| Some((id, self.find_slot(address, id)?)));
        let Some((id, slot)) = slot else {
            return Err(missing::<T>(entity));
        };

        self.archetypes
            .expect_mut(address.archetype)
            .mark_modified(id, address.row, &mut self.storages);
        Ok(self.storages.columns.expect_mut(id).get_mut::<T>(slot))
    }

    /// Returns `true` if `entity` is live and holds a `T`.
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        let Ok(address) = self.entities.require_address(entity) else {
            return false;
        };
        self.registry
            .get::<T>()
            .is_some_and(|id| self.holds(address, id))
    }

    /// Removes the `T` of `entity` and returns it.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<T, EcsError> {
        let address = self.entities.require_address(entity)?;
        let slot = self
            .registry
            .get::<T>()
            .and_then(|id| Some((id, self.find_slot(address, id)?)));
        let Some((id, slot)) = slot else {
            return Err(missing::<T>(entity));
        };

        let value = mem::take(self.storages.columns.expect_mut(id).get_mut::<T>(slot));
        self.remove_id(entity, address, id);
        Ok(value)
    }

    /// Removes the `T` of `entity`, if any. Returns `true` if one was removed.
    #[inline]
    pub fn try_remove_component<T: Component>(&mut self, entity: Entity) -> bool {
        self.remove_component::<T>(entity).is_ok()
    }

    /// Returns `true` if the entity at `address` holds `id`.
    pub(crate) fn holds(&self, address: EntityAddress, id: ComponentId) -> bool {
        let arche = self.archetypes.expect(address.archetype);
        if id.is_sparse() {
            arche.has_sparse(id, address.row)
        } else {
            arche.contains(id)
        }
    }

    /// Position of the `id` value of the entity at `address` in its column.
    #[inline]
    pub(crate) fn find_slot(&self, address: EntityAddress, id: ComponentId) -> Option<usize> {
        self.archetypes
            .expect(address.archetype)
            .slot_of(id, address.row)
    }

    /// Gives `entity` a default `id` value and returns its slot. The entity
    /// must not hold one yet.
    pub(crate) fn insert_slot(
        &mut self,
        entity: Entity,
        address: EntityAddress,
        id: ComponentId,
    ) -> usize {
        if id.is_sparse() {
            let info = self.registry.require_info(id);
            let arche = self.archetypes.expect_mut(address.archetype);
            let column = arche.require_sparse_column(
                &info,
                &mut self.storages,
                self.registry.bitfields(),
                self.config.sparse_page_reserve,
            );
            return arche.insert_sparse(column, address.row, &mut self.storages);
        }

        let mut generator = BitFieldGenerator::from_field(
            self.archetypes.expect(address.archetype).type_mask(),
        );
        generator.add(id.index());
        let mask = generator.build(self.registry.bitfields());
        let moved = self.move_entity(entity, address, &mask);
        match self.find_slot(moved, id) {
            Some(slot) => slot,
            None => missing_slot(id),
        }
    }

    /// Drops the `id` value of the entity at `address`, which holds one.
    pub(crate) fn remove_id(&mut self, entity: Entity, address: EntityAddress, id: ComponentId) {
        let arche = self.archetypes.expect_mut(address.archetype);
        if let Some(column) = arche.sparse_index(id) {
            arche.remove_sparse(column, address.row, &mut self.storages);
            return;
        }

        let mut generator = BitFieldGenerator::from_field(arche.type_mask());
        generator.remove(id.index());
        let mask = generator.build(self.registry.bitfields());
        self.move_entity(entity, address, &mask);
    }

    /// Writes `value` to `entity`, adding the component if it is sparse and
    /// missing. Dense components must already be part of the entity's
    /// archetype.
    pub(crate) fn write_component<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
    ) -> Result<(), EntityError> {
        let id = self.registry.require::<T>();
        let slot = self.write_slot(entity, id)?;
        *self.storages.columns.expect_mut(id).get_mut::<T>(slot) = value;
        Ok(())
    }

    /// Like [`write_component`](Self::write_component), for a boxed value of
    /// `info`'s type.
    pub(crate) fn insert_boxed(
        &mut self,
        entity: Entity,
        info: &ComponentInfo,
        value: BoxedValue,
    ) -> Result<(), EntityError> {
        let slot = self.write_slot(entity, info.id())?;
        self.storages.columns.expect_mut(info.id()).put_boxed(slot, value);
        Ok(())
    }

    /// The slot a write of `id` to `entity` goes to. Overwriting an existing
    /// value records a modification.
    fn write_slot(&mut self, entity: Entity, id: ComponentId) -> Result<usize, EntityError> {
        let address = self.entities.require_address(entity)?;
        Ok(match self.find_slot(address, id) {
            Some(slot) => {
                self.archetypes
                    .expect_mut(address.archetype)
                    .mark_modified(id, address.row, &mut self.storages);
                slot
            }
            None if id.is_sparse() => self.insert_slot(entity, address, id),
            None => missing_slot(id),
        })
    }

    /// Drops the value of sparse component `id` of `entity`, if any.
    pub(crate) fn remove_sparse_id(&mut self, entity: Entity, id: ComponentId) -> Result<bool, EntityError> {
        let address = self.entities.require_address(entity)?;
        let arche = self.archetypes.expect_mut(address.archetype);
        Ok(match arche.sparse_index(id) {
            Some(column) => arche.remove_sparse(column, address.row, &mut self.storages),
            None => false,
        })
    }

    /// Clones every component of `entity` except those flagged `NO_CLONE`.
    pub(crate) fn clone_components(
        &self,
        entity: Entity,
    ) -> Result<Vec<(ComponentInfo, BoxedValue)>, EntityError> {
        let address = self.entities.require_address(entity)?;
        let arche = self.archetypes.expect(address.archetype);
        let ids = arche
            .dense_components()
            .chain(arche.sparse_components())
            .collect::<Vec<_>>();

        let mut values = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(slot) = arche.slot_of(id, address.row) else {
                continue;
            };
            let column = self.storages.columns.expect(id);
            if column.info().is_cloneable() {
                values.push((*column.info(), column.clone_boxed(slot)));
            }
        }
        Ok(values)
    }
}

#[inline]
fn missing<T: Component>(entity: Entity) -> EcsError {
    ComponentError::Missing {
        entity,
        name: DebugName::type_name::<T>(),
    }
    .into()
}

#[cold]
#[inline(never)]
fn missing_slot(id: ComponentId) -> ! {
    panic!("{id:?} has no slot on a row that was just given one");
}
