use crate::archetype::ArchetypeId;
use crate::component::Name;
use crate::entity::{Entity, EntityAddress, EntityError};
use crate::manager::EntityManager;

impl EntityManager {
    /// Creates an entity without components, optionally named.
    ///
    /// A name is stored as the sparse [`Name`] component, so it does not
    /// change the entity's archetype.
    pub fn create_entity(&mut self, name: Option<&str>) -> Entity {
        let arche = self.archetypes.expect_mut(ArchetypeId::EMPTY);
        let row = arche.len() as u32;
        let entity = self
            .entities
            .allocate(EntityAddress::new(ArchetypeId::EMPTY, row));
        arche.allocate_row(entity, &mut self.storages, self.config.initial_row_capacity);
        self.notify_created(entity, ArchetypeId::EMPTY);

        if let Some(name) = name {
            let address = EntityAddress::new(ArchetypeId::EMPTY, row);
            let id = self.registry.require::<Name>();
            let slot = self.insert_slot(entity, address, id);
            *self.storages.columns.expect_mut(id).get_mut::<Name>(slot) = Name::from(name);
        }
        entity
    }

    /// Deletes `entity` and every component it holds.
    ///
    /// The last row of its archetype moves into the vacated row; the handle
    /// and every copy of it become stale.
    pub fn delete_entity(&mut self, entity: Entity) -> Result<(), EntityError> {
        let address = self.entities.require_address(entity)?;
        self.notify_deleted(entity, address.archetype);

        self.archetypes
            .expect_mut(address.archetype)
            .clear_sparse_row(address.row, &mut self.storages);
        self.swap_remove_row(address);
        self.entities.release(entity)?;
        Ok(())
    }

    /// Returns `true` if `entity` refers to a live entity of this manager.
    #[inline]
    pub fn is_valid(&self, entity: Entity) -> bool {
        self.entities.is_valid(entity)
    }

    /// The archetype and row of `entity`.
    #[inline]
    pub fn address(&self, entity: Entity) -> Result<EntityAddress, EntityError> {
        self.entities.require_address(entity)
    }

    /// Number of live entities.
    #[inline]
    pub fn entity_count(&self) -> usize {
        self.entities.len() as usize
    }

    /// Number of archetypes, the empty one included.
    #[inline]
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// The name given to `entity` at creation.
    pub fn entity_name(&self, entity: Entity) -> Option<&str> {
        self.get_component::<Name>(entity).ok().map(Name::as_str)
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec::Vec;

    use crate::archetype::ArchetypeId;
    use crate::component::{Component, TypeRegistry};
    use crate::entity::{Entity, EntityError};
    use crate::manager::{EntityManager, StageConfig};

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Value(i32);
    impl Component for Value {}

    fn manager() -> EntityManager {
        let config = StageConfig {
            initial_row_capacity: 2,
            ..StageConfig::DEFAULT
        };
        EntityManager::with_config(Arc::new(TypeRegistry::new()), config)
    }

    #[test]
    fn create_and_delete() {
        let mut manager = manager();
        let a = manager.create_entity(None);
        let b = manager.create_entity(Some("b"));
        assert_eq!(manager.entity_count(), 2);
        assert_eq!(manager.address(a).unwrap().archetype, ArchetypeId::EMPTY);
        assert_eq!(manager.address(b).unwrap().archetype, ArchetypeId::EMPTY);
        assert_eq!(manager.entity_name(b), Some("b"));
        assert_eq!(manager.entity_name(a), None);

        manager.delete_entity(a).unwrap();
        assert!(!manager.is_valid(a));
        assert!(matches!(manager.delete_entity(a), Err(EntityError::Stale { .. })));
        assert_eq!(manager.address(b).unwrap().row, 0);
        assert_eq!(manager.entity_name(b), Some("b"));

        // the index is recycled under a new version
        let c = manager.create_entity(None);
        assert_eq!(c.index(), a.index());
        assert_ne!(c.version(), a.version());
        assert_eq!(manager.entity_name(c), None);
        assert!(manager.delete_entity(Entity::NULL).is_err());
    }

    #[test]
    fn delete_middle_of_three() {
        let mut manager = manager();
        let entities: Vec<Entity> = (0..3)
            .map(|i| {
                let entity = manager.create_entity(None);
                manager.add_component_with(entity, Value(i)).unwrap();
                entity
            })
            .collect();

        manager.delete_entity(entities[1]).unwrap();
        assert_eq!(manager.entity_count(), 2);

        let arche = manager.address(entities[0]).unwrap().archetype;
        let arche = manager.archetypes().get(arche).unwrap();
        assert_eq!(arche.len(), 2);
        assert_eq!(arche.entities(), [entities[0], entities[2]]);
        assert_eq!(manager.address(entities[2]).unwrap().row, 1);
        assert_eq!(manager.get_component::<Value>(entities[0]).unwrap(), &Value(0));
        assert_eq!(manager.get_component::<Value>(entities[2]).unwrap(), &Value(2));
    }

    #[test]
    fn counters_follow_churn() {
        let mut manager = manager();
        let mut live = Vec::new();
        for round in 0..50 {
            let entity = manager.create_entity(None);
            if round % 3 == 0 {
                manager.add_component_with(entity, Value(round)).unwrap();
            }
            live.push(entity);
            if round % 4 == 3 {
                let entity = live.remove(live.len() / 2);
                manager.delete_entity(entity).unwrap();
            }
        }
        assert_eq!(manager.entity_count(), live.len());
        assert!(live.iter().all(|&entity| manager.is_valid(entity)));
        let rows: usize = manager.archetypes().iter().map(|arche| arche.len()).sum();
        assert_eq!(rows, live.len());
    }
}
