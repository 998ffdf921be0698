use crate::archetype::ArchetypeId;
use crate::bitfield::{BitField, BitFieldGenerator};
use crate::entity::{Entity, EntityAddress, EntityError};
use crate::manager::EntityManager;

impl EntityManager {
    /// Moves `entity` to the archetype of `mask` and returns its new address.
    ///
    /// Dense values of components both archetypes have move along, sparse
    /// values always do. Values of dropped components are reset with the
    /// vacated row.
    pub(crate) fn move_entity(
        &mut self,
        entity: Entity,
        address: EntityAddress,
        mask: &BitField,
    ) -> EntityAddress {
        let src = address.archetype;
        let (dst, created) = self.archetypes.require(mask, &self.registry, &mut self.storages);
        if created {
            self.on_archetype_created(dst);
        }
        if dst == src {
            return address;
        }

        let (from, to) = self.archetypes.pair_mut(src, dst);
        let row = to.allocate_row(entity, &mut self.storages, self.config.initial_row_capacity);
        from.copy_row_to(
            address.row,
            to,
            row,
            &mut self.storages,
            self.registry.bitfields(),
            self.config.sparse_page_reserve,
        );
        self.swap_remove_row(address);

        let moved = EntityAddress::new(dst, row);
        self.entities.set_address(entity, moved);
        self.notify_moved(entity, src, dst);
        moved
    }

    /// Applies a set of additions and removals to the type mask of `entity`
    /// as one move.
    pub(crate) fn restructure(
        &mut self,
        entity: Entity,
        set: &BitFieldGenerator,
        remove: &BitFieldGenerator,
    ) -> Result<EntityAddress, EntityError> {
        let address = self.entities.require_address(entity)?;
        if set.is_empty() && remove.is_empty() {
            return Ok(address);
        }
        let mask = {
            let arche = self.archetypes.expect(address.archetype);
            let mut generator = BitFieldGenerator::from_field(arche.type_mask());
            generator.append_generator(set).subtract_generator(remove);
            generator.build(self.registry.bitfields())
        };
        Ok(self.move_entity(entity, address, &mask))
    }

    /// Vacates `address`, filling it with the archetype's last row.
    ///
    /// The row must no longer hold sparse values.
    pub(crate) fn swap_remove_row(&mut self, address: EntityAddress) {
        let arche = self.archetypes.expect_mut(address.archetype);
        let Some(last) = arche.max_item() else {
            return;
        };
        if address.row != last {
            let moved = arche.entities()[last as usize];
            arche.move_row(last, address.row, &mut self.storages);
            self.entities.set_address(moved, address);
        }
        arche.release_row(last, &mut self.storages);
    }

    /// Matches a new archetype against every query and listener.
    fn on_archetype_created(&mut self, id: ArchetypeId) {
        let queries = self.queries.on_archetype_created(self.archetypes.expect(id));
        if self.listeners.len() == 0 {
            return;
        }
        let arche = self.archetypes.expect_mut(id);
        for query in queries {
            for bit in self.listeners.of_query(query) {
                arche.set_listener(bit, true, self.registry.bitfields());
            }
        }
    }

    /// Notifies listeners of the migration of `entity` from `src` to `dst`.
    fn notify_moved(&mut self, entity: Entity, src: ArchetypeId, dst: ArchetypeId) {
        let from = self.archetypes.expect(src).listener_mask().clone();
        let to = self.archetypes.expect(dst).listener_mask().clone();
        if from.is_empty() && to.is_empty() {
            return;
        }
        for bit in from.difference(&to) {
            if let Some(listener) = self.listeners.get_mut(bit) {
                listener.on_deleted(entity, src);
            }
        }
        for bit in from.intersection(&to) {
            if let Some(listener) = self.listeners.get_mut(bit) {
                listener.on_moved(entity, src, dst);
            }
        }
        for bit in to.difference(&from) {
            if let Some(listener) = self.listeners.get_mut(bit) {
                listener.on_created(entity, dst);
            }
        }
    }

    pub(crate) fn notify_created(&mut self, entity: Entity, arche: ArchetypeId) {
        let mask = self.archetypes.expect(arche).listener_mask().clone();
        for bit in &mask {
            if let Some(listener) = self.listeners.get_mut(bit) {
                listener.on_created(entity, arche);
            }
        }
    }

    pub(crate) fn notify_deleted(&mut self, entity: Entity, arche: ArchetypeId) {
        let mask = self.archetypes.expect(arche).listener_mask().clone();
        for bit in &mask {
            if let Some(listener) = self.listeners.get_mut(bit) {
                listener.on_deleted(entity, arche);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use crate::archetype::ArchetypeId;
    use crate::bitfield::BitFieldGenerator;
    use crate::component::{Component, TypeRegistry};
    use crate::manager::EntityManager;

    #[derive(Clone, Default, Debug, PartialEq)]
    struct A(u32);
    impl Component for A {}

    #[derive(Clone, Default, Debug, PartialEq)]
    struct B(u32);
    impl Component for B {}

    #[derive(Clone, Default, Debug, PartialEq)]
    struct C(u32);
    impl Component for C {}

    #[test]
    fn restructure_is_one_move() {
        let registry = Arc::new(TypeRegistry::new());
        let mut manager = EntityManager::new(registry.clone());
        let entity = manager.create_entity(None);
        manager.add_component_with(entity, A(7)).unwrap();
        let before = manager.archetype_count();

        let (a, b) = (registry.require::<A>(), registry.require::<B>());
        let mut set = BitFieldGenerator::new();
        set.add(b.index());
        let mut remove = BitFieldGenerator::new();
        remove.add(a.index());

        let address = manager.restructure(entity, &set, &remove).unwrap();
        // only {B} is created, no intermediate {A, B}
        assert_eq!(manager.archetype_count(), before + 1);
        assert_ne!(address.archetype, ArchetypeId::EMPTY);
        assert!(!manager.has_component::<A>(entity));
        assert_eq!(manager.get_component::<B>(entity).unwrap(), &B(0));
    }

    #[test]
    fn moved_rows_keep_addresses() {
        let mut manager = EntityManager::new(Arc::new(TypeRegistry::new()));
        let entities: alloc::vec::Vec<_> = (0..4)
            .map(|i| {
                let entity = manager.create_entity(None);
                manager.add_component_with(entity, A(i)).unwrap();
                entity
            })
            .collect();

        // the first row leaves, the last row fills its place
        manager.add_component_with(entities[0], B(9)).unwrap();
        for (i, &entity) in entities.iter().enumerate() {
            assert_eq!(manager.get_component::<A>(entity).unwrap(), &A(i as u32));
        }
        assert_eq!(manager.get_component::<B>(entities[0]).unwrap(), &B(9));
    }

    #[test]
    fn one_archetype_per_distinct_set() {
        let registry = Arc::new(TypeRegistry::new());
        let mut manager = EntityManager::new(registry.clone());
        let bits = [
            registry.require::<A>().index(),
            registry.require::<B>().index(),
            registry.require::<C>().index(),
        ];

        let mut seed = 0x2545_f491_4f6c_dd1d_u64;
        let mut seen = 1_u8; // the empty set
        for _ in 0..64 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let set_bits = (seed % 8) as u8;
            let rotation = (seed >> 8) as usize % 3;
            seen |= 1 << set_bits;

            let mut set = BitFieldGenerator::new();
            for k in 0..3 {
                let i = (k + rotation) % 3;
                if set_bits & (1 << i) != 0 {
                    set.add(bits[i]);
                }
            }
            let entity = manager.create_entity(None);
            manager
                .restructure(entity, &set, &BitFieldGenerator::new())
                .unwrap();
        }

        assert_eq!(manager.archetype_count(), seen.count_ones() as usize);
        let masks = manager
            .archetypes()
            .iter()
            .map(|arche| arche.type_mask().clone())
            .collect::<alloc::vec::Vec<_>>();
        for (i, mask) in masks.iter().enumerate() {
            assert!(masks[i + 1..].iter().all(|other| other != mask));
        }
    }
}
