use alloc::vec::Vec;

use crate::archetype::ArchetypeId;
use crate::bitfield::BitField;
use crate::cfg;
use crate::component::ComponentId;
use crate::entity::Entity;
use crate::error::EcsError;
use crate::manager::EntityManager;
use crate::query::{
    Access, ColumnCheckout, QueryBuilder, QueryData, QueryError, QueryId, QueryInfo, RowFilter,
};

impl EntityManager {
    /// Starts building a query.
    #[inline]
    pub fn begin_query(&mut self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }

    pub(crate) fn register_query(&mut self, masks: [BitField; 4]) -> QueryId {
        self.queries.register(masks, &self.archetypes)
    }

    #[inline]
    pub fn query_info(&self, query: QueryId) -> Result<&QueryInfo, QueryError> {
        self.queries.require(query)
    }

    /// Calls `f` with every entity matched by `query` and its `D` data.
    ///
    /// Components accessed by `D` must be required by the query, each at
    /// most once. Rows written through `&mut T` are recorded as modified for
    /// change monitors.
    ///
    /// # Examples
    ///
    /// ```
    /// use ts_ecs::prelude::*;
    /// # use std::sync::Arc;
    ///
    /// #[derive(Clone, Default)]
    /// struct Pos(f32);
    /// impl Component for Pos {}
    ///
    /// #[derive(Clone, Default)]
    /// struct Vel(f32);
    /// impl Component for Vel {}
    ///
    /// let mut manager = EntityManager::new(Arc::new(TypeRegistry::new()));
    /// let entity = manager.create_entity(None);
    /// manager.add_component_with(entity, Pos(1.0)).unwrap();
    /// manager.add_component_with(entity, Vel(0.5)).unwrap();
    ///
    /// let moving = manager.begin_query().with::<Pos>().with::<Vel>().build();
    /// manager
    ///     .for_each::<(&mut Pos, &Vel)>(moving, |_, (pos, vel)| pos.0 += vel.0)
    ///     .unwrap();
    /// assert_eq!(manager.get_component::<Pos>(entity).unwrap().0, 1.5);
    /// ```
    pub fn for_each<D: QueryData>(
        &mut self,
        query: QueryId,
        mut f: impl for<'b> FnMut(Entity, D::Item<'b>),
    ) -> Result<(), EcsError> {
        let info = self.queries.require(query)?;
        let mut access = Vec::new();
        D::access(&self.registry, &mut access);
        check_access(info, &access)?;

        let writes: Vec<ComponentId> = access
            .iter()
            .filter(|access| access.write)
            .map(|access| access.id)
            .collect();
        let mut written: Vec<(ArchetypeId, Vec<u32>)> = Vec::new();

        let mut checkout = ColumnCheckout::<D>::new(&self.registry, &mut self.storages.columns);
        for matched in info.matches() {
            let arche = self.archetypes.expect(matched.archetype());
            if arche.is_empty() {
                continue;
            }
            let filter = match info.is_dense_only() {
                true => None,
                false => match RowFilter::new(info, arche) {
                    Some(filter) => Some(filter),
                    None => continue,
                },
            };

            let revision = arche.revision();
            let mut rows = Vec::new();
            let mut locator = checkout.locate(arche);
            let mut visit = |row: u32| {
                f(arche.entities()[row as usize], D::fetch(&mut locator, row as usize));
                if !writes.is_empty() {
                    rows.push(row);
                }
            };
            match &filter {
                Some(filter) => filter.rows().for_each(&mut visit),
                None => (0..arche.len() as u32).for_each(&mut visit),
            }

            if cfg::DEBUG && arche.revision() != revision {
                mutated_during_iteration(arche.id());
            }
            if !rows.is_empty() {
                written.push((arche.id(), rows));
            }
        }
        drop(checkout);

        for (arche, rows) in written {
            let arche = self.archetypes.expect_mut(arche);
            for &id in &writes {
                for &row in &rows {
                    arche.mark_modified(id, row, &mut self.storages);
                }
            }
        }
        Ok(())
    }

    /// Number of entities matched by `query`.
    pub fn count(&self, query: QueryId) -> Result<usize, QueryError> {
        let info = self.queries.require(query)?;
        let mut count = 0;
        for matched in info.matches() {
            let arche = self.archetypes.expect(matched.archetype());
            count += match info.is_dense_only() {
                true => arche.len(),
                false => RowFilter::new(info, arche).map_or(0, |filter| filter.rows().count()),
            };
        }
        Ok(count)
    }

    /// Entities matched by `query`, in archetype then row order.
    pub fn entities(&self, query: QueryId) -> Result<Vec<Entity>, QueryError> {
        let info = self.queries.require(query)?;
        let mut entities = Vec::new();
        for matched in info.matches() {
            let arche = self.archetypes.expect(matched.archetype());
            match info.is_dense_only() {
                true => entities.extend_from_slice(arche.entities()),
                false => {
                    if let Some(filter) = RowFilter::new(info, arche) {
                        entities.extend(filter.rows().map(|row| arche.entities()[row as usize]));
                    }
                }
            }
        }
        Ok(entities)
    }
}

/// Every accessed component must be required by the query, once.
fn check_access(info: &QueryInfo, access: &[Access]) -> Result<(), QueryError> {
    for (i, item) in access.iter().enumerate() {
        if !info.requires(item.id) {
            return Err(QueryError::Undeclared { name: item.name });
        }
        if access[..i].iter().any(|other| other.id == item.id) {
            return Err(QueryError::Conflict { name: item.name });
        }
    }
    Ok(())
}

#[cold]
#[inline(never)]
fn mutated_during_iteration(id: ArchetypeId) -> ! {
    panic!("archetype {id} was restructured while a query iterated it");
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec::Vec;

    use crate::component::{Component, ComponentStorage, TypeRegistry};
    use crate::entity::Entity;
    use crate::error::EcsError;
    use crate::manager::EntityManager;
    use crate::query::{QueryError, QueryId};

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Pos(i64);
    impl Component for Pos {}

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Vel(i64);
    impl Component for Vel {}

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Frozen;
    impl Component for Frozen {}

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Boost(i64);
    impl Component for Boost {
        const STORAGE: ComponentStorage = ComponentStorage::Sparse;
    }

    /// Deterministic xorshift generator.
    struct Rng(u64);

    impl Rng {
        fn next(&mut self) -> u64 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            self.0 = x;
            x
        }

        fn below(&mut self, n: u64) -> u64 {
            self.next() % n
        }
    }

    fn manager() -> EntityManager {
        EntityManager::new(Arc::new(TypeRegistry::new()))
    }

    #[test]
    fn iterate_and_write() {
        let mut manager = manager();
        let mut entities = Vec::new();
        for i in 0..10 {
            let entity = manager.create_entity(None);
            manager.add_component_with(entity, Pos(i)).unwrap();
            manager.add_component_with(entity, Vel(1)).unwrap();
            if i % 2 == 0 {
                manager.add_component::<Frozen>(entity).unwrap();
            }
            entities.push(entity);
        }

        let moving = manager
            .begin_query()
            .with::<Pos>()
            .with::<Vel>()
            .without::<Frozen>()
            .build();
        assert_eq!(manager.count(moving).unwrap(), 5);

        manager
            .for_each::<(&mut Pos, &Vel)>(moving, |_, (pos, vel)| pos.0 += vel.0 * 100)
            .unwrap();
        for (i, &entity) in entities.iter().enumerate() {
            let expected = if i % 2 == 0 { i as i64 } else { i as i64 + 100 };
            assert_eq!(manager.get_component::<Pos>(entity).unwrap(), &Pos(expected));
        }
    }

    #[test]
    fn sparse_data_and_filters() {
        let mut manager = manager();
        let mut boosted = Vec::new();
        for i in 0..80 {
            let entity = manager.create_entity(None);
            manager.add_component_with(entity, Pos(i)).unwrap();
            if i % 7 == 0 {
                manager.add_component_with(entity, Boost(i)).unwrap();
                boosted.push(entity);
            }
        }

        let with = manager.begin_query().with::<Pos>().with::<Boost>().build();
        let without = manager.begin_query().with::<Pos>().without::<Boost>().build();
        assert_eq!(manager.entities(with).unwrap(), boosted);
        assert_eq!(manager.count(without).unwrap(), 80 - boosted.len());

        let mut seen = Vec::new();
        manager
            .for_each::<(&Pos, &mut Boost)>(with, |entity, (pos, boost)| {
                assert_eq!(pos.0, boost.0);
                boost.0 += 1;
                seen.push(entity);
            })
            .unwrap();
        assert_eq!(seen, boosted);
        assert_eq!(manager.get_component::<Boost>(boosted[1]).unwrap(), &Boost(8));
    }

    #[test]
    fn access_is_checked() {
        let mut manager = manager();
        let q = manager.begin_query().with::<Pos>().build();
        assert!(matches!(
            manager.for_each::<&Vel>(q, |_, _| {}),
            Err(EcsError::Query(QueryError::Undeclared { .. }))
        ));
        assert!(matches!(
            manager.for_each::<(&Pos, &mut Pos)>(q, |_, _| {}),
            Err(EcsError::Query(QueryError::Conflict { .. }))
        ));
        manager.for_each::<&Pos>(q, |_, _| {}).unwrap();
    }

    #[test]
    fn query_sees_later_archetypes() {
        let mut manager = manager();
        let q = manager.begin_query().with::<Pos>().build();
        assert_eq!(manager.count(q).unwrap(), 0);

        let entity = manager.create_entity(None);
        manager.add_component::<Pos>(entity).unwrap();
        manager.add_component::<Vel>(entity).unwrap();
        assert_eq!(manager.entities(q).unwrap(), [entity]);

        manager.remove_component::<Pos>(entity).unwrap();
        assert_eq!(manager.count(q).unwrap(), 0);
    }

    /// Random component churn: every query reports exactly the entities
    /// whose component set satisfies it, and every mask has one archetype.
    #[test]
    fn membership_under_churn() {
        let mut manager = manager();
        let mut rng = Rng(0x2545_f491_4f6c_dd1d);
        // bit 0 Pos, bit 1 Vel, bit 2 Frozen, bit 3 Boost
        let mut live: Vec<(Entity, u8)> = Vec::new();

        let queries: [(QueryId, u8, u8); 5] = [
            (manager.begin_query().with::<Pos>().build(), 0b0001, 0b0000),
            (manager.begin_query().with::<Pos>().with::<Vel>().build(), 0b0011, 0b0000),
            (manager.begin_query().with::<Vel>().without::<Frozen>().build(), 0b0010, 0b0100),
            (manager.begin_query().without::<Pos>().build(), 0b0000, 0b0001),
            (manager.begin_query().with::<Boost>().without::<Vel>().build(), 0b1000, 0b0010),
        ];

        for _ in 0..600 {
            match rng.below(8) {
                0 | 1 => live.push((manager.create_entity(None), 0)),
                2 if !live.is_empty() => {
                    let (entity, _) = live.swap_remove(rng.below(live.len() as u64) as usize);
                    manager.delete_entity(entity).unwrap();
                }
                _ if !live.is_empty() => {
                    let index = rng.below(live.len() as u64) as usize;
                    let (entity, set) = &mut live[index];
                    let bit = 1 << rng.below(4);
                    let present = *set & bit != 0;
                    let done = match (bit, present) {
                        (0b0001, false) => manager.add_component::<Pos>(*entity).is_ok(),
                        (0b0001, true) => manager.try_remove_component::<Pos>(*entity),
                        (0b0010, false) => manager.add_component::<Vel>(*entity).is_ok(),
                        (0b0010, true) => manager.try_remove_component::<Vel>(*entity),
                        (0b0100, false) => manager.add_component::<Frozen>(*entity).is_ok(),
                        (0b0100, true) => manager.try_remove_component::<Frozen>(*entity),
                        (_, false) => manager.add_component::<Boost>(*entity).is_ok(),
                        (_, true) => manager.try_remove_component::<Boost>(*entity),
                    };
                    assert!(done);
                    *set ^= bit;
                }
                _ => {}
            }
        }

        for &(query, with, without) in &queries {
            let mut expected: Vec<Entity> = live
                .iter()
                .filter(|(_, set)| set & with == with && set & without == 0)
                .map(|&(entity, _)| entity)
                .collect();
            let mut actual = manager.entities(query).unwrap();
            expected.sort();
            actual.sort();
            assert_eq!(actual, expected);
        }

        for (i, a) in manager.archetypes().iter().enumerate() {
            for b in manager.archetypes().iter().skip(i + 1) {
                assert_ne!(a.type_mask(), b.type_mask());
            }
        }
        let rows: usize = manager.archetypes().iter().map(|arche| arche.len()).sum();
        assert_eq!(rows, live.len());
    }
}
