use crate::archetype::ArchetypeId;
use crate::component::Component;
use crate::error::EcsError;
use crate::manager::EntityManager;
use crate::query::{QueryError, QueryId};
use crate::revision::{ColumnEvent, QueryMonitor, RevisionMonitor};
use crate::utils::DebugName;

impl EntityManager {
    /// A change monitor over the `T` column of `archetype`.
    ///
    /// Returns `None` if the archetype has no such column; sparse columns
    /// exist once a row of the archetype has held the component.
    pub fn monitor<T: Component>(&mut self, archetype: ArchetypeId) -> Option<RevisionMonitor> {
        let id = self.registry.require::<T>();
        let arche = self.archetypes.get(archetype)?;
        arche
            .contains(id)
            .then(|| RevisionMonitor::new(archetype, id))
    }

    /// Reports what changed in the monitored column since the last poll.
    ///
    /// The first poll reports every live row as created.
    pub fn poll(&mut self, monitor: &mut RevisionMonitor, f: impl FnMut(ColumnEvent)) {
        let synced = self
            .archetypes
            .get_mut(monitor.archetype())
            .is_some_and(|arche| arche.sync_monitor(monitor, &mut self.storages.revisions, f));
        if !synced {
            log::warn!(
                "Polled {:?} against archetype {} which has no such column",
                monitor.column(),
                monitor.archetype()
            );
        }
    }

    /// Releases the epochs retained by `monitor`.
    pub fn release_monitor(&mut self, monitor: RevisionMonitor) {
        let (archetype, column) = (monitor.archetype(), monitor.column());
        let released = self
            .archetypes
            .get_mut(archetype)
            .is_some_and(|arche| arche.release_monitor(monitor, &mut self.storages.revisions));
        if !released {
            log::warn!("Released monitor of {column:?} on archetype {archetype} which has no such column");
        }
    }

    /// A monitor over the `T` column of every archetype `query` matches.
    ///
    /// `T` must be required by the query.
    pub fn query_monitor<T: Component>(&mut self, query: QueryId) -> Result<QueryMonitor, EcsError> {
        let id = self.registry.require::<T>();
        let info = self.queries.require(query)?;
        if !info.requires(id) {
            return Err(QueryError::Undeclared {
                name: DebugName::type_name::<T>(),
            }
            .into());
        }
        Ok(QueryMonitor::new(query, id))
    }

    /// Polls every archetype of the monitored query.
    ///
    /// Archetypes seen for the first time report all their rows as created.
    pub fn poll_query(
        &mut self,
        monitor: &mut QueryMonitor,
        mut f: impl FnMut(ArchetypeId, ColumnEvent),
    ) -> Result<(), EcsError> {
        let info = self.queries.require(monitor.query())?;
        for matched in info.matches() {
            let archetype = matched.archetype();
            if monitor.monitors.iter().any(|m| m.archetype() == archetype) {
                continue;
            }
            // sparse columns appear lazily
            if self.archetypes.expect(archetype).contains(monitor.column()) {
                monitor
                    .monitors
                    .push(RevisionMonitor::new(archetype, monitor.column()));
            }
        }

        for inner in &mut monitor.monitors {
            let archetype = inner.archetype();
            self.archetypes.expect_mut(archetype).sync_monitor(
                inner,
                &mut self.storages.revisions,
                |event| f(archetype, event),
            );
        }
        Ok(())
    }

    /// Releases every per-archetype monitor of `monitor`.
    pub fn release_query_monitor(&mut self, monitor: QueryMonitor) {
        for inner in monitor.monitors {
            self.release_monitor(inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec::Vec;

    use crate::archetype::ArchetypeId;
    use crate::component::{Component, ComponentStorage, TypeRegistry};
    use crate::manager::EntityManager;
    use crate::revision::{ColumnEvent, RevisionMonitor};

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Value(i32);
    impl Component for Value {}

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Extra;
    impl Component for Extra {}

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Note(i32);
    impl Component for Note {
        const STORAGE: ComponentStorage = ComponentStorage::Sparse;
    }

    fn poll_all(manager: &mut EntityManager, monitor: &mut RevisionMonitor) -> Vec<ColumnEvent> {
        let mut events = Vec::new();
        manager.poll(monitor, |event| events.push(event));
        events
    }

    #[test]
    fn dense_changes_reported_once() {
        let mut manager = EntityManager::new(Arc::new(TypeRegistry::new()));
        let a = manager.create_entity(None);
        let b = manager.create_entity(None);
        manager.add_component_with(a, Value(1)).unwrap();
        manager.add_component_with(b, Value(2)).unwrap();
        let arche = manager.address(a).unwrap().archetype;

        let mut monitor = manager.monitor::<Value>(arche).unwrap();
        assert!(manager.monitor::<Value>(ArchetypeId::EMPTY).is_none());
        assert_eq!(
            poll_all(&mut manager, &mut monitor),
            [ColumnEvent::Created(0), ColumnEvent::Created(1)]
        );
        assert!(poll_all(&mut manager, &mut monitor).is_empty());

        manager.get_component_mut::<Value>(b).unwrap().0 = 20;
        assert_eq!(poll_all(&mut manager, &mut monitor), [ColumnEvent::Modified(1)]);
        assert!(poll_all(&mut manager, &mut monitor).is_empty());

        // b moves from row 1 to row 0
        manager.delete_entity(a).unwrap();
        let events = poll_all(&mut manager, &mut monitor);
        assert!(events.contains(&ColumnEvent::Destroyed(1)));
        assert!(events.iter().any(|event| event.row() == 0));

        manager.release_monitor(monitor);
    }

    #[test]
    fn writes_through_queries_are_modifications() {
        let mut manager = EntityManager::new(Arc::new(TypeRegistry::new()));
        for i in 0..3 {
            let entity = manager.create_entity(None);
            manager.add_component_with(entity, Value(i)).unwrap();
        }
        let q = manager.begin_query().with::<Value>().build();
        let mut monitor = manager.query_monitor::<Value>(q).unwrap();

        let mut events = Vec::new();
        manager
            .poll_query(&mut monitor, |_, event| events.push(event))
            .unwrap();
        assert_eq!(events.len(), 3);

        manager
            .for_each::<&mut Value>(q, |_, value| {
                if value.0 == 1 {
                    value.0 = 10;
                }
            })
            .unwrap();
        // every visited row counts as written
        events.clear();
        manager
            .poll_query(&mut monitor, |_, event| events.push(event))
            .unwrap();
        assert_eq!(
            events,
            [ColumnEvent::Modified(0), ColumnEvent::Modified(1), ColumnEvent::Modified(2)]
        );

        // a new matching archetype bootstraps on the next poll
        let entity = manager.create_entity(None);
        manager.add_component::<Extra>(entity).unwrap();
        manager.add_component_with(entity, Value(7)).unwrap();
        let arche = manager.address(entity).unwrap().archetype;
        events.clear();
        let mut archetypes = Vec::new();
        manager
            .poll_query(&mut monitor, |archetype, event| {
                archetypes.push(archetype);
                events.push(event);
            })
            .unwrap();
        assert_eq!(archetypes, [arche]);
        assert_eq!(events, [ColumnEvent::Created(0)]);

        manager.release_query_monitor(monitor);
    }

    #[test]
    fn sparse_monitor_uses_logical_rows() {
        let mut manager = EntityManager::new(Arc::new(TypeRegistry::new()));
        let entities: Vec<_> = (0..40).map(|_| manager.create_entity(None)).collect();
        assert!(manager.monitor::<Note>(ArchetypeId::EMPTY).is_none());

        manager.add_component_with(entities[35], Note(1)).unwrap();
        let mut monitor = manager.monitor::<Note>(ArchetypeId::EMPTY).unwrap();
        assert_eq!(poll_all(&mut manager, &mut monitor), [ColumnEvent::Created(35)]);

        manager.add_component_with(entities[3], Note(2)).unwrap();
        manager.get_component_mut::<Note>(entities[35]).unwrap().0 = 5;
        assert_eq!(
            poll_all(&mut manager, &mut monitor),
            [ColumnEvent::Created(3), ColumnEvent::Modified(35)]
        );

        manager.remove_component::<Note>(entities[3]).unwrap();
        assert_eq!(poll_all(&mut manager, &mut monitor), [ColumnEvent::Destroyed(3)]);
        manager.release_monitor(monitor);
    }
}
