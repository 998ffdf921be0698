use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::mem;

use ts_utils::hash::HashMap;

use super::{ErasedStaging, typed_staging};
use crate::bitfield::BitFieldGenerator;
use crate::component::{Component, ComponentInfo, TypeRegistry};
use crate::entity::Entity;
use crate::error::EcsError;
use crate::manager::EntityManager;
use crate::prefab::{EntityPrefab, PrefabRegistry};

// -----------------------------------------------------------------------------
// CommitResult

/// What a [`commit`](EntityCommandBuffer::commit) did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommitResult {
    /// Real entities backing the deferred handles, in creation order.
    pub created: Vec<Entity>,
    /// Targets that were no longer live and got skipped.
    pub skipped: Vec<Entity>,
}

impl CommitResult {
    /// The real entity behind a deferred handle of the committed buffer.
    ///
    /// Returns `None` for handles that are not deferred or belong to
    /// another buffer.
    pub fn resolve(&self, deferred: Entity) -> Option<Entity> {
        let index = deferred.deferred_index()?;
        self.created.get(index as usize).copied()
    }
}

// -----------------------------------------------------------------------------
// EntityCommandBuffer

struct BufferedEntity {
    target: Entity,
    set: BitFieldGenerator,
    remove: BitFieldGenerator,
    sparse_set: BitFieldGenerator,
    sparse_remove: BitFieldGenerator,
    delete: bool,
}

impl BufferedEntity {
    fn new(target: Entity) -> Self {
        Self {
            target,
            set: BitFieldGenerator::new(),
            remove: BitFieldGenerator::new(),
            sparse_set: BitFieldGenerator::new(),
            sparse_remove: BitFieldGenerator::new(),
            delete: false,
        }
    }

    fn stage_add(&mut self, info: &ComponentInfo) {
        let bit = info.id().index();
        if info.id().is_sparse() {
            self.sparse_set.add(bit);
            self.sparse_remove.remove(bit);
        } else {
            self.set.add(bit);
            self.remove.remove(bit);
        }
    }

    fn stage_remove(&mut self, info: &ComponentInfo) {
        let bit = info.id().index();
        if info.id().is_sparse() {
            self.sparse_set.remove(bit);
            self.sparse_remove.add(bit);
        } else {
            self.set.remove(bit);
            self.remove.add(bit);
        }
    }
}

/// Structural edits recorded now and applied later in one pass.
///
/// Each buffered entity accumulates the components to set and to remove;
/// [`commit`](Self::commit) replays them as a single archetype move per
/// entity, then applies the sparse edits. This is the way to change the
/// layout of entities while a query over them is being iterated.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use ts_ecs::prelude::*;
///
/// #[derive(Clone, Default)]
/// struct Health(u32);
/// impl Component for Health {}
///
/// let registry = Arc::new(TypeRegistry::new());
/// let mut manager = EntityManager::new(registry.clone());
/// let mut commands = EntityCommandBuffer::new(registry);
///
/// let pending = commands.create_deferred_entity();
/// commands.add_component(pending, Health(10));
///
/// let result = commands.commit(&mut manager).unwrap();
/// let entity = result.resolve(pending).unwrap();
/// assert_eq!(manager.get_component::<Health>(entity).unwrap().0, 10);
/// ```
pub struct EntityCommandBuffer {
    registry: Arc<TypeRegistry>,
    entries: Vec<BufferedEntity>,
    slots: HashMap<Entity, u32>,
    deferred: u32,
    // staging per component, indexed by mask bit; a slot per entry
    dense: Vec<Option<Box<dyn ErasedStaging>>>,
    sparse: Vec<Option<Box<dyn ErasedStaging>>>,
}

impl Debug for EntityCommandBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EntityCommandBuffer")
            .field("entities", &self.entries.len())
            .field("deferred", &self.deferred)
            .finish()
    }
}

impl EntityCommandBuffer {
    /// Creates an empty buffer for managers sharing `registry`.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            entries: Vec::new(),
            slots: HashMap::default(),
            deferred: 0,
            dense: Vec::new(),
            sparse: Vec::new(),
        }
    }

    /// Creates an empty buffer sharing the registry of `manager`.
    #[inline]
    pub fn for_manager(manager: &EntityManager) -> Self {
        Self::new(manager.registry().clone())
    }

    #[inline]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Returns `true` if nothing is recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entities with recorded edits.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Creates an entity right away.
    ///
    /// Not allowed while iterating `manager`; use
    /// [`create_deferred_entity`](Self::create_deferred_entity) there.
    #[inline]
    pub fn create_entity(&mut self, manager: &mut EntityManager) -> Entity {
        manager.create_entity(None)
    }

    /// Returns a placeholder handle for an entity created on commit.
    ///
    /// The handle is only meaningful to this buffer and to
    /// [`CommitResult::resolve`].
    pub fn create_deferred_entity(&mut self) -> Entity {
        let entity = Entity::deferred(self.deferred);
        self.deferred += 1;
        self.entry(entity);
        entity
    }

    /// Records setting `value` on `entity`, replacing its current value or a
    /// value recorded before.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) {
        let info = self.registry.require_info(self.registry.require::<T>());
        let slot = self.entry(entity);
        self.entries[slot].stage_add(&info);
        let staging = self.staging(&info);
        typed_staging::<T>(staging).insert(slot, value);
    }

    /// Records removing the `T` of `entity`, dropping a value recorded before.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) {
        let info = self.registry.require_info(self.registry.require::<T>());
        let slot = self.entry(entity);
        self.entries[slot].stage_remove(&info);
        if let Some(staging) = self.existing_staging(&info) {
            staging.discard(slot);
        }
    }

    /// Records deleting `entity`. Other edits of it are dropped on commit.
    pub fn delete_entity(&mut self, entity: Entity) {
        let slot = self.entry(entity);
        self.entries[slot].delete = true;
    }

    /// Records creating an instance of `prefab` and returns its deferred
    /// handle. Components are cloned from the prefab now.
    pub fn instantiate(
        &mut self,
        prefabs: &PrefabRegistry,
        prefab: EntityPrefab,
    ) -> Result<Entity, EcsError> {
        if !Arc::ptr_eq(prefabs.registry(), &self.registry) {
            return Err(EcsError::RegistryMismatch);
        }
        let values = prefabs.clone_components(prefab)?;
        let entity = self.create_deferred_entity();
        let slot = self.entry(entity);
        for (info, value) in values {
            self.entries[slot].stage_add(&info);
            self.staging(&info).insert_boxed(slot, value);
        }
        Ok(entity)
    }

    /// Applies every recorded edit to `manager`, then clears the buffer.
    ///
    /// Deferred entities are created first, in the order they were
    /// requested. Each target then moves once to its final archetype and
    /// receives its values. Targets that are no longer live are skipped and
    /// reported.
    pub fn commit(&mut self, manager: &mut EntityManager) -> Result<CommitResult, EcsError> {
        if !manager.shares_registry(&self.registry) {
            return Err(EcsError::RegistryMismatch);
        }

        let created = (0..self.deferred)
            .map(|_| manager.create_entity(None))
            .collect::<Vec<_>>();
        let mut skipped = Vec::new();
        let entries = mem::take(&mut self.entries);
        let replayed = self.replay(&entries, &created, &mut skipped, manager);
        let count = entries.len();
        self.entries = entries;
        self.clear();
        replayed?;

        log::trace!(
            "Committed {count} buffered entities, {} created, {} skipped",
            created.len(),
            skipped.len()
        );
        Ok(CommitResult { created, skipped })
    }

    /// Drops every recorded edit.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.slots.clear();
        self.deferred = 0;
        for staging in self.dense.iter_mut().chain(self.sparse.iter_mut()).flatten() {
            staging.clear();
        }
    }

    fn replay(
        &mut self,
        entries: &[BufferedEntity],
        created: &[Entity],
        skipped: &mut Vec<Entity>,
        manager: &mut EntityManager,
    ) -> Result<(), EcsError> {
        for (slot, entry) in entries.iter().enumerate() {
            let target = match entry.target.deferred_index() {
                Some(n) => created.get(n as usize).copied(),
                None => Some(entry.target),
            };
            let Some(target) = target.filter(|target| manager.is_valid(*target)) else {
                log::warn!("Skipped buffered edits of {} which is not live", entry.target);
                skipped.push(entry.target);
                continue;
            };

            if entry.delete {
                manager.delete_entity(target)?;
                continue;
            }

            manager.restructure(target, &entry.set, &entry.remove)?;
            for bit in entry.set.iter() {
                if let Some(Some(staging)) = self.dense.get_mut(bit) {
                    staging.apply(slot, target, manager)?;
                }
            }
            for bit in entry.sparse_remove.iter() {
                if let Some(info) = self.registry.sparse_info(bit) {
                    manager.remove_sparse_id(target, info.id())?;
                }
            }
            for bit in entry.sparse_set.iter() {
                if let Some(Some(staging)) = self.sparse.get_mut(bit) {
                    staging.apply(slot, target, manager)?;
                }
            }
        }
        Ok(())
    }

    /// Slot of the entry recording edits of `entity`.
    fn entry(&mut self, entity: Entity) -> usize {
        let entries = &mut self.entries;
        *self.slots.entry(entity).or_insert_with(|| {
            entries.push(BufferedEntity::new(entity));
            (entries.len() - 1) as u32
        }) as usize
    }

    fn table(&mut self, info: &ComponentInfo) -> &mut Vec<Option<Box<dyn ErasedStaging>>> {
        if info.id().is_sparse() {
            &mut self.sparse
        } else {
            &mut self.dense
        }
    }

    fn staging(&mut self, info: &ComponentInfo) -> &mut (dyn ErasedStaging + 'static) {
        let index = info.id().index();
        let table = self.table(info);
        if index >= table.len() {
            table.resize_with(index + 1, || None);
        }
        &mut **table[index].get_or_insert_with(|| info.new_staging())
    }

    fn existing_staging(&mut self, info: &ComponentInfo) -> Option<&mut dyn ErasedStaging> {
        let index = info.id().index();
        let staging = self.table(info).get_mut(index)?.as_mut()?;
        Some(&mut **staging)
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::sync::Arc;
    use alloc::vec::Vec;

    use super::EntityCommandBuffer;
    use crate::component::{Component, ComponentStorage, TypeRegistry};
    use crate::entity::Entity;
    use crate::error::EcsError;
    use crate::manager::EntityManager;
    use crate::query::QueryId;

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Pos(i32);
    impl Component for Pos {}

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Vel(i32);
    impl Component for Vel {}

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Tag(String);
    impl Component for Tag {
        const STORAGE: ComponentStorage = ComponentStorage::Sparse;
    }

    fn setup() -> (EntityManager, EntityCommandBuffer) {
        let registry = Arc::new(TypeRegistry::new());
        (
            EntityManager::new(registry.clone()),
            EntityCommandBuffer::new(registry),
        )
    }

    #[test]
    fn deferred_entities_are_created_on_commit() {
        let (mut manager, mut commands) = setup();
        let first = commands.create_deferred_entity();
        let second = commands.create_deferred_entity();
        assert!(first.is_deferred());
        assert_ne!(first, second);

        commands.add_component(first, Pos(1));
        commands.add_component(first, Vel(2));
        commands.add_component(second, Tag("b".into()));
        assert_eq!(manager.entity_count(), 0);

        let result = commands.commit(&mut manager).unwrap();
        assert!(commands.is_empty());
        assert_eq!(result.created.len(), 2);
        assert!(result.skipped.is_empty());

        let first = result.resolve(first).unwrap();
        let second = result.resolve(second).unwrap();
        assert_eq!(manager.get_component::<Pos>(first).unwrap(), &Pos(1));
        assert_eq!(manager.get_component::<Vel>(first).unwrap(), &Vel(2));
        assert_eq!(manager.get_component::<Tag>(second).unwrap().0, "b");
        assert!(!manager.has_component::<Pos>(second));
        assert_eq!(result.resolve(first), None);

        // handles restart after a commit
        assert_eq!(commands.create_deferred_entity(), Entity::deferred(0));
    }

    #[test]
    fn edits_replay_as_one_move() {
        let (mut manager, mut commands) = setup();
        let entity = manager.create_entity(None);
        manager.add_component_with(entity, Pos(1)).unwrap();
        let before = manager.archetype_count();

        commands.add_component(entity, Vel(5));
        commands.add_component(entity, Vel(6));
        commands.remove_component::<Pos>(entity);
        commands.add_component(entity, Tag("t".into()));
        commands.commit(&mut manager).unwrap();

        // only {Vel} is created, never {Pos, Vel}
        assert_eq!(manager.archetype_count(), before + 1);
        assert!(!manager.has_component::<Pos>(entity));
        assert_eq!(manager.get_component::<Vel>(entity).unwrap(), &Vel(6));
        assert_eq!(manager.get_component::<Tag>(entity).unwrap().0, "t");

        commands.remove_component::<Tag>(entity);
        commands.add_component(entity, Vel(7));
        commands.commit(&mut manager).unwrap();
        assert!(!manager.has_component::<Tag>(entity));
        assert_eq!(manager.get_component::<Vel>(entity).unwrap(), &Vel(7));
    }

    #[test]
    fn remove_drops_a_staged_value() {
        let (mut manager, mut commands) = setup();
        let entity = manager.create_entity(None);
        commands.add_component(entity, Pos(3));
        commands.remove_component::<Pos>(entity);
        commands.add_component(entity, Tag("x".into()));
        commands.remove_component::<Tag>(entity);
        commands.commit(&mut manager).unwrap();
        assert!(!manager.has_component::<Pos>(entity));
        assert!(!manager.has_component::<Tag>(entity));
    }

    #[test]
    fn stale_targets_are_skipped() {
        let (mut manager, mut commands) = setup();
        let gone = manager.create_entity(None);
        let kept = manager.create_entity(None);
        commands.add_component(gone, Pos(1));
        commands.add_component(kept, Pos(2));
        manager.delete_entity(gone).unwrap();

        let result = commands.commit(&mut manager).unwrap();
        assert_eq!(result.skipped, [gone]);
        assert_eq!(manager.get_component::<Pos>(kept).unwrap(), &Pos(2));
    }

    #[test]
    fn deletes_are_replayed() {
        let (mut manager, mut commands) = setup();
        let entities = (0..4).map(|_| manager.create_entity(None)).collect::<Vec<_>>();
        for (i, entity) in entities.iter().enumerate() {
            manager.add_component_with(*entity, Pos(i as i32)).unwrap();
        }
        let q: QueryId = manager.begin_query().with::<Pos>().build();

        manager
            .for_each::<&Pos>(q, |entity, pos| {
                if pos.0 % 2 == 0 {
                    commands.delete_entity(entity);
                } else {
                    commands.add_component(entity, Vel(pos.0));
                }
            })
            .unwrap();
        commands.commit(&mut manager).unwrap();

        assert_eq!(manager.entity_count(), 2);
        assert!(!manager.is_valid(entities[0]));
        assert_eq!(manager.get_component::<Vel>(entities[3]).unwrap(), &Vel(3));
        assert_eq!(manager.count(q).unwrap(), 2);
    }

    #[test]
    fn foreign_managers_are_refused() {
        let (_, mut commands) = setup();
        let mut other = EntityManager::new(Arc::new(TypeRegistry::new()));
        commands.create_deferred_entity();
        assert!(matches!(
            commands.commit(&mut other),
            Err(EcsError::RegistryMismatch)
        ));
        assert!(!commands.is_empty());
        assert_eq!(other.entity_count(), 0);
    }
}
