use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::mem;

use slotmap::SlotMap;
use ts_utils::hash::HashMap;

use super::{EntityPrefab, PrefabKey};
use crate::bitfield::BitFieldGenerator;
use crate::component::{Component, ComponentInfo, TypeRegistry};
use crate::entity::Entity;
use crate::error::EcsError;
use crate::manager::{EntityManager, StageConfig};
use crate::storage::BoxedValue;

const PREFAB_CONFIG: StageConfig = StageConfig {
    initial_row_capacity: 16,
    entity_capacity: 64,
    sparse_page_reserve: 0,
};

struct PrefabRecord {
    name: String,
    entity: Entity,
}

// -----------------------------------------------------------------------------
// PrefabRegistry

/// Named template entities.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use ts_ecs::prelude::*;
///
/// #[derive(Clone, Default, PartialEq, Debug)]
/// struct Speed(f32);
/// impl Component for Speed {}
///
/// let registry = Arc::new(TypeRegistry::new());
/// let mut prefabs = PrefabRegistry::new(registry.clone());
/// let runner = prefabs.create_prefab("runner").add_component(Speed(2.0)).build();
///
/// let mut manager = EntityManager::new(registry);
/// let entity = prefabs.instantiate(&mut manager, runner).unwrap();
/// assert_eq!(manager.get_component::<Speed>(entity).unwrap(), &Speed(2.0));
/// ```
pub struct PrefabRegistry {
    world: EntityManager,
    prefabs: SlotMap<PrefabKey, PrefabRecord>,
    by_name: HashMap<String, PrefabKey>,
}

impl core::fmt::Debug for PrefabRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.prefabs.values().map(|record| &record.name))
            .finish()
    }
}

impl PrefabRegistry {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            world: EntityManager::with_config(registry, PREFAB_CONFIG),
            prefabs: SlotMap::with_key(),
            by_name: HashMap::default(),
        }
    }

    #[inline]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        self.world.registry()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.prefabs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.prefabs.is_empty()
    }

    /// Starts a prefab named `name`.
    ///
    /// Building it replaces a prefab registered under the same name.
    /// Dropping the builder without building discards it.
    pub fn create_prefab(&mut self, name: &str) -> PrefabBuilder<'_> {
        let entity = self.world.create_entity(Some(name));
        PrefabBuilder {
            registry: self,
            name: String::from(name),
            entity,
            built: false,
        }
    }

    /// The prefab registered as `name`.
    pub fn find(&self, name: &str) -> Option<EntityPrefab> {
        let key = *self.by_name.get(name)?;
        let record = self.prefabs.get(key)?;
        Some(EntityPrefab {
            key,
            entity: record.entity,
        })
    }

    pub fn name(&self, prefab: EntityPrefab) -> Option<&str> {
        self.prefabs.get(prefab.key).map(|record| record.name.as_str())
    }

    /// Unregisters `prefab`. Returns `false` if it was already gone.
    pub fn remove(&mut self, prefab: EntityPrefab) -> bool {
        let Some(record) = self.prefabs.remove(prefab.key) else {
            return false;
        };
        self.by_name.remove(&record.name);
        if let Err(err) = self.world.delete_entity(record.entity) {
            err.handle_error();
        }
        true
    }

    /// The `T` of `prefab`.
    pub fn get_component<T: Component>(&self, prefab: EntityPrefab) -> Result<&T, EcsError> {
        let record = self.record(prefab)?;
        self.world.get_component::<T>(record.entity)
    }

    /// Creates an instance of `prefab` in `manager` and returns it.
    ///
    /// The instance reaches its archetype in one move, so listeners only see
    /// its creation there.
    pub fn instantiate(
        &self,
        manager: &mut EntityManager,
        prefab: EntityPrefab,
    ) -> Result<Entity, EcsError> {
        if !manager.shares_registry(self.registry()) {
            return Err(EcsError::RegistryMismatch);
        }
        let values = self.clone_components(prefab)?;

        let mut set = BitFieldGenerator::new();
        for (info, _) in &values {
            if !info.id().is_sparse() {
                set.add(info.id().index());
            }
        }
        let entity = manager.create_entity(None);
        manager.restructure(entity, &set, &BitFieldGenerator::new())?;
        for (info, value) in values {
            manager.insert_boxed(entity, &info, value)?;
        }
        Ok(entity)
    }

    /// Clones the components of `prefab` that instances receive.
    pub(crate) fn clone_components(
        &self,
        prefab: EntityPrefab,
    ) -> Result<Vec<(ComponentInfo, BoxedValue)>, EcsError> {
        let record = self.record(prefab)?;
        Ok(self.world.clone_components(record.entity)?)
    }

    fn record(&self, prefab: EntityPrefab) -> Result<&PrefabRecord, EcsError> {
        self.prefabs
            .get(prefab.key)
            .filter(|record| record.entity == prefab.entity)
            .ok_or(EcsError::UnknownPrefab(prefab.key))
    }

    fn register(&mut self, name: String, entity: Entity) -> EntityPrefab {
        if let Some(old) = self.find(&name) {
            log::debug!("Prefab `{name}` replaces {:?}", old.key);
            self.remove(old);
        }
        let key = self.prefabs.insert(PrefabRecord {
            name: name.clone(),
            entity,
        });
        log::debug!("Registered prefab `{name}` as {key:?}");
        self.by_name.insert(name, key);
        EntityPrefab { key, entity }
    }
}

// -----------------------------------------------------------------------------
// PrefabBuilder

/// Collects the components of a new prefab.
#[must_use = "a prefab is only registered by `build`"]
pub struct PrefabBuilder<'r> {
    registry: &'r mut PrefabRegistry,
    name: String,
    entity: Entity,
    built: bool,
}

impl PrefabBuilder<'_> {
    /// Sets `value` on the prefab, replacing a value set before.
    pub fn add_component<T: Component>(mut self, value: T) -> Self {
        let world = &mut self.registry.world;
        let written = if world.has_component::<T>(self.entity) {
            world
                .get_component_mut::<T>(self.entity)
                .map(|stored| *stored = value)
        } else {
            world.add_component_with(self.entity, value).map(|_| ())
        };
        if let Err(err) = written {
            err.handle_error();
        }
        self
    }

    /// Registers the prefab.
    pub fn build(mut self) -> EntityPrefab {
        self.built = true;
        let name = mem::take(&mut self.name);
        self.registry.register(name, self.entity)
    }
}

impl Drop for PrefabBuilder<'_> {
    fn drop(&mut self) {
        if !self.built {
            let _ = self.registry.world.delete_entity(self.entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec::Vec;
    use std::sync::Mutex;

    use super::PrefabRegistry;
    use crate::archetype::ArchetypeId;
    use crate::command::EntityCommandBuffer;
    use crate::component::{Component, ComponentStorage, Name, TypeRegistry};
    use crate::entity::Entity;
    use crate::error::EcsError;
    use crate::manager::{EntityListener, EntityManager};

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Hp(u32);
    impl Component for Hp {}

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Armor(u32);
    impl Component for Armor {}

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Loot(u32);
    impl Component for Loot {
        const STORAGE: ComponentStorage = ComponentStorage::Sparse;
    }

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Handle(u32);
    impl Component for Handle {
        const NO_CLONE: bool = true;
    }

    #[test]
    fn build_find_instantiate() {
        let registry = Arc::new(TypeRegistry::new());
        let mut prefabs = PrefabRegistry::new(registry.clone());
        let orc = prefabs
            .create_prefab("orc")
            .add_component(Hp(10))
            .add_component(Hp(30))
            .add_component(Armor(2))
            .add_component(Loot(7))
            .add_component(Handle(9))
            .build();
        assert_eq!(prefabs.find("orc"), Some(orc));
        assert_eq!(prefabs.name(orc), Some("orc"));
        assert_eq!(prefabs.get_component::<Hp>(orc).unwrap(), &Hp(30));

        let mut manager = EntityManager::new(registry);
        let a = prefabs.instantiate(&mut manager, orc).unwrap();
        let b = prefabs.instantiate(&mut manager, orc).unwrap();
        for entity in [a, b] {
            assert_eq!(manager.get_component::<Hp>(entity).unwrap(), &Hp(30));
            assert_eq!(manager.get_component::<Armor>(entity).unwrap(), &Armor(2));
            assert_eq!(manager.get_component::<Loot>(entity).unwrap(), &Loot(7));
            assert!(!manager.has_component::<Handle>(entity));
            assert!(!manager.has_component::<Name>(entity));
        }
        assert_eq!(manager.address(a).unwrap().archetype, manager.address(b).unwrap().archetype);

        manager.get_component_mut::<Hp>(a).unwrap().0 = 1;
        assert_eq!(prefabs.get_component::<Hp>(orc).unwrap(), &Hp(30));
    }

    #[test]
    fn names_are_replaced_and_removed() {
        let registry = Arc::new(TypeRegistry::new());
        let mut prefabs = PrefabRegistry::new(registry.clone());
        let first = prefabs.create_prefab("crate").add_component(Hp(1)).build();
        let second = prefabs.create_prefab("crate").add_component(Hp(2)).build();
        assert_eq!(prefabs.len(), 1);
        assert_eq!(prefabs.find("crate"), Some(second));

        let mut manager = EntityManager::new(registry);
        assert!(matches!(
            prefabs.instantiate(&mut manager, first),
            Err(EcsError::UnknownPrefab(_))
        ));

        assert!(prefabs.remove(second));
        assert!(!prefabs.remove(second));
        assert!(prefabs.is_empty());
        assert_eq!(prefabs.find("crate"), None);
    }

    #[test]
    fn dropped_builders_leave_nothing() {
        let mut prefabs = PrefabRegistry::new(Arc::new(TypeRegistry::new()));
        drop(prefabs.create_prefab("half").add_component(Hp(1)));
        assert!(prefabs.is_empty());
        assert_eq!(prefabs.world.entity_count(), 0);
    }

    #[test]
    fn foreign_registries_are_refused() {
        let mut prefabs = PrefabRegistry::new(Arc::new(TypeRegistry::new()));
        let prefab = prefabs.create_prefab("p").build();
        let mut manager = EntityManager::new(Arc::new(TypeRegistry::new()));
        assert!(matches!(
            prefabs.instantiate(&mut manager, prefab),
            Err(EcsError::RegistryMismatch)
        ));

        let mut commands = EntityCommandBuffer::new(Arc::new(TypeRegistry::new()));
        assert!(matches!(
            commands.instantiate(&prefabs, prefab),
            Err(EcsError::RegistryMismatch)
        ));
    }

    struct Created(Arc<Mutex<Vec<(Entity, ArchetypeId)>>>);

    impl EntityListener for Created {
        fn on_created(&mut self, entity: Entity, archetype: ArchetypeId) {
            self.0.lock().unwrap().push((entity, archetype));
        }

        fn on_moved(&mut self, _: Entity, _: ArchetypeId, _: ArchetypeId) {
            panic!("instances are not moved");
        }
    }

    #[test]
    fn instances_arrive_in_one_move() {
        let registry = Arc::new(TypeRegistry::new());
        let mut prefabs = PrefabRegistry::new(registry.clone());
        let knight = prefabs
            .create_prefab("knight")
            .add_component(Hp(5))
            .add_component(Armor(5))
            .build();

        let mut manager = EntityManager::new(registry.clone());
        let armored = manager.begin_query().with::<Armor>().build();
        let log = Arc::new(Mutex::new(Vec::new()));
        manager
            .add_listener(armored, alloc::boxed::Box::new(Created(log.clone())))
            .unwrap();

        let direct = prefabs.instantiate(&mut manager, knight).unwrap();
        let mut commands = EntityCommandBuffer::new(registry);
        let pending = commands.instantiate(&prefabs, knight).unwrap();
        let result = commands.commit(&mut manager).unwrap();
        let deferred = result.resolve(pending).unwrap();

        assert_eq!(manager.get_component::<Hp>(deferred).unwrap(), &Hp(5));
        let arche = manager.address(direct).unwrap().archetype;
        assert_eq!(*log.lock().unwrap(), [(direct, arche), (deferred, arche)]);
        assert_eq!(manager.count(armored).unwrap(), 2);
    }
}
