use alloc::sync::Arc;
use core::fmt::Debug;

use super::{Listeners, StageConfig};
use crate::archetype::Archetypes;
use crate::component::TypeRegistry;
use crate::entity::EntityStorage;
use crate::query::QueryCache;
use crate::storage::Storages;

// -----------------------------------------------------------------------------
// EntityManager

/// Owner of every entity of one stage.
///
/// The [`TypeRegistry`] is shared: managers, command buffers and prefab
/// registries built on the same registry agree on component ids and type
/// masks, and only they can exchange data.
///
/// # Examples
///
/// ```
/// use ts_ecs::prelude::*;
/// # use std::sync::Arc;
///
/// #[derive(Clone, Default, Debug, PartialEq)]
/// struct Value(i32);
/// impl Component for Value {}
///
/// let mut manager = EntityManager::new(Arc::new(TypeRegistry::new()));
/// let entity = manager.create_entity(Some("first"));
/// manager.add_component_with(entity, Value(5)).unwrap();
///
/// assert_eq!(manager.get_component::<Value>(entity).unwrap(), &Value(5));
/// assert_eq!(manager.entity_name(entity), Some("first"));
/// ```
pub struct EntityManager {
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) config: StageConfig,
    pub(crate) entities: EntityStorage,
    pub(crate) archetypes: Archetypes,
    pub(crate) storages: Storages,
    pub(crate) queries: QueryCache,
    pub(crate) listeners: Listeners,
}

impl Debug for EntityManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EntityManager")
            .field("config", &self.config)
            .field("entities", &self.entities)
            .field("archetypes", &self.archetypes)
            .field("storages", &self.storages)
            .field("queries", &self.queries)
            .field("listeners", &self.listeners)
            .finish()
    }
}

impl EntityManager {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self::with_config(registry, StageConfig::DEFAULT)
    }

    pub fn with_config(registry: Arc<TypeRegistry>, config: StageConfig) -> Self {
        let mut storages = Storages::new();
        let archetypes = Archetypes::new(registry.bitfields().empty(), &mut storages);
        Self {
            entities: EntityStorage::with_capacity(config.entity_capacity),
            archetypes,
            storages,
            queries: QueryCache::new(),
            listeners: Listeners::default(),
            registry,
            config,
        }
    }

    #[inline]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    #[inline]
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    #[inline]
    pub fn archetypes(&self) -> &Archetypes {
        &self.archetypes
    }

    #[inline]
    pub fn storages(&self) -> &Storages {
        &self.storages
    }

    #[inline]
    pub fn queries(&self) -> &QueryCache {
        &self.queries
    }

    /// Returns `true` if both sides were built on the same registry.
    #[inline]
    pub fn shares_registry(&self, registry: &Arc<TypeRegistry>) -> bool {
        Arc::ptr_eq(&self.registry, registry)
    }
}
