//! Template entities.
//!
//! A [`PrefabRegistry`] keeps template entities in a private manager.
//! Instantiating one clones its components into a live manager that shares
//! the same [`TypeRegistry`](crate::component::TypeRegistry), skipping those
//! flagged `NO_CLONE`.

mod registry;

pub use registry::{PrefabBuilder, PrefabRegistry};

use crate::entity::Entity;

slotmap::new_key_type! {
    /// Stable key of a registered prefab.
    pub struct PrefabKey;
}

/// Handle of a registered prefab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityPrefab {
    key: PrefabKey,
    entity: Entity,
}

impl EntityPrefab {
    #[inline]
    pub fn key(self) -> PrefabKey {
        self.key
    }

    /// The template entity, living in the registry's private manager.
    #[inline]
    pub fn entity(self) -> Entity {
        self.entity
    }
}
