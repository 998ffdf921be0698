use alloc::vec::Vec;
use core::fmt::Debug;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use ts_utils::TypeIdMap;

use super::{Component, ComponentDescriptor, ComponentId, ComponentInfo};
use super::{ComponentStorage, TypeCategory};
use crate::bitfield::{BitFieldCache, MAX_BITS};

// -----------------------------------------------------------------------------
// TypeRegistry

struct Registered {
    by_type: TypeIdMap<ComponentId>,
    dense: Vec<ComponentInfo>,
    sparse: Vec<ComponentInfo>,
}

/// The context shared by every storage that exchanges component data.
///
/// Assigns [`ComponentId`]s lazily on first use and owns the [`BitFieldCache`]
/// that interns type masks. Managers, command buffers and prefab registries
/// that share one `Arc<TypeRegistry>` agree on ids and mask identity.
///
/// Registration is the only concurrent path of the crate: lookups take a read
/// lock, a miss retries under the write lock before assigning a new id.
pub struct TypeRegistry {
    components: RwLock<Registered>,
    bitfields: BitFieldCache,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            components: RwLock::new(Registered {
                by_type: TypeIdMap::new(),
                dense: Vec::new(),
                sparse: Vec::new(),
            }),
            bitfields: BitFieldCache::new(),
        }
    }

    #[inline]
    fn read(&self) -> RwLockReadGuard<'_, Registered> {
        self.components.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cache interning every type mask built against this registry.
    #[inline(always)]
    pub fn bitfields(&self) -> &BitFieldCache {
        &self.bitfields
    }

    /// Returns the id of `T`, assigning one on first use.
    #[inline]
    pub fn require<T: Component>(&self) -> ComponentId {
        match self.get::<T>() {
            Some(id) => id,
            None => self.register::<T>(),
        }
    }

    /// Returns the id of `T` if it was registered.
    #[inline]
    pub fn get<T: Component>(&self) -> Option<ComponentId> {
        self.read().by_type.get_type::<T>().copied()
    }

    #[cold]
    #[inline(never)]
    fn register<T: Component>(&self) -> ComponentId {
        let mut guard = self.components.write().unwrap_or_else(PoisonError::into_inner);
        let components = &mut *guard;

        if let Some(&id) = components.by_type.get_type::<T>() {
            return id;
        }

        let descriptor = ComponentDescriptor::new::<T>();
        let (list, category) = match T::STORAGE {
            ComponentStorage::Sparse => (&mut components.sparse, TypeCategory::Sparse),
            ComponentStorage::Dense if descriptor.layout.size() == 0 => {
                (&mut components.dense, TypeCategory::Tag)
            }
            ComponentStorage::Dense => (&mut components.dense, TypeCategory::Basic),
        };

        let index = list.len();
        if index >= MAX_BITS {
            too_many_components(descriptor.name);
        }

        let id = ComponentId::new(category, index);
        list.push(ComponentInfo::new(id, descriptor));
        components.by_type.insert_type::<T>(id);

        log::debug!("Registered component {} as {id:?}", descriptor.name);
        id
    }

    /// Metadata for `id`, if it was issued by this registry.
    pub fn info(&self, id: ComponentId) -> Option<ComponentInfo> {
        let components = self.read();
        match id.category() {
            TypeCategory::Entity => None,
            TypeCategory::Sparse => components.sparse.get(id.index()).copied(),
            TypeCategory::Basic | TypeCategory::Tag => components
                .dense
                .get(id.index())
                .filter(|info| info.id() == id)
                .copied(),
        }
    }

    /// Metadata of the dense component using mask bit `index`.
    pub fn dense_info(&self, index: usize) -> Option<ComponentInfo> {
        self.read().dense.get(index).copied()
    }

    /// Metadata of the sparse component using mask bit `index`.
    pub fn sparse_info(&self, index: usize) -> Option<ComponentInfo> {
        self.read().sparse.get(index).copied()
    }

    /// Like [`info`](Self::info), for ids known to come from this registry.
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by another registry.
    pub(crate) fn require_info(&self, id: ComponentId) -> ComponentInfo {
        match self.info(id) {
            Some(info) => info,
            None => foreign_component(id),
        }
    }

    /// Number of registered dense components, tags included.
    pub fn dense_len(&self) -> usize {
        self.read().dense.len()
    }

    /// Number of registered sparse components.
    pub fn sparse_len(&self) -> usize {
        self.read().sparse.len()
    }

    /// Number of registered components.
    pub fn len(&self) -> usize {
        self.read().by_type.len()
    }
}

#[cold]
#[inline(never)]
fn too_many_components(name: crate::utils::DebugName) -> ! {
    panic!("cannot register {name}: at most {MAX_BITS} components per storage kind");
}

#[cold]
#[inline(never)]
fn foreign_component(id: ComponentId) -> ! {
    panic!("{id:?} was not issued by this TypeRegistry");
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for TypeRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let components = self.read();
        f.debug_struct("TypeRegistry")
            .field("dense", &components.dense)
            .field("sparse", &components.sparse)
            .finish()
    }
}
