use alloc::boxed::Box;
use core::alloc::Layout;
use core::any::TypeId;
use core::fmt::Debug;

use super::{Component, ComponentFlags, ComponentId, ComponentStorage};
use crate::command::ErasedStaging;
use crate::storage::ErasedArray;
use crate::utils::DebugName;

// -----------------------------------------------------------------------------
// ComponentDescriptor

/// Static metadata of a component type.
///
/// The function pointers form the per-type vtable: the storage layer creates
/// typed arrays and command-buffer staging through them without knowing `T`.
#[derive(Clone, Copy)]
pub struct ComponentDescriptor {
    pub name: DebugName,
    pub type_id: TypeId,
    pub layout: Layout,
    pub storage: ComponentStorage,
    pub flags: ComponentFlags,
    pub new_array: fn() -> Box<dyn ErasedArray>,
    pub new_staging: fn() -> Box<dyn ErasedStaging>,
}

impl ComponentDescriptor {
    pub fn new<T: Component>() -> Self {
        let layout = Layout::new::<T>();
        let mut flags = ComponentFlags::empty();
        match T::STORAGE {
            ComponentStorage::Sparse => flags |= ComponentFlags::SPARSE,
            ComponentStorage::Dense if layout.size() == 0 => flags |= ComponentFlags::TAG,
            ComponentStorage::Dense => {}
        }
        if T::NO_CLONE {
            flags |= ComponentFlags::NO_CLONE;
        }
        Self {
            name: DebugName::type_name::<T>(),
            type_id: TypeId::of::<T>(),
            layout,
            storage: T::STORAGE,
            flags,
            new_array: crate::storage::new_array::<T>,
            new_staging: crate::command::new_staging::<T>,
        }
    }
}

// -----------------------------------------------------------------------------
// ComponentInfo

/// A registered component: its [`ComponentId`] plus its descriptor.
#[derive(Clone, Copy)]
pub struct ComponentInfo {
    id: ComponentId,
    descriptor: ComponentDescriptor,
}

impl Debug for ComponentInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.id)
            .field("name", &self.descriptor.name)
            .field("flags", &self.descriptor.flags)
            .finish()
    }
}

impl ComponentInfo {
    #[inline]
    pub(crate) fn new(id: ComponentId, descriptor: ComponentDescriptor) -> Self {
        Self { id, descriptor }
    }

    #[inline(always)]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    #[inline(always)]
    pub fn name(&self) -> DebugName {
        self.descriptor.name
    }

    #[inline(always)]
    pub fn type_id(&self) -> TypeId {
        self.descriptor.type_id
    }

    #[inline(always)]
    pub fn layout(&self) -> Layout {
        self.descriptor.layout
    }

    #[inline(always)]
    pub fn storage(&self) -> ComponentStorage {
        self.descriptor.storage
    }

    #[inline(always)]
    pub fn flags(&self) -> ComponentFlags {
        self.descriptor.flags
    }

    #[inline(always)]
    pub fn is_cloneable(&self) -> bool {
        !self.descriptor.flags.contains(ComponentFlags::NO_CLONE)
    }

    #[inline]
    pub(crate) fn new_array(&self) -> Box<dyn ErasedArray> {
        (self.descriptor.new_array)()
    }

    #[inline]
    pub(crate) fn new_staging(&self) -> Box<dyn ErasedStaging> {
        (self.descriptor.new_staging)()
    }
}
