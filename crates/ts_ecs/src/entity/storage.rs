use alloc::vec::Vec;
use core::fmt::Debug;

use super::{Entity, EntityError};
use crate::archetype::ArchetypeId;

// -----------------------------------------------------------------------------
// EntityAddress

/// Where an entity's row lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityAddress {
    pub archetype: ArchetypeId,
    pub row: u32,
}

impl EntityAddress {
    #[inline(always)]
    pub const fn new(archetype: ArchetypeId, row: u32) -> Self {
        Self { archetype, row }
    }

    #[inline(always)]
    const fn free(next: u32) -> Self {
        Self {
            archetype: ArchetypeId::INVALID,
            row: next,
        }
    }
}

// -----------------------------------------------------------------------------
// EntityStorage

#[derive(Clone, Copy)]
struct Slot {
    version: u32,
    address: EntityAddress,
}

/// The address table: one slot per entity index.
///
/// Free slots form a list linked through their address rows; index `0` is
/// reserved and doubles as the end of the list.
pub struct EntityStorage {
    slots: Vec<Slot>,
    free_head: u32,
    len: u32,
}

impl EntityStorage {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity + 1);
        slots.push(Slot {
            version: 0,
            address: EntityAddress::free(0),
        });
        Self {
            slots,
            free_head: 0,
            len: 0,
        }
    }

    /// Number of live entities.
    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Issues a handle located at `address`, recycling a freed index if any.
    pub fn allocate(&mut self, address: EntityAddress) -> Entity {
        self.len += 1;
        if self.free_head != 0 {
            let index = self.free_head;
            let slot = &mut self.slots[index as usize];
            self.free_head = slot.address.row;
            slot.address = address;
            return Entity::new(index, slot.version);
        }

        let index = self.slots.len() as u32;
        if index >= 1 << 31 {
            index_space_exhausted();
        }
        self.slots.push(Slot {
            version: 1,
            address,
        });
        Entity::new(index, 1)
    }

    /// Invalidates `entity` and puts its index on the free list.
    pub fn release(&mut self, entity: Entity) -> Result<EntityAddress, EntityError> {
        let address = self.require_address(entity)?;
        let slot = &mut self.slots[entity.index() as usize];

        slot.version = match slot.version.checked_add(1) {
            Some(version) if version != u32::MAX => version,
            _ => {
                log::warn!("Entity index {} wrapped its version", entity.index());
                1
            }
        };
        slot.address = EntityAddress::free(self.free_head);
        self.free_head = entity.index();
        self.len -= 1;
        Ok(address)
    }

    /// Returns `true` if `entity` refers to a live entity.
    #[inline]
    pub fn is_valid(&self, entity: Entity) -> bool {
        self.require_address(entity).is_ok()
    }

    /// The address of `entity`, or why the handle cannot be used.
    pub fn require_address(&self, entity: Entity) -> Result<EntityAddress, EntityError> {
        if entity.is_null() {
            return Err(EntityError::Null);
        }
        if entity.is_deferred() {
            return Err(EntityError::Deferred(entity));
        }
        let Some(slot) = self.slots.get(entity.index() as usize) else {
            return Err(EntityError::NotFound(entity.index()));
        };
        if slot.version != entity.version() || slot.address.archetype == ArchetypeId::INVALID {
            return Err(EntityError::Stale {
                expect: entity,
                actual: Entity::new(entity.index(), slot.version),
            });
        }
        Ok(slot.address)
    }

    /// Relocates a live entity. The caller has validated the handle.
    #[inline]
    pub(crate) fn set_address(&mut self, entity: Entity, address: EntityAddress) {
        let slot = &mut self.slots[entity.index() as usize];
        debug_assert_eq!(slot.version, entity.version());
        slot.address = address;
    }
}

#[cold]
#[inline(never)]
fn index_space_exhausted() -> ! {
    panic!("entity index space exhausted");
}

impl Default for EntityStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for EntityStorage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EntityStorage")
            .field("len", &self.len)
            .field("slots", &(self.slots.len() - 1))
            .finish()
    }
}
