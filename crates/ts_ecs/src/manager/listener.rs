use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt::{Debug, Display};

use crate::archetype::ArchetypeId;
use crate::bitfield::MAX_BITS;
use crate::entity::Entity;
use crate::query::QueryId;

// -----------------------------------------------------------------------------
// EntityListener

/// Observes entities entering, moving between and leaving the archetypes of
/// a query.
///
/// Callbacks run synchronously inside the structural operation that caused
/// them and cannot reach the manager.
pub trait EntityListener: Send + Sync + 'static {
    /// `entity` entered a matched archetype from an unmatched one, or was
    /// created in it.
    fn on_created(&mut self, _entity: Entity, _archetype: ArchetypeId) {}

    /// `entity` moved between two matched archetypes.
    fn on_moved(&mut self, _entity: Entity, _from: ArchetypeId, _to: ArchetypeId) {}

    /// `entity` left the matched archetypes, or was deleted.
    fn on_deleted(&mut self, _entity: Entity, _archetype: ArchetypeId) {}
}

// -----------------------------------------------------------------------------
// ListenerId

/// Handle of a registered listener; also its bit in archetype listener
/// masks.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u32);

impl ListenerId {
    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Debug for ListenerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ListenerId({})", self.0)
    }
}

impl Display for ListenerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

// -----------------------------------------------------------------------------
// Listeners

struct ListenerSlot {
    query: QueryId,
    listener: Box<dyn EntityListener>,
}

/// Registered listeners. Freed ids are reused, so listener masks stay small.
#[derive(Default)]
pub(crate) struct Listeners {
    slots: Vec<Option<ListenerSlot>>,
    free: Vec<u32>,
}

impl Debug for Listeners {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(
                self.slots
                    .iter()
                    .enumerate()
                    .filter_map(|(i, slot)| Some((i, slot.as_ref()?.query))),
            )
            .finish()
    }
}

impl Listeners {
    pub(crate) fn insert(&mut self, query: QueryId, listener: Box<dyn EntityListener>) -> ListenerId {
        let slot = Some(ListenerSlot { query, listener });
        if let Some(index) = self.free.pop() {
            self.slots[index as usize] = slot;
            return ListenerId(index);
        }
        let index = self.slots.len();
        if index >= MAX_BITS {
            too_many_listeners();
        }
        self.slots.push(slot);
        ListenerId(index as u32)
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> Option<(QueryId, Box<dyn EntityListener>)> {
        let slot = self.slots.get_mut(id.index())?.take()?;
        self.free.push(id.0);
        Some((slot.query, slot.listener))
    }

    /// Listeners registered on `query`, as mask bits.
    pub(crate) fn of_query(&self, query: QueryId) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(move |(_, slot)| slot.as_ref().is_some_and(|slot| slot.query == query))
            .map(|(bit, _)| bit)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, bit: usize) -> Option<&mut (dyn EntityListener + 'static)> {
        Some(&mut *self.slots.get_mut(bit)?.as_mut()?.listener)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

#[cold]
#[inline(never)]
fn too_many_listeners() -> ! {
    panic!("at most {MAX_BITS} entity listeners can be registered");
}
