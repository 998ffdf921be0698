use core::fmt::{Debug, Display};
use core::hash::Hash;

// -----------------------------------------------------------------------------
// ArchetypeId

/// Unique identifier of an [`Archetype`](crate::archetype::Archetype) within
/// its manager.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ArchetypeId(u32);

impl ArchetypeId {
    /// The archetype without components; new entities start there.
    pub const EMPTY: ArchetypeId = ArchetypeId(0);

    /// The address of entities that no longer exist.
    pub const INVALID: ArchetypeId = ArchetypeId(u32::MAX);

    #[inline(always)]
    pub(crate) const fn new(id: u32) -> Self {
        assert!(id != u32::MAX, "too many archetypes");
        Self(id)
    }

    /// Returns the archetype index as a usize.
    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Debug for ArchetypeId {
    #[inline(always)]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for ArchetypeId {
    #[inline(always)]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Hash for ArchetypeId {
    #[inline(always)]
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        state.write_u32(self.0);
    }
}
