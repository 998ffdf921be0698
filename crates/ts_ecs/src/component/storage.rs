use bitflags::bitflags;

// -----------------------------------------------------------------------------
// ComponentStorage

/// Where a component's data lives.
///
/// - `Dense`: one slot per row in every archetype whose type mask has the
///   component. Adding or removing it moves the entity to another archetype.
/// - `Sparse`: stored in per-archetype sparse columns that only hold slots for
///   rows that carry the component. Adding or removing it never moves the
///   entity, which suits optional or rarely present data.
///
/// Prefer `Dense`; iterating sparse columns needs a bitmask lookup per row.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStorage {
    #[default]
    Dense = 0,
    Sparse = 1,
}

impl ComponentStorage {
    #[inline]
    pub const fn is_dense(self) -> bool {
        matches!(self, ComponentStorage::Dense)
    }

    #[inline]
    pub const fn is_sparse(self) -> bool {
        matches!(self, ComponentStorage::Sparse)
    }
}

// -----------------------------------------------------------------------------
// ComponentFlags

bitflags! {
    /// Per-type attributes recorded at registration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ComponentFlags: u8 {
        /// Stored in sparse columns.
        const SPARSE = 1;
        /// Skipped when a prefab is instantiated.
        const NO_CLONE = 1 << 1;
        /// Zero-sized dense component.
        const TAG = 1 << 2;
    }
}
