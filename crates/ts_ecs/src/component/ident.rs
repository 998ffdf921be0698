use core::fmt::{Debug, Display};

use crate::bitfield::MAX_BITS;

// -----------------------------------------------------------------------------
// TypeCategory

/// The category stored in the top two bits of a [`ComponentId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeCategory {
    /// The entity column itself; only [`ComponentId::ENTITY`] has it.
    Entity = 0,
    /// A dense component with data.
    Basic = 1,
    /// A component stored in page-compacted sparse columns.
    Sparse = 2,
    /// A zero-sized dense component.
    Tag = 3,
}

// -----------------------------------------------------------------------------
// ComponentId

/// Identifier of a component type within one [`TypeRegistry`].
///
/// The top two bits hold the [`TypeCategory`], the rest is an index. Dense
/// ids (`Basic` and `Tag`) and sparse ids are numbered independently, each
/// starting at zero; the index is the bit used in type masks.
///
/// [`TypeRegistry`]: crate::component::TypeRegistry
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ComponentId(u32);

impl ComponentId {
    const SHIFT: u32 = 30;
    const INDEX_MASK: u32 = (1 << Self::SHIFT) - 1;

    /// The id of the entity column.
    pub const ENTITY: ComponentId = ComponentId(0);

    #[inline(always)]
    pub(crate) const fn new(category: TypeCategory, index: usize) -> Self {
        assert!(index < MAX_BITS, "too many component types");
        Self(((category as u32) << Self::SHIFT) | index as u32)
    }

    /// Index within the id's numeric space, also its bit in type masks.
    #[inline(always)]
    pub const fn index(self) -> usize {
        (self.0 & Self::INDEX_MASK) as usize
    }

    #[inline(always)]
    pub const fn category(self) -> TypeCategory {
        match self.0 >> Self::SHIFT {
            0 => TypeCategory::Entity,
            1 => TypeCategory::Basic,
            2 => TypeCategory::Sparse,
            _ => TypeCategory::Tag,
        }
    }

    #[inline(always)]
    pub const fn is_sparse(self) -> bool {
        matches!(self.category(), TypeCategory::Sparse)
    }

    /// `Basic` and `Tag` ids live in archetype type masks.
    #[inline(always)]
    pub const fn is_dense(self) -> bool {
        matches!(self.category(), TypeCategory::Basic | TypeCategory::Tag)
    }

    #[inline(always)]
    pub const fn is_tag(self) -> bool {
        matches!(self.category(), TypeCategory::Tag)
    }

    /// The packed representation.
    #[inline(always)]
    pub const fn to_bits(self) -> u32 {
        self.0
    }
}

impl Debug for ComponentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ComponentId({:?}#{})", self.category(), self.index())
    }
}

impl Display for ComponentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::{ComponentId, TypeCategory};

    #[test]
    fn packing() {
        let id = ComponentId::new(TypeCategory::Sparse, 17);
        assert_eq!(id.index(), 17);
        assert_eq!(id.category(), TypeCategory::Sparse);
        assert!(id.is_sparse());
        assert!(!id.is_dense());

        let tag = ComponentId::new(TypeCategory::Tag, 17);
        assert!(tag.is_dense() && tag.is_tag());
        assert_ne!(tag, id);

        assert_eq!(ComponentId::ENTITY.category(), TypeCategory::Entity);
        assert_eq!(ComponentId::ENTITY.to_bits(), 0);
    }
}
