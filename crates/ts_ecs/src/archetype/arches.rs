use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;

use ts_utils::hash::NoOpHashMap;

use crate::archetype::{ArchetypeId, Archetype};
use crate::bitfield::BitField;
use crate::component::{ComponentInfo, TypeRegistry};
use crate::storage::Storages;

// -----------------------------------------------------------------------------
// Archetypes

/// Every archetype of a manager, indexed by [`ArchetypeId`] and by type mask.
///
/// Type masks are interned, so the mask lookup is a single probe keyed by
/// the mask's pointer identity. At most one archetype exists per mask.
///
/// Always contains the empty archetype, where new entities start.
pub struct Archetypes {
    arches: Vec<Archetype>,
    by_mask: NoOpHashMap<BitField, ArchetypeId>,
}

impl Debug for Archetypes {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(&self.arches, f)
    }
}

impl Archetypes {
    /// Creates the collection with the empty archetype.
    pub(crate) fn new(empty: BitField, storages: &mut Storages) -> Self {
        let arche = Archetype::new(ArchetypeId::EMPTY, empty.clone(), empty.clone(), &[], storages);
        let mut by_mask = NoOpHashMap::default();
        by_mask.insert(empty, ArchetypeId::EMPTY);
        Self {
            arches: vec![arche],
            by_mask,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.arches.len()
    }

    #[inline]
    pub fn get(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.arches.get(id.index())
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, Archetype> {
        self.arches.iter()
    }

    /// Finds the archetype of an exact type mask.
    #[inline]
    pub fn find(&self, mask: &BitField) -> Option<ArchetypeId> {
        self.by_mask.get(mask).copied()
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: ArchetypeId) -> Option<&mut Archetype> {
        self.arches.get_mut(id.index())
    }

    #[inline]
    pub(crate) fn expect(&self, id: ArchetypeId) -> &Archetype {
        &self.arches[id.index()]
    }

    #[inline]
    pub(crate) fn expect_mut(&mut self, id: ArchetypeId) -> &mut Archetype {
        &mut self.arches[id.index()]
    }

    pub(crate) fn iter_mut(&mut self) -> core::slice::IterMut<'_, Archetype> {
        self.arches.iter_mut()
    }

    /// Two distinct archetypes, mutably.
    ///
    /// # Panics
    ///
    /// Panics if `a == b` or either id is out of range.
    pub(crate) fn pair_mut(
        &mut self,
        a: ArchetypeId,
        b: ArchetypeId,
    ) -> (&mut Archetype, &mut Archetype) {
        match self.arches.get_disjoint_mut([a.index(), b.index()]) {
            Ok([a, b]) => (a, b),
            Err(_) => invalid_pair(a, b),
        }
    }

    /// Returns the archetype of `mask`, creating it if needed. The flag is
    /// `true` when the archetype was created by this call.
    pub(crate) fn require(
        &mut self,
        mask: &BitField,
        registry: &TypeRegistry,
        storages: &mut Storages,
    ) -> (ArchetypeId, bool) {
        if let Some(&id) = self.by_mask.get(mask) {
            return (id, false);
        }

        let infos: Vec<ComponentInfo> = mask
            .iter()
            .map(|bit| match registry.dense_info(bit) {
                Some(info) => info,
                None => unknown_component(bit),
            })
            .collect();

        let id = ArchetypeId::new(self.arches.len() as u32);
        let empty = registry.bitfields().empty();
        self.arches
            .push(Archetype::new(id, mask.clone(), empty, &infos, storages));
        self.by_mask.insert(mask.clone(), id);

        log::debug!("Created archetype {id} with components {mask:?}");
        (id, true)
    }
}

impl<'a> IntoIterator for &'a Archetypes {
    type Item = &'a Archetype;
    type IntoIter = core::slice::Iter<'a, Archetype>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cold]
#[inline(never)]
fn invalid_pair(a: ArchetypeId, b: ArchetypeId) -> ! {
    panic!("archetypes {a} and {b} are not two distinct archetypes");
}

#[cold]
#[inline(never)]
fn unknown_component(bit: usize) -> ! {
    panic!("type mask bit {bit} does not name a registered dense component");
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use super::Archetypes;
    use crate::archetype::ArchetypeId;
    use crate::bitfield::BitFieldGenerator;
    use crate::component::{Component, TypeRegistry};
    use crate::storage::Storages;

    #[derive(Clone, Default)]
    struct A(#[expect(dead_code, reason = "payload")] u64);
    impl Component for A {}

    #[derive(Clone, Default)]
    struct Marker;
    impl Component for Marker {}

    #[test]
    fn one_archetype_per_mask() {
        let registry = Arc::new(TypeRegistry::new());
        let mut storages = Storages::new();
        let mut arches = Archetypes::new(registry.bitfields().empty(), &mut storages);
        assert_eq!(arches.len(), 1);

        let a = registry.require::<A>();
        let marker = registry.require::<Marker>();
        assert!(marker.is_tag());

        let mut generator = BitFieldGenerator::new();
        generator.add(marker.index()).add(a.index());
        let mask = generator.build(registry.bitfields());

        let (id, created) = arches.require(&mask, &registry, &mut storages);
        assert!(created);
        assert_eq!(arches.find(&mask), Some(id));

        // a rebuilt mask is the same interned field
        let mut generator = BitFieldGenerator::new();
        generator.add(a.index()).add(marker.index());
        let again = generator.build(registry.bitfields());
        assert_eq!(arches.require(&again, &registry, &mut storages), (id, false));

        let arche = arches.get(id).unwrap();
        assert_eq!(arche.dense_components().collect::<alloc::vec::Vec<_>>(), [a, marker]);
        assert_eq!(arche.column_index(marker), Some(1));

        let empty = registry.bitfields().empty();
        assert_eq!(arches.find(&empty), Some(ArchetypeId::EMPTY));
        assert_eq!(arches.len(), 2);
    }

    #[test]
    #[should_panic]
    fn pair_of_same_archetype() {
        let registry = TypeRegistry::new();
        let mut storages = Storages::new();
        let mut arches = Archetypes::new(registry.bitfields().empty(), &mut storages);
        arches.pair_mut(ArchetypeId::EMPTY, ArchetypeId::EMPTY);
    }
}
