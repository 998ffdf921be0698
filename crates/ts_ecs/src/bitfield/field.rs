use alloc::boxed::Box;
use alloc::sync::Arc;
use core::fmt::Debug;
use core::hash::{Hash, Hasher};

use super::{Bits, MAX_BITS, MergedBits, PAGE_BITS};

// -----------------------------------------------------------------------------
// FieldData

pub(crate) struct FieldData {
    pub(crate) hash: u64,
    /// Never ends with an empty page.
    pub(crate) pages: Box<[u64]>,
}

// -----------------------------------------------------------------------------
// BitField

/// An immutable set of bit indices below [`MAX_BITS`].
///
/// Fields are only obtained from a [`BitFieldCache`], which guarantees that
/// equal contents share one allocation. Equality and hashing therefore look at
/// the allocation, never at the pages. Comparing fields from two different
/// caches is meaningless.
///
/// Edits go through a [`BitFieldGenerator`] that produces a new field.
///
/// [`BitFieldCache`]: crate::bitfield::BitFieldCache
/// [`BitFieldGenerator`]: crate::bitfield::BitFieldGenerator
#[derive(Clone)]
pub struct BitField(pub(crate) Arc<FieldData>);

impl BitField {
    /// The interned pages, without trailing empty pages.
    #[inline(always)]
    pub fn pages(&self) -> &[u64] {
        &self.0.pages
    }

    /// The content hash computed at interning time.
    #[inline(always)]
    pub fn content_hash(&self) -> u64 {
        self.0.hash
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.pages.is_empty()
    }

    /// Number of set bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.pages.iter().map(|p| p.count_ones() as usize).sum()
    }

    /// Returns `true` if `bit` is set.
    #[inline]
    pub fn contains(&self, bit: usize) -> bool {
        debug_assert!(bit < MAX_BITS);
        match self.0.pages.get(bit / PAGE_BITS) {
            Some(page) => page & (1 << (bit % PAGE_BITS)) != 0,
            None => false,
        }
    }

    /// Returns `true` if every bit of `other` is also set in `self`.
    pub fn contains_all(&self, other: &BitField) -> bool {
        if self == other {
            return true;
        }
        let mine = self.pages();
        let theirs = other.pages();
        theirs.len() <= mine.len() && theirs.iter().zip(mine).all(|(t, m)| t & !m == 0)
    }

    /// Returns `true` if any bit is set in both fields.
    pub fn intersects(&self, other: &BitField) -> bool {
        self.pages()
            .iter()
            .zip(other.pages())
            .any(|(a, b)| a & b != 0)
    }

    /// Returns `true` if no bit is set in both fields.
    #[inline]
    pub fn is_disjoint(&self, other: &BitField) -> bool {
        !self.intersects(other)
    }

    /// Position of `bit` in ascending enumeration order, if set.
    ///
    /// Archetypes lay out their columns in this order, so the rank of a type
    /// id is its column index.
    pub fn rank(&self, bit: usize) -> Option<usize> {
        if !self.contains(bit) {
            return None;
        }
        let page = bit / PAGE_BITS;
        let below = self.0.pages[..page]
            .iter()
            .map(|p| p.count_ones() as usize)
            .sum::<usize>();
        let mask = (1_u64 << (bit % PAGE_BITS)) - 1;
        Some(below + (self.0.pages[page] & mask).count_ones() as usize)
    }

    /// Set bits in ascending order.
    #[inline]
    pub fn iter(&self) -> Bits<'_> {
        Bits::new(self.pages())
    }

    /// Bits set in either field, ascending.
    #[inline]
    pub fn union<'a>(&'a self, other: &'a BitField) -> MergedBits<'a> {
        let end = self.pages().len().max(other.pages().len());
        MergedBits::new(self.pages(), other.pages(), end, |a, b| a | b)
    }

    /// Bits set in both fields, ascending.
    #[inline]
    pub fn intersection<'a>(&'a self, other: &'a BitField) -> MergedBits<'a> {
        let end = self.pages().len().min(other.pages().len());
        MergedBits::new(self.pages(), other.pages(), end, |a, b| a & b)
    }

    /// Bits set in `self` but not in `other`, ascending.
    #[inline]
    pub fn difference<'a>(&'a self, other: &'a BitField) -> MergedBits<'a> {
        MergedBits::new(self.pages(), other.pages(), self.pages().len(), |a, b| a & !b)
    }
}

impl PartialEq for BitField {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for BitField {}

impl Hash for BitField {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl Debug for BitField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a BitField {
    type Item = usize;
    type IntoIter = Bits<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::bitfield::{BitFieldCache, BitFieldGenerator};
    use alloc::vec::Vec;

    fn field(cache: &BitFieldCache, bits: &[usize]) -> super::BitField {
        let mut generator = BitFieldGenerator::new();
        bits.iter().for_each(|&b| {
            generator.add(b);
        });
        generator.build(cache)
    }

    #[test]
    fn contains_and_rank() {
        let cache = BitFieldCache::new();
        let a = field(&cache, &[1, 5, 64, 130, 4095]);
        assert!(a.contains(64));
        assert!(!a.contains(63));
        assert!(!a.contains(4000));
        assert_eq!(a.len(), 5);
        assert_eq!(a.rank(1), Some(0));
        assert_eq!(a.rank(64), Some(2));
        assert_eq!(a.rank(4095), Some(4));
        assert_eq!(a.rank(2), None);
        assert_eq!(a.iter().collect::<Vec<_>>(), [1, 5, 64, 130, 4095]);
    }

    #[test]
    fn set_algebra() {
        let cache = BitFieldCache::new();
        let a = field(&cache, &[0, 3, 70, 200]);
        let b = field(&cache, &[3, 4, 200, 300]);
        let e = cache.empty();

        assert_eq!(a.union(&b).collect::<Vec<_>>(), [0, 3, 4, 70, 200, 300]);
        assert_eq!(a.intersection(&b).collect::<Vec<_>>(), [3, 200]);
        assert_eq!(a.difference(&b).collect::<Vec<_>>(), [0, 70]);
        assert_eq!(b.difference(&a).collect::<Vec<_>>(), [4, 300]);
        assert_eq!(a.union(&e).collect::<Vec<_>>(), [0, 3, 70, 200]);
        assert_eq!(e.intersection(&a).count(), 0);

        assert!(a.intersects(&b));
        assert!(a.contains_all(&e));
        assert!(!a.contains_all(&b));
        let ab = field(&cache, &[0, 3, 4, 70, 200, 300]);
        assert!(ab.contains_all(&a));
        assert!(ab.contains_all(&b));
        assert!(a.is_disjoint(&field(&cache, &[1, 2, 71])));
    }
}
