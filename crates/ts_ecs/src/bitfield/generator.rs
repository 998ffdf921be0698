use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt::Debug;

use super::{BitField, BitFieldCache, Bits, MAX_BITS, MAX_PAGES, PAGE_BITS};

/// Recycled page buffers kept per thread.
const POOL_LIMIT: usize = 32;

std::thread_local! {
    static POOL: RefCell<Vec<Vec<u64>>> = const { RefCell::new(Vec::new()) };
}

// -----------------------------------------------------------------------------
// BitFieldGenerator

/// A mutable bit set used to build [`BitField`]s.
///
/// Page buffers are drawn from and returned to a thread-local pool, so
/// builders that are created and dropped in a loop do not allocate after
/// warm-up.
///
/// # Examples
///
/// ```
/// use ts_ecs::bitfield::{BitFieldCache, BitFieldGenerator};
///
/// let cache = BitFieldCache::new();
/// let mut generator = BitFieldGenerator::new();
/// generator.add(3).add(70);
/// let a = generator.build(&cache);
///
/// let mut generator = BitFieldGenerator::from_field(&a);
/// generator.remove(70).add(70);
/// assert_eq!(generator.build(&cache), a);
/// ```
pub struct BitFieldGenerator {
    pages: Vec<u64>,
}

impl BitFieldGenerator {
    /// Creates an empty generator.
    pub fn new() -> Self {
        let pages = POOL
            .try_with(|pool| pool.borrow_mut().pop())
            .ok()
            .flatten()
            .unwrap_or_default();
        debug_assert!(pages.is_empty());
        Self { pages }
    }

    /// Creates a generator holding the bits of `field`.
    pub fn from_field(field: &BitField) -> Self {
        let mut generator = Self::new();
        generator.pages.extend_from_slice(field.pages());
        generator
    }

    #[inline]
    fn page_mut(&mut self, page: usize) -> &mut u64 {
        if page >= self.pages.len() {
            self.pages.resize(page + 1, 0);
        }
        &mut self.pages[page]
    }

    /// Sets `bit`.
    ///
    /// # Panics
    ///
    /// Panics if `bit >= MAX_BITS`.
    #[inline]
    pub fn add(&mut self, bit: usize) -> &mut Self {
        assert!(bit < MAX_BITS, "bit {bit} exceeds the BitField capacity of {MAX_BITS}");
        *self.page_mut(bit / PAGE_BITS) |= 1 << (bit % PAGE_BITS);
        self
    }

    /// Clears `bit`.
    #[inline]
    pub fn remove(&mut self, bit: usize) -> &mut Self {
        if let Some(page) = self.pages.get_mut(bit / PAGE_BITS) {
            *page &= !(1 << (bit % PAGE_BITS));
        }
        self
    }

    #[inline]
    pub fn contains(&self, bit: usize) -> bool {
        self.pages
            .get(bit / PAGE_BITS)
            .is_some_and(|page| page & (1 << (bit % PAGE_BITS)) != 0)
    }

    /// Sets every bit of `field`.
    pub fn append(&mut self, field: &BitField) -> &mut Self {
        let src = field.pages();
        if src.len() > self.pages.len() {
            self.pages.resize(src.len(), 0);
        }
        self.pages.iter_mut().zip(src).for_each(|(d, s)| *d |= s);
        self
    }

    /// Clears every bit of `field`.
    pub fn subtract(&mut self, field: &BitField) -> &mut Self {
        self.pages
            .iter_mut()
            .zip(field.pages())
            .for_each(|(d, s)| *d &= !s);
        self
    }

    /// Sets every bit of another generator.
    pub fn append_generator(&mut self, other: &BitFieldGenerator) -> &mut Self {
        if other.pages.len() > self.pages.len() {
            self.pages.resize(other.pages.len(), 0);
        }
        self.pages
            .iter_mut()
            .zip(&other.pages)
            .for_each(|(d, s)| *d |= s);
        self
    }

    /// Clears every bit of another generator.
    pub fn subtract_generator(&mut self, other: &BitFieldGenerator) -> &mut Self {
        self.pages
            .iter_mut()
            .zip(&other.pages)
            .for_each(|(d, s)| *d &= !s);
        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|&p| p == 0)
    }

    #[inline]
    pub fn clear(&mut self) {
        self.pages.clear();
    }

    /// Set bits in ascending order.
    #[inline]
    pub fn iter(&self) -> Bits<'_> {
        Bits::new(&self.pages)
    }

    /// Interns the current bits.
    ///
    /// An empty generator always yields the cache's canonical empty field.
    #[inline]
    pub fn build(&self, cache: &BitFieldCache) -> BitField {
        debug_assert!(self.pages.len() <= MAX_PAGES);
        cache.intern(&self.pages)
    }
}

impl Default for BitFieldGenerator {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for BitFieldGenerator {
    fn clone(&self) -> Self {
        let mut generator = Self::new();
        generator.pages.extend_from_slice(&self.pages);
        generator
    }
}

impl Drop for BitFieldGenerator {
    fn drop(&mut self) {
        let mut pages = core::mem::take(&mut self.pages);
        if pages.capacity() == 0 {
            return;
        }
        pages.clear();
        // The pool may already be gone during thread teardown.
        let _ = POOL.try_with(|pool| {
            let mut pool = pool.borrow_mut();
            if pool.len() < POOL_LIMIT {
                pool.push(pages);
            }
        });
    }
}

impl Debug for BitFieldGenerator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::BitFieldGenerator;
    use crate::bitfield::BitFieldCache;
    use alloc::vec::Vec;

    #[test]
    fn add_remove() {
        let mut generator = BitFieldGenerator::new();
        assert!(generator.is_empty());
        generator.add(7).add(1000).add(7);
        assert!(generator.contains(7));
        assert!(generator.contains(1000));
        generator.remove(1000).remove(3000);
        assert!(!generator.contains(1000));
        assert_eq!(generator.iter().collect::<Vec<_>>(), [7]);
        generator.remove(7);
        assert!(generator.is_empty());
    }

    #[test]
    fn append_subtract() {
        let cache = BitFieldCache::new();
        let mut a = BitFieldGenerator::new();
        a.add(1).add(2).add(300);
        let a = a.build(&cache);

        let mut generator = BitFieldGenerator::new();
        generator.add(2).add(5);
        generator.append(&a);
        assert_eq!(generator.iter().collect::<Vec<_>>(), [1, 2, 5, 300]);
        generator.subtract(&a);
        assert_eq!(generator.iter().collect::<Vec<_>>(), [5]);
    }

    #[test]
    #[should_panic]
    fn out_of_range() {
        BitFieldGenerator::new().add(crate::bitfield::MAX_BITS);
    }

    #[test]
    fn empty_is_canonical() {
        let cache = BitFieldCache::new();
        let mut generator = BitFieldGenerator::new();
        generator.add(9).remove(9);
        assert_eq!(generator.build(&cache), cache.empty());
        assert_eq!(BitFieldGenerator::new().build(&cache), cache.empty());
    }
}
