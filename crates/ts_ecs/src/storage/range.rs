use alloc::collections::BTreeMap;
use core::fmt::Debug;

// -----------------------------------------------------------------------------
// Range

/// A contiguous slice `start..start + length` of a shared array.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Range {
    pub start: u32,
    pub length: u32,
}

impl Range {
    pub const EMPTY: Range = Range {
        start: 0,
        length: 0,
    };

    #[inline(always)]
    pub const fn new(start: u32, length: u32) -> Self {
        Self { start, length }
    }

    #[inline(always)]
    pub const fn end(self) -> u32 {
        self.start + self.length
    }

    #[inline(always)]
    pub const fn is_empty(self) -> bool {
        self.length == 0
    }

    /// Physical index of `offset` within the range.
    #[inline(always)]
    pub fn at(self, offset: usize) -> usize {
        debug_assert!(offset < self.length as usize);
        self.start as usize + offset
    }

    #[inline(always)]
    pub fn as_usize(self) -> core::ops::Range<usize> {
        self.start as usize..self.end() as usize
    }
}

impl Debug for Range {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}..{}", self.start, self.end())
    }
}

// -----------------------------------------------------------------------------
// RangeAllocator

/// First-fit allocator of ranges over a growable index space.
///
/// Freed ranges coalesce with their neighbours; a free range touching the end
/// of the space shrinks the space instead. [`end`](Self::end) is the length
/// the backing array must have.
#[derive(Default)]
pub struct RangeAllocator {
    /// start -> length, never adjacent to each other or to `end`.
    free: BTreeMap<u32, u32>,
    end: u32,
}

impl RangeAllocator {
    pub const fn new() -> Self {
        Self {
            free: BTreeMap::new(),
            end: 0,
        }
    }

    /// Length the backing array needs to cover every allocated range.
    #[inline(always)]
    pub fn end(&self) -> u32 {
        self.end
    }

    /// Total length of the free holes below `end`.
    pub fn fragmented(&self) -> u32 {
        self.free.values().sum()
    }

    pub fn allocate(&mut self, length: u32) -> Range {
        if length == 0 {
            return Range::EMPTY;
        }

        let fit = self
            .free
            .iter()
            .find(|&(_, &len)| len >= length)
            .map(|(&start, &len)| (start, len));

        match fit {
            Some((start, len)) => {
                self.free.remove(&start);
                if len > length {
                    self.free.insert(start + length, len - length);
                }
                Range::new(start, length)
            }
            None => {
                let start = self.end;
                self.end += length;
                Range::new(start, length)
            }
        }
    }

    /// Grows `range` to `length` without moving it, if the space behind it
    /// is free. Returns `false` when the range must be relocated.
    pub fn try_extend(&mut self, range: Range, length: u32) -> bool {
        if length <= range.length {
            return true;
        }
        if range.is_empty() {
            return false;
        }
        let extra = length - range.length;
        let tail = range.end();

        if tail == self.end {
            self.end += extra;
            return true;
        }

        match self.free.get(&tail).copied() {
            Some(len) if len >= extra => {
                self.free.remove(&tail);
                if len > extra {
                    self.free.insert(tail + extra, len - extra);
                }
                true
            }
            _ => false,
        }
    }

    pub fn release(&mut self, range: Range) {
        if range.is_empty() {
            return;
        }
        let mut start = range.start;
        let mut length = range.length;

        // merge with the hole before
        if let Some((&prev, &prev_len)) = self.free.range(..start).next_back()
            && prev + prev_len == start
        {
            self.free.remove(&prev);
            start = prev;
            length += prev_len;
        }

        // merge with the hole after
        if let Some(next_len) = self.free.remove(&(start + length)) {
            length += next_len;
        }

        if start + length == self.end {
            self.end = start;
        } else {
            self.free.insert(start, length);
        }
    }
}

impl Debug for RangeAllocator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RangeAllocator")
            .field("end", &self.end)
            .field("free", &self.free)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{Range, RangeAllocator};

    #[test]
    fn allocate_and_reuse() {
        let mut alloc = RangeAllocator::new();
        let a = alloc.allocate(4);
        let b = alloc.allocate(8);
        let c = alloc.allocate(2);
        assert_eq!((a, b, c), (Range::new(0, 4), Range::new(4, 8), Range::new(12, 2)));
        assert_eq!(alloc.end(), 14);

        alloc.release(b);
        assert_eq!(alloc.fragmented(), 8);
        // first fit splits the hole
        assert_eq!(alloc.allocate(3), Range::new(4, 3));
        assert_eq!(alloc.allocate(5), Range::new(7, 5));
        assert_eq!(alloc.fragmented(), 0);
        assert_eq!(alloc.allocate(0), Range::EMPTY);
    }

    #[test]
    fn coalesce_and_shrink() {
        let mut alloc = RangeAllocator::new();
        let a = alloc.allocate(4);
        let b = alloc.allocate(4);
        let c = alloc.allocate(4);
        alloc.release(a);
        alloc.release(b);
        assert_eq!(alloc.fragmented(), 8);
        alloc.release(c);
        assert_eq!(alloc.end(), 0);
        assert_eq!(alloc.fragmented(), 0);
    }

    #[test]
    fn extend_in_place() {
        let mut alloc = RangeAllocator::new();
        let a = alloc.allocate(4);
        let b = alloc.allocate(4);
        // a is blocked by b
        assert!(!alloc.try_extend(a, 6));
        // b sits at the end
        assert!(alloc.try_extend(b, 10));
        assert_eq!(alloc.end(), 14);

        let b = Range::new(4, 10);
        alloc.release(b);
        assert_eq!(alloc.end(), 4);
        assert!(alloc.try_extend(a, 6));

        let mut alloc = RangeAllocator::new();
        let a = alloc.allocate(2);
        let hole = alloc.allocate(6);
        let _tail = alloc.allocate(1);
        alloc.release(hole);
        assert!(alloc.try_extend(a, 5));
        assert_eq!(alloc.fragmented(), 3);
        assert!(!alloc.try_extend(Range::new(0, 5), 9));
    }
}
