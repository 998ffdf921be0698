use core::iter::FusedIterator;

use super::PAGE_BITS;

// -----------------------------------------------------------------------------
// Bits

/// Ascending iterator over the set bits of a page slice.
#[derive(Clone)]
pub struct Bits<'a> {
    pages: &'a [u64],
    page: usize,
    word: u64,
}

impl<'a> Bits<'a> {
    #[inline]
    pub(crate) fn new(pages: &'a [u64]) -> Self {
        Self {
            word: pages.first().copied().unwrap_or(0),
            pages,
            page: 0,
        }
    }
}

impl Iterator for Bits<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        while self.word == 0 {
            self.page += 1;
            self.word = *self.pages.get(self.page)?;
        }
        let bit = self.word.trailing_zeros() as usize;
        self.word &= self.word - 1;
        Some(self.page * PAGE_BITS + bit)
    }
}

impl FusedIterator for Bits<'_> {}

// -----------------------------------------------------------------------------
// MergedBits

/// Ascending iterator over a page-wise combination of two fields.
///
/// Produced by [`BitField::union`], [`BitField::intersection`] and
/// [`BitField::difference`]. Missing pages read as zero.
///
/// [`BitField::union`]: crate::bitfield::BitField::union
/// [`BitField::intersection`]: crate::bitfield::BitField::intersection
/// [`BitField::difference`]: crate::bitfield::BitField::difference
#[derive(Clone)]
pub struct MergedBits<'a> {
    left: &'a [u64],
    right: &'a [u64],
    combine: fn(u64, u64) -> u64,
    end: usize,
    page: usize,
    word: u64,
}

impl<'a> MergedBits<'a> {
    #[inline]
    pub(crate) fn new(
        left: &'a [u64],
        right: &'a [u64],
        end: usize,
        combine: fn(u64, u64) -> u64,
    ) -> Self {
        let mut iter = Self {
            left,
            right,
            combine,
            end,
            page: 0,
            word: 0,
        };
        if end > 0 {
            iter.word = iter.load(0);
        }
        iter
    }

    #[inline(always)]
    fn load(&self, page: usize) -> u64 {
        let l = self.left.get(page).copied().unwrap_or(0);
        let r = self.right.get(page).copied().unwrap_or(0);
        (self.combine)(l, r)
    }
}

impl Iterator for MergedBits<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        while self.word == 0 {
            self.page += 1;
            if self.page >= self.end {
                return None;
            }
            self.word = self.load(self.page);
        }
        let bit = self.word.trailing_zeros() as usize;
        self.word &= self.word - 1;
        Some(self.page * PAGE_BITS + bit)
    }
}

impl FusedIterator for MergedBits<'_> {}
