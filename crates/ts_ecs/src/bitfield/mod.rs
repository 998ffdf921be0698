//! Interned, immutable type-id sets.
//!
//! A [`BitField`] is built once through a [`BitFieldGenerator`] and interned by
//! a [`BitFieldCache`]. Two fields from the same cache are equal exactly when
//! they share an allocation, so mask comparison and hashing are O(1).

// -----------------------------------------------------------------------------
// Modules

mod cache;
mod field;
mod generator;
mod iter;

// -----------------------------------------------------------------------------
// Exports

pub use cache::BitFieldCache;
pub use field::BitField;
pub use generator::BitFieldGenerator;
pub use iter::{Bits, MergedBits};

/// Bits per page.
pub const PAGE_BITS: usize = 64;

/// Maximum number of pages in a field.
pub const MAX_PAGES: usize = 64;

/// Maximum number of distinct bits, `PAGE_BITS * MAX_PAGES`.
pub const MAX_BITS: usize = PAGE_BITS * MAX_PAGES;

/// Strips trailing empty pages.
#[inline]
pub(crate) fn trim(pages: &[u64]) -> &[u64] {
    let len = pages.iter().rposition(|&p| p != 0).map_or(0, |p| p + 1);
    &pages[..len]
}
