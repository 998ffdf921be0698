use alloc::vec::Vec;
use core::fmt::Debug;
use core::iter::FusedIterator;

/// Logical rows per sparse page.
pub const PAGE_ROWS: usize = 32;

/// Block capacities are 1, 2, 4, .., `PAGE_ROWS`.
const SIZE_CLASSES: usize = PAGE_ROWS.trailing_zeros() as usize + 1;

// -----------------------------------------------------------------------------
// DataMutation

/// The data movement a [`SparseColumnStorage`] update requires.
///
/// Offsets are relative to the start of the sparse column's range and locate
/// the page's block before and after the update. `index` is the slot inserted
/// or removed within the block, `count` the number of values the block held
/// before the update.
///
/// For an insertion, values before `index` move only if the block was
/// relocated; values from `index` on move one slot right. A removal closes the
/// gap by moving later values one slot left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataMutation {
    pub old_offset: u32,
    pub new_offset: u32,
    pub index: u32,
    pub count: u32,
}

impl DataMutation {
    #[inline(always)]
    pub fn relocated(&self) -> bool {
        self.old_offset != self.new_offset
    }

    /// Offset of the inserted or removed slot after the update.
    #[inline(always)]
    pub fn slot(&self) -> u32 {
        self.new_offset + self.index
    }
}

// -----------------------------------------------------------------------------
// SparseColumnStorage

#[derive(Clone, Copy, Default, Debug)]
struct SparsePage {
    mask: u32,
    offset: u32,
    capacity: u32,
}

impl SparsePage {
    /// Values stored before `bit`.
    #[inline(always)]
    fn rank(&self, bit: usize) -> u32 {
        (self.mask & ((1_u32 << bit) - 1)).count_ones()
    }
}

/// Maps the logical rows of an archetype to compacted slots.
///
/// Rows are grouped in pages of [`PAGE_ROWS`]. A page owns a block of
/// power-of-two capacity and stores the values of its set rows in row order,
/// so a lookup is a mask test plus a popcount. Blocks are carved from one
/// index space whose size is [`required_len`](Self::required_len); freed
/// blocks are recycled per capacity.
pub struct SparseColumnStorage {
    pages: Vec<SparsePage>,
    free_blocks: [Vec<u32>; SIZE_CLASSES],
    high_water: u32,
    len: usize,
}

impl SparseColumnStorage {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            free_blocks: Default::default(),
            high_water: 0,
            len: 0,
        }
    }

    /// Creates a storage with room for `pages` page headers.
    pub fn with_pages(pages: usize) -> Self {
        let mut storage = Self::new();
        storage.pages.reserve(pages);
        storage
    }

    /// Number of rows holding a value.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slots the backing range must provide.
    #[inline]
    pub fn required_len(&self) -> u32 {
        self.high_water
    }

    #[inline]
    pub fn contains(&self, row: usize) -> bool {
        self.pages
            .get(row / PAGE_ROWS)
            .is_some_and(|page| page.mask & (1 << (row % PAGE_ROWS)) != 0)
    }

    /// The slot of `row`, or `None` when the row has no value.
    #[inline]
    pub fn get_index(&self, row: usize) -> Option<u32> {
        let page = self.pages.get(row / PAGE_ROWS)?;
        let bit = row % PAGE_ROWS;
        if page.mask & (1 << bit) == 0 {
            return None;
        }
        Some(page.offset + page.rank(bit))
    }

    fn alloc_block(&mut self, capacity: u32) -> u32 {
        let class = capacity.trailing_zeros() as usize;
        match self.free_blocks[class].pop() {
            Some(offset) => offset,
            None => {
                let offset = self.high_water;
                self.high_water += capacity;
                offset
            }
        }
    }

    #[inline]
    fn free_block(&mut self, offset: u32, capacity: u32) {
        if capacity > 0 {
            self.free_blocks[capacity.trailing_zeros() as usize].push(offset);
        }
    }

    /// Gives `row` a slot.
    ///
    /// The caller applies the returned mutation to the data before writing
    /// the new value at [`DataMutation::slot`].
    ///
    /// # Panics
    ///
    /// Panics if `row` already has a slot.
    pub fn allocate_index(&mut self, row: usize) -> DataMutation {
        let page_index = row / PAGE_ROWS;
        let bit = row % PAGE_ROWS;
        if page_index >= self.pages.len() {
            self.pages.resize(page_index + 1, SparsePage::default());
        }

        let page = self.pages[page_index];
        if page.mask & (1 << bit) != 0 {
            already_allocated(row);
        }

        let index = page.rank(bit);
        let count = page.mask.count_ones();
        let old_offset = page.offset;
        let mut new_offset = page.offset;
        let mut capacity = page.capacity;

        if count + 1 > capacity {
            capacity = (count + 1).next_power_of_two();
            new_offset = self.alloc_block(capacity);
            self.free_block(page.offset, page.capacity);
        }

        self.pages[page_index] = SparsePage {
            mask: page.mask | (1 << bit),
            offset: new_offset,
            capacity,
        };
        self.len += 1;

        DataMutation {
            // a fresh block has nothing to move
            old_offset: if count == 0 { new_offset } else { old_offset },
            new_offset,
            index,
            count,
        }
    }

    /// Releases the slot of `row`, if it has one.
    ///
    /// Blocks are compacted, never tombstoned: a page whose last row is
    /// removed returns its block.
    pub fn try_remove_index(&mut self, row: usize) -> Option<DataMutation> {
        let page_index = row / PAGE_ROWS;
        let bit = row % PAGE_ROWS;
        let page = *self.pages.get(page_index)?;
        if page.mask & (1 << bit) == 0 {
            return None;
        }

        let mutation = DataMutation {
            old_offset: page.offset,
            new_offset: page.offset,
            index: page.rank(bit),
            count: page.mask.count_ones(),
        };

        let mask = page.mask & !(1 << bit);
        self.pages[page_index] = if mask == 0 {
            self.free_block(page.offset, page.capacity);
            SparsePage::default()
        } else {
            SparsePage { mask, ..page }
        };
        self.len -= 1;

        Some(mutation)
    }

    /// Like [`try_remove_index`](Self::try_remove_index).
    ///
    /// # Panics
    ///
    /// Panics if `row` has no slot.
    pub fn remove_index(&mut self, row: usize) -> DataMutation {
        match self.try_remove_index(row) {
            Some(mutation) => mutation,
            None => not_allocated(row),
        }
    }

    /// The first row at or after `from` that has a value.
    pub fn next_set_row(&self, from: usize) -> Option<usize> {
        let mut page_index = from / PAGE_ROWS;
        let bit = from % PAGE_ROWS;
        let first = self.pages.get(page_index)?;
        let mut mask = first.mask & !((1_u32 << bit) - 1);
        loop {
            if mask != 0 {
                return Some(page_index * PAGE_ROWS + mask.trailing_zeros() as usize);
            }
            page_index += 1;
            mask = self.pages.get(page_index)?.mask;
        }
    }

    /// Rows holding a value, ascending.
    #[inline]
    pub fn rows(&self) -> SparseRows<'_> {
        SparseRows {
            storage: self,
            next: 0,
        }
    }
}

#[cold]
#[inline(never)]
fn already_allocated(row: usize) -> ! {
    panic!("sparse row {row} already has a slot");
}

#[cold]
#[inline(never)]
fn not_allocated(row: usize) -> ! {
    panic!("sparse row {row} has no slot");
}

impl Default for SparseColumnStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for SparseColumnStorage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SparseColumnStorage")
            .field("len", &self.len)
            .field("required_len", &self.high_water)
            .field("rows", &self.rows().collect::<Vec<_>>())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// SparseRows

/// Iterator returned by [`SparseColumnStorage::rows`].
pub struct SparseRows<'a> {
    storage: &'a SparseColumnStorage,
    next: usize,
}

impl Iterator for SparseRows<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        let row = self.storage.next_set_row(self.next)?;
        self.next = row + 1;
        Some(row)
    }
}

impl FusedIterator for SparseRows<'_> {}
