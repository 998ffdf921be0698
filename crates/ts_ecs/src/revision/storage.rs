use alloc::vec::Vec;
use core::fmt::Debug;
use core::mem;

use fixedbitset::{FixedBitSet, Ones};

use crate::storage::{Range, RangeAllocator};

// -----------------------------------------------------------------------------
// Epoch

/// One epoch of a column: three row sets and a retention count.
#[derive(Default)]
pub struct Epoch {
    pub(crate) revision: u32,
    pub(crate) refs: u32,
    recorded: bool,
    created: FixedBitSet,
    modified: FixedBitSet,
    destroyed: FixedBitSet,
}

#[inline]
fn unset(set: &mut FixedBitSet, row: usize) {
    if row < set.len() {
        set.set(row, false);
    }
}

impl Epoch {
    #[inline(always)]
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Returns `true` if nothing was recorded yet.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        !self.recorded
    }

    /// Rows that received a new value in this epoch.
    #[inline]
    pub fn created(&self) -> Ones<'_> {
        self.created.ones()
    }

    /// Rows written in place in this epoch.
    #[inline]
    pub fn changes(&self) -> Ones<'_> {
        self.modified.ones()
    }

    /// Rows whose value went away in this epoch.
    #[inline]
    pub fn destroyed(&self) -> Ones<'_> {
        self.destroyed.ones()
    }

    pub(crate) fn reset(&mut self, revision: u32) {
        self.revision = revision;
        self.refs = 0;
        self.recorded = false;
        self.created.clear();
        self.modified.clear();
        self.destroyed.clear();
    }

    /// A row replaced within the epoch keeps both its destroyed and created
    /// bits, so readers see the old value go and the new one arrive.
    pub(crate) fn mark_created(&mut self, row: usize) {
        self.recorded = true;
        unset(&mut self.modified, row);
        self.created.grow_and_insert(row);
    }

    pub(crate) fn mark_modified(&mut self, row: usize) {
        self.recorded = true;
        if !self.created.contains(row) {
            self.modified.grow_and_insert(row);
        }
    }

    /// A row created and destroyed within the same epoch leaves no trace.
    pub(crate) fn mark_destroyed(&mut self, row: usize) {
        self.recorded = true;
        unset(&mut self.modified, row);
        if self.created.contains(row) {
            unset(&mut self.created, row);
        } else {
            self.destroyed.grow_and_insert(row);
        }
    }
}

impl Debug for Epoch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Epoch")
            .field("revision", &self.revision)
            .field("refs", &self.refs)
            .field("created", &self.created.ones().collect::<Vec<_>>())
            .field("modified", &self.modified.ones().collect::<Vec<_>>())
            .field("destroyed", &self.destroyed.ones().collect::<Vec<_>>())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// RevisionStorage

/// The shared pool of epochs. Each [`ColumnRevision`] owns a range of it.
///
/// [`ColumnRevision`]: crate::revision::ColumnRevision
#[derive(Default)]
pub struct RevisionStorage {
    epochs: Vec<Epoch>,
    ranges: RangeAllocator,
}

impl RevisionStorage {
    pub const fn new() -> Self {
        Self {
            epochs: Vec::new(),
            ranges: RangeAllocator::new(),
        }
    }

    #[inline]
    fn fit(&mut self) {
        let end = self.ranges.end() as usize;
        if self.epochs.len() < end {
            self.epochs.resize_with(end, Epoch::default);
        }
    }

    pub(crate) fn allocate(&mut self, slots: u32) -> Range {
        let range = self.ranges.allocate(slots);
        self.fit();
        range
    }

    /// Grows `range` to `slots`, moving its epochs if needed.
    pub(crate) fn resize(&mut self, range: Range, slots: u32) -> Range {
        if self.ranges.try_extend(range, slots) {
            self.fit();
            return Range::new(range.start, slots);
        }
        let moved = self.ranges.allocate(slots);
        self.fit();
        for i in 0..range.length {
            let epoch = mem::take(&mut self.epochs[(range.start + i) as usize]);
            self.epochs[(moved.start + i) as usize] = epoch;
        }
        self.ranges.release(range);
        moved
    }

    pub(crate) fn release(&mut self, range: Range) {
        for epoch in &mut self.epochs[range.as_usize()] {
            *epoch = Epoch::default();
        }
        self.ranges.release(range);
    }

    #[inline]
    pub fn epoch(&self, index: usize) -> &Epoch {
        &self.epochs[index]
    }

    #[inline]
    pub(crate) fn epoch_mut(&mut self, index: usize) -> &mut Epoch {
        &mut self.epochs[index]
    }

    #[inline]
    pub(crate) fn epochs(&self, range: Range) -> &[Epoch] {
        &self.epochs[range.as_usize()]
    }

    /// Epoch slots handed out to columns.
    pub fn len(&self) -> usize {
        (self.ranges.end() - self.ranges.fragmented()) as usize
    }
}

impl Debug for RevisionStorage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RevisionStorage")
            .field("slots", &self.len())
            .finish()
    }
}
