use alloc::vec::Vec;

use super::{Epoch, RevisionStorage};
use crate::storage::Range;

/// High bit of [`ColumnRevision::current`]: the head epoch is closed.
pub const FLUSHED: u32 = 1 << 31;

/// Change log head of one column.
///
/// The column owns a range of epoch slots inside a [`RevisionStorage`].
/// Writes go to the head epoch until a reader flushes it, after which the
/// next write opens a new epoch with the next revision number.
#[derive(Debug, Clone, Copy)]
pub struct ColumnRevision {
    current: u32,
    slots: Range,
    head: u32,
}

impl ColumnRevision {
    pub fn new(storage: &mut RevisionStorage) -> Self {
        let slots = storage.allocate(1);
        storage.epoch_mut(slots.start as usize).reset(0);
        Self {
            current: 0,
            slots,
            head: 0,
        }
    }

    /// Revision number of the head epoch.
    #[inline(always)]
    pub const fn revision(&self) -> u32 {
        self.current & !FLUSHED
    }

    #[inline(always)]
    pub const fn is_flushed(&self) -> bool {
        self.current & FLUSHED != 0
    }

    #[inline(always)]
    pub const fn slots(&self) -> Range {
        self.slots
    }

    #[inline(always)]
    fn head_index(&self) -> usize {
        self.slots.at(self.head as usize)
    }

    /// Returns the epoch that receives writes, opening a new one if the head
    /// was flushed.
    pub fn realize<'a>(&mut self, storage: &'a mut RevisionStorage) -> &'a mut Epoch {
        if !self.is_flushed() {
            return storage.epoch_mut(self.head_index());
        }

        let next = self.revision() + 1;
        debug_assert!(next < FLUSHED, "revision counter exhausted");

        let head = self.head_index();
        let epoch = storage.epoch(head);
        if epoch.is_empty() && epoch.refs == 0 {
            self.current = next;
            let epoch = storage.epoch_mut(head);
            epoch.reset(next);
            return epoch;
        }

        let slot = match self.find_reusable(storage) {
            Some(slot) => slot,
            None => {
                let slot = self.slots.length;
                self.slots = storage.resize(self.slots, self.slots.length * 2);
                slot
            }
        };

        self.head = slot;
        self.current = next;
        let epoch = storage.epoch_mut(self.head_index());
        epoch.reset(next);
        epoch
    }

    /// Picks a slot no monitor can read anymore: unused, older than every
    /// referenced epoch, or any slot when nothing is referenced.
    fn find_reusable(&self, storage: &RevisionStorage) -> Option<u32> {
        let epochs = storage.epochs(self.slots);
        let oldest = epochs
            .iter()
            .filter(|e| e.refs > 0)
            .map(Epoch::revision)
            .min()
            .unwrap_or(u32::MAX);

        let mut best: Option<(u32, u32)> = None;
        for (slot, epoch) in epochs.iter().enumerate() {
            let slot = slot as u32;
            if slot == self.head || epoch.refs > 0 {
                continue;
            }
            if !epoch.is_empty() && epoch.revision >= oldest {
                continue;
            }
            if best.is_none_or(|(_, rev)| epoch.revision < rev) {
                best = Some((slot, epoch.revision));
            }
        }
        best.map(|(slot, _)| slot)
    }

    /// Closes the head epoch and retains it on behalf of a reader.
    ///
    /// Returns the revision the reader is now synchronized with.
    pub fn reference(&mut self, storage: &mut RevisionStorage) -> u32 {
        self.current |= FLUSHED;
        storage.epoch_mut(self.head_index()).refs += 1;
        self.revision()
    }

    /// Drops a retention taken by [`reference`](Self::reference).
    pub fn dereference(&mut self, storage: &mut RevisionStorage, revision: u32) {
        if crate::cfg::DEBUG {
            assert!(
                revision <= self.revision(),
                "dereferencing revision {revision} ahead of column revision {}",
                self.revision(),
            );
        }
        let start = self.slots.start as usize;
        for index in start..start + self.slots.length as usize {
            let epoch = storage.epoch_mut(index);
            if epoch.revision == revision && epoch.refs > 0 {
                epoch.refs -= 1;
                return;
            }
        }
        debug_assert!(false, "revision {revision} is not retained");
    }

    /// Epochs newer than `seen`, oldest first.
    pub fn epochs_since<'a>(&self, storage: &'a RevisionStorage, seen: u32) -> Vec<&'a Epoch> {
        let current = self.revision();
        if seen >= current {
            return Vec::new();
        }
        let mut epochs: Vec<&Epoch> = storage
            .epochs(self.slots)
            .iter()
            .filter(|e| e.revision > seen && e.revision <= current)
            .collect();
        epochs.sort_unstable_by_key(|e| e.revision);
        epochs
    }

    pub fn mark_created(&mut self, storage: &mut RevisionStorage, row: usize) {
        self.realize(storage).mark_created(row);
    }

    pub fn mark_modified(&mut self, storage: &mut RevisionStorage, row: usize) {
        self.realize(storage).mark_modified(row);
    }

    pub fn mark_destroyed(&mut self, storage: &mut RevisionStorage, row: usize) {
        self.realize(storage).mark_destroyed(row);
    }

    pub fn release(self, storage: &mut RevisionStorage) {
        storage.release(self.slots);
    }
}

#[cfg(test)]
mod tests {
    use super::ColumnRevision;
    use crate::revision::RevisionStorage;
    use alloc::vec::Vec;

    fn created(revision: &ColumnRevision, storage: &RevisionStorage, seen: u32) -> Vec<usize> {
        revision
            .epochs_since(storage, seen)
            .into_iter()
            .flat_map(|e| e.created())
            .collect()
    }

    #[test]
    fn unflushed_writes_share_an_epoch() {
        let mut storage = RevisionStorage::new();
        let mut rev = ColumnRevision::new(&mut storage);
        rev.mark_created(&mut storage, 0);
        rev.mark_created(&mut storage, 1);
        assert_eq!(rev.revision(), 0);
        assert!(!rev.is_flushed());
        assert_eq!(rev.slots().length, 1);
    }

    #[test]
    fn readers_only_see_newer_epochs() {
        let mut storage = RevisionStorage::new();
        let mut rev = ColumnRevision::new(&mut storage);

        let seen = rev.reference(&mut storage);
        assert_eq!(seen, 0);
        assert!(created(&rev, &storage, seen).is_empty());

        rev.mark_created(&mut storage, 3);
        assert_eq!(rev.revision(), 1);
        rev.mark_created(&mut storage, 4);
        assert_eq!(created(&rev, &storage, seen), [3, 4]);

        rev.dereference(&mut storage, seen);
        let seen = rev.reference(&mut storage);
        assert_eq!(seen, 1);
        assert!(created(&rev, &storage, seen).is_empty());
    }

    #[test]
    fn retained_epochs_survive_and_free_ones_recycle() {
        let mut storage = RevisionStorage::new();
        let mut rev = ColumnRevision::new(&mut storage);

        // a slow reader holds revision 0
        let slow = rev.reference(&mut storage);
        let mut fast = slow;
        rev.reference(&mut storage);

        for row in 0..6 {
            rev.mark_created(&mut storage, row);
            rev.dereference(&mut storage, fast);
            fast = rev.reference(&mut storage);
        }
        rev.dereference(&mut storage, slow);
        assert_eq!(created(&rev, &storage, slow), [0, 1, 2, 3, 4, 5]);
        assert!(created(&rev, &storage, fast).is_empty());

        // with the slow reader gone, old slots are reused instead of growing
        let slots = rev.slots().length;
        for row in 0..16 {
            rev.mark_created(&mut storage, row);
            rev.dereference(&mut storage, fast);
            fast = rev.reference(&mut storage);
        }
        assert_eq!(rev.slots().length, slots);
    }

    #[test]
    #[should_panic]
    fn dereference_ahead_panics() {
        let mut storage = RevisionStorage::new();
        let mut rev = ColumnRevision::new(&mut storage);
        rev.dereference(&mut storage, 5);
    }
}
