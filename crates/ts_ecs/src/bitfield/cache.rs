use alloc::sync::{Arc, Weak};
use core::fmt::Debug;
use core::hash::BuildHasher;
use std::sync::{Mutex, PoisonError};

use ts_utils::hash::{FixedHashState, HashTable};

use super::field::FieldData;
use super::{BitField, trim};

// -----------------------------------------------------------------------------
// BitFieldCache

struct Interned {
    entries: HashTable<(u64, Weak<FieldData>)>,
    /// Entry count after the last purge of dead entries.
    purge_at: usize,
}

/// Deduplicates [`BitField`] contents.
///
/// Entries are weak: a field is freed once every handle is dropped, and its
/// slot is purged the next time the table has doubled since the last purge.
pub struct BitFieldCache {
    empty: BitField,
    interned: Mutex<Interned>,
}

impl BitFieldCache {
    const MIN_PURGE: usize = 64;

    pub fn new() -> Self {
        let empty = BitField(Arc::new(FieldData {
            hash: FixedHashState.hash_one::<&[u64]>(&[]),
            pages: Default::default(),
        }));
        Self {
            empty,
            interned: Mutex::new(Interned {
                entries: HashTable::new(),
                purge_at: Self::MIN_PURGE,
            }),
        }
    }

    /// The canonical empty field.
    #[inline]
    pub fn empty(&self) -> BitField {
        self.empty.clone()
    }

    /// Returns the shared field holding exactly `pages`.
    pub fn intern(&self, pages: &[u64]) -> BitField {
        let pages = trim(pages);
        if pages.is_empty() {
            return self.empty();
        }
        let hash = FixedHashState.hash_one(pages);

        let mut interned = self.interned.lock().unwrap_or_else(PoisonError::into_inner);

        let found = interned
            .entries
            .find(hash, |(h, weak)| {
                *h == hash && weak.upgrade().is_some_and(|data| *data.pages == *pages)
            })
            .and_then(|(_, weak)| weak.upgrade());
        if let Some(data) = found {
            return BitField(data);
        }

        if interned.entries.len() >= interned.purge_at {
            purge(&mut interned);
        }

        let data = Arc::new(FieldData {
            hash,
            pages: pages.into(),
        });
        interned
            .entries
            .insert_unique(hash, (hash, Arc::downgrade(&data)), |(h, _)| *h);
        BitField(data)
    }

    /// Number of fields currently alive, the empty field excluded.
    pub fn len(&self) -> usize {
        let interned = self.interned.lock().unwrap_or_else(PoisonError::into_inner);
        interned
            .entries
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }
}

#[cold]
#[inline(never)]
fn purge(interned: &mut Interned) {
    interned.entries.retain(|(_, weak)| weak.strong_count() > 0);
    interned.purge_at = (interned.entries.len() * 2).max(BitFieldCache::MIN_PURGE);
}

impl Default for BitFieldCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for BitFieldCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BitFieldCache")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::BitFieldCache;
    use crate::bitfield::BitFieldGenerator;
    use alloc::vec::Vec;

    #[test]
    fn identical_contents_share_allocation() {
        let cache = BitFieldCache::new();
        let mut a = BitFieldGenerator::new();
        a.add(4).add(900);
        let mut b = BitFieldGenerator::new();
        b.add(900).add(4).add(12).remove(12);

        let fa = a.build(&cache);
        let fb = b.build(&cache);
        assert_eq!(fa, fb);
        assert!(alloc::sync::Arc::ptr_eq(&fa.0, &fb.0));
        assert_eq!(cache.len(), 1);

        b.add(5);
        assert_ne!(b.build(&cache), fa);
    }

    #[test]
    fn dropped_fields_are_released() {
        let cache = BitFieldCache::new();
        let fields = (0..200)
            .map(|bit| {
                let mut generator = BitFieldGenerator::new();
                generator.add(bit);
                generator.build(&cache)
            })
            .collect::<Vec<_>>();
        assert_eq!(cache.len(), 200);
        drop(fields);
        assert_eq!(cache.len(), 0);

        let mut generator = BitFieldGenerator::new();
        generator.add(1);
        let again = generator.build(&cache);
        assert_eq!(again.iter().collect::<Vec<_>>(), [1]);
        assert_eq!(cache.len(), 1);
    }
}
