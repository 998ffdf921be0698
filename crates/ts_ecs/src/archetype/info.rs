use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt::Debug;

use super::ArchetypeId;
use crate::bitfield::{BitField, BitFieldCache, BitFieldGenerator};
use crate::cfg;
use crate::component::{ComponentId, ComponentInfo};
use crate::entity::Entity;
use crate::revision::{ColumnEvent, ColumnRevision, RevisionMonitor, RevisionStorage};
use crate::storage::{BoxedValue, PAGE_ROWS, Range, SparseColumnStorage, Storages};
use crate::utils::DebugName;

// -----------------------------------------------------------------------------
// Columns

/// A dense column: one slot per row, in the archetype's range of the shared
/// [`ColumnData`](crate::storage::ColumnData).
pub(crate) struct DenseColumn {
    pub(crate) id: ComponentId,
    pub(crate) range: Range,
    pub(crate) revision: ColumnRevision,
}

/// A sparse column: only rows whose bit is set own a slot.
pub(crate) struct SparseColumn {
    pub(crate) id: ComponentId,
    pub(crate) range: Range,
    pub(crate) storage: SparseColumnStorage,
    pub(crate) revision: ColumnRevision,
}

// -----------------------------------------------------------------------------
// Archetype

/// A collection of entities that share the exact same set of dense
/// components.
///
/// Rows are compacted: a row is only ever released when it is the last one,
/// so removing an entity from the middle first moves the last row into its
/// place. The structural [`revision`](Self::revision) changes on every row
/// allocation, release and move.
pub struct Archetype {
    id: ArchetypeId,
    type_mask: BitField,
    sparse_mask: BitField,
    pub(crate) listener_mask: BitField,
    entities: Vec<Entity>,
    capacity: u32,
    pub(crate) dense: Box<[DenseColumn]>,
    pub(crate) sparse: Vec<SparseColumn>,
    revision: u32,
}

impl Debug for Archetype {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Archetype")
            .field("id", &self.id)
            .field("type_mask", &self.type_mask)
            .field("sparse_mask", &self.sparse_mask)
            .field("len", &self.entities.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl Archetype {
    /// Creates an archetype whose dense columns are `infos`, in ascending id
    /// order.
    pub(crate) fn new(
        id: ArchetypeId,
        type_mask: BitField,
        empty: BitField,
        infos: &[ComponentInfo],
        storages: &mut Storages,
    ) -> Self {
        debug_assert!(infos.is_sorted_by_key(|info| info.id().index()));
        let dense = infos
            .iter()
            .map(|info| {
                storages.columns.require_column(info);
                DenseColumn {
                    id: info.id(),
                    range: Range::EMPTY,
                    revision: ColumnRevision::new(&mut storages.revisions),
                }
            })
            .collect();

        Self {
            id,
            type_mask,
            sparse_mask: empty.clone(),
            listener_mask: empty,
            entities: Vec::new(),
            capacity: 0,
            dense,
            sparse: Vec::new(),
            revision: 0,
        }
    }

    #[inline(always)]
    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    /// The dense components of this archetype.
    #[inline(always)]
    pub fn type_mask(&self) -> &BitField {
        &self.type_mask
    }

    /// Sparse components at least one row of this archetype has held.
    #[inline(always)]
    pub fn sparse_mask(&self) -> &BitField {
        &self.sparse_mask
    }

    /// Listeners notified when entities enter or leave this archetype.
    #[inline(always)]
    pub fn listener_mask(&self) -> &BitField {
        &self.listener_mask
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The last occupied row.
    #[inline]
    pub fn max_item(&self) -> Option<u32> {
        self.entities.len().checked_sub(1).map(|row| row as u32)
    }

    /// Rows the dense columns can hold before they grow.
    #[inline(always)]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Structural revision, changed by every row allocation, release and move.
    #[inline(always)]
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Entities by row.
    #[inline(always)]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    #[inline]
    pub fn entity(&self, row: u32) -> Option<Entity> {
        self.entities.get(row as usize).copied()
    }

    /// Dense components in column order.
    pub fn dense_components(&self) -> impl ExactSizeIterator<Item = ComponentId> + '_ {
        self.dense.iter().map(|column| column.id)
    }

    /// Sparse columns in ascending id order.
    pub fn sparse_components(&self) -> impl ExactSizeIterator<Item = ComponentId> + '_ {
        self.sparse.iter().map(|column| column.id)
    }

    /// Returns `true` if the archetype has a column for `id`.
    ///
    /// For sparse components this only says that the column exists; use
    /// [`has_sparse`](Self::has_sparse) for a specific row.
    #[inline]
    pub fn contains(&self, id: ComponentId) -> bool {
        if id.is_sparse() {
            self.sparse_mask.contains(id.index())
        } else {
            id.is_dense() && self.type_mask.contains(id.index())
        }
    }

    /// Index of the dense column of `id`.
    #[inline]
    pub fn column_index(&self, id: ComponentId) -> Option<usize> {
        if !id.is_dense() {
            return None;
        }
        self.type_mask.rank(id.index())
    }

    /// Index of the sparse column of `id`.
    #[inline]
    pub fn sparse_index(&self, id: ComponentId) -> Option<usize> {
        if !id.is_sparse() {
            return None;
        }
        self.sparse
            .binary_search_by_key(&id.index(), |column| column.id.index())
            .ok()
    }

    /// Returns `true` if `row` holds a value of the sparse component `id`.
    #[inline]
    pub fn has_sparse(&self, id: ComponentId, row: u32) -> bool {
        self.sparse_index(id)
            .is_some_and(|column| self.sparse[column].storage.contains(row as usize))
    }

    /// Number of rows holding a value of the sparse component `id`.
    pub fn sparse_len(&self, id: ComponentId) -> usize {
        self.sparse_index(id)
            .map_or(0, |column| self.sparse[column].storage.len())
    }

    /// Position of `row` of dense column `column` in the shared array.
    #[inline(always)]
    pub(crate) fn dense_slot(&self, column: usize, row: u32) -> usize {
        self.dense[column].range.at(row as usize)
    }

    /// Position of `row` of sparse column `column` in the shared array.
    #[inline]
    pub(crate) fn sparse_slot(&self, column: usize, row: u32) -> Option<usize> {
        let column = &self.sparse[column];
        let slot = column.storage.get_index(row as usize)?;
        Some(column.range.at(slot as usize))
    }

    /// The change log of the column of `id`.
    pub(crate) fn column_revision_mut(&mut self, id: ComponentId) -> Option<&mut ColumnRevision> {
        if let Some(column) = self.column_index(id) {
            return Some(&mut self.dense[column].revision);
        }
        let column = self.sparse_index(id)?;
        Some(&mut self.sparse[column].revision)
    }

    /// Position of the value of `id` at `row` in the shared array.
    pub(crate) fn slot_of(&self, id: ComponentId, row: u32) -> Option<usize> {
        if let Some(column) = self.column_index(id) {
            return Some(self.dense_slot(column, row));
        }
        self.sparse_slot(self.sparse_index(id)?, row)
    }

    /// Polls `monitor` against its column. Returns `false` if the archetype
    /// has no column of the monitored component.
    pub(crate) fn sync_monitor(
        &mut self,
        monitor: &mut RevisionMonitor,
        revisions: &mut RevisionStorage,
        f: impl FnMut(ColumnEvent),
    ) -> bool {
        let id = monitor.column();
        if let Some(column) = self.column_index(id) {
            let live = 0..self.entities.len();
            monitor.sync(&mut self.dense[column].revision, revisions, live, f);
            return true;
        }
        let Some(column) = self.sparse_index(id) else {
            return false;
        };
        let column = &mut self.sparse[column];
        monitor.sync(&mut column.revision, revisions, column.storage.rows(), f);
        true
    }

    /// Drops the retention held by `monitor`.
    pub(crate) fn release_monitor(
        &mut self,
        monitor: RevisionMonitor,
        revisions: &mut RevisionStorage,
    ) -> bool {
        match self.column_revision_mut(monitor.column()) {
            Some(revision) => {
                monitor.release(revision, revisions);
                true
            }
            None => false,
        }
    }

    /// Sets or clears listener bit `bit`.
    pub(crate) fn set_listener(&mut self, bit: usize, enabled: bool, cache: &BitFieldCache) {
        if self.listener_mask.contains(bit) == enabled {
            return;
        }
        let mut generator = BitFieldGenerator::from_field(&self.listener_mask);
        if enabled {
            generator.add(bit);
        } else {
            generator.remove(bit);
        }
        self.listener_mask = generator.build(cache);
    }

    /// Records an in-place write of `id` at `row`.
    pub(crate) fn mark_modified(&mut self, id: ComponentId, row: u32, storages: &mut Storages) {
        if let Some(revision) = self.column_revision_mut(id) {
            revision.mark_modified(&mut storages.revisions, row as usize);
        }
    }

    #[inline(always)]
    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    #[cold]
    #[inline(never)]
    fn grow(&mut self, storages: &mut Storages, initial: u32) {
        let live = self.entities.len() as u32;
        let capacity = match self.capacity {
            0 => initial.max(1),
            capacity => capacity * 2,
        };
        for column in &mut self.dense {
            let data = storages.columns.expect_mut(column.id);
            column.range = data.resize(column.range, live, capacity);
        }
        self.capacity = capacity;
    }

    /// Appends a row for `entity` and returns it. Every dense slot of the row
    /// holds a default value.
    pub(crate) fn allocate_row(
        &mut self,
        entity: Entity,
        storages: &mut Storages,
        initial_capacity: u32,
    ) -> u32 {
        let row = self.entities.len() as u32;
        if row == self.capacity {
            self.grow(storages, initial_capacity);
        }
        self.entities.push(entity);
        for column in &mut self.dense {
            column.revision.mark_created(&mut storages.revisions, row as usize);
        }
        self.bump();
        row
    }

    /// Releases the last row.
    ///
    /// # Panics
    ///
    /// Panics if `row` is not the last row.
    pub(crate) fn release_row(&mut self, row: u32, storages: &mut Storages) {
        if row as usize + 1 != self.entities.len() {
            not_last_row(self.id, row, self.entities.len());
        }
        let index = row as usize;
        for column in &mut self.dense {
            storages.columns.expect_mut(column.id).reset(column.range.at(index));
            column.revision.mark_destroyed(&mut storages.revisions, index);
        }
        for column in 0..self.sparse.len() {
            if self.sparse[column].storage.contains(index) {
                self.clear_stale_sparse(column, row, storages);
            }
        }
        self.entities.pop();
        self.bump();
    }

    /// Moves the last row `src` into the vacated row `dst`.
    pub(crate) fn move_row(&mut self, src: u32, dst: u32, storages: &mut Storages) {
        debug_assert!(dst < src && (src as usize) < self.entities.len());
        let (s, d) = (src as usize, dst as usize);
        for column in &mut self.dense {
            let data = storages.columns.expect_mut(column.id);
            data.move_value(column.range.at(s), column.range.at(d));
            column.revision.mark_destroyed(&mut storages.revisions, d);
            column.revision.mark_created(&mut storages.revisions, d);
        }
        for column in 0..self.sparse.len() {
            if self.sparse[column].storage.contains(d) {
                self.clear_stale_sparse(column, dst, storages);
            }
            if let Some(value) = self.take_sparse(column, src, storages) {
                let slot = self.insert_sparse(column, dst, storages);
                storages
                    .columns
                    .expect_mut(self.sparse[column].id)
                    .put_boxed(slot, value);
            }
        }
        self.entities[d] = self.entities[s];
        self.bump();
    }

    /// Moves the values of `src_row` into `dst_row` of `dst`.
    ///
    /// Dense values move for the components both archetypes have, found by
    /// one merge pass over the two column lists. Sparse values always move,
    /// creating the destination column if needed. Values of components `dst`
    /// lacks stay behind for the source row's release.
    pub(crate) fn copy_row_to(
        &mut self,
        src_row: u32,
        dst: &mut Archetype,
        dst_row: u32,
        storages: &mut Storages,
        cache: &BitFieldCache,
        page_reserve: usize,
    ) {
        let (s, d) = (src_row as usize, dst_row as usize);

        let (mut i, mut j) = (0, 0);
        while i < self.dense.len() && j < dst.dense.len() {
            let (a, b) = (&self.dense[i], &dst.dense[j]);
            match a.id.index().cmp(&b.id.index()) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    let data = storages.columns.expect_mut(a.id);
                    data.move_value(a.range.at(s), b.range.at(d));
                    i += 1;
                    j += 1;
                }
            }
        }

        for column in 0..self.sparse.len() {
            let id = self.sparse[column].id;
            let Some(value) = self.take_sparse(column, src_row, storages) else {
                continue;
            };
            let info = *storages.columns.expect(id).info();
            let target = dst.require_sparse_column(&info, storages, cache, page_reserve);
            if dst.sparse[target].storage.contains(d) {
                dst.clear_stale_sparse(target, dst_row, storages);
            }
            let slot = dst.insert_sparse(target, dst_row, storages);
            storages.columns.expect_mut(id).put_boxed(slot, value);
        }
    }

    /// Returns the index of the sparse column of `info`, inserting it at its
    /// sorted position first if the archetype has none.
    pub(crate) fn require_sparse_column(
        &mut self,
        info: &ComponentInfo,
        storages: &mut Storages,
        cache: &BitFieldCache,
        page_reserve: usize,
    ) -> usize {
        let key = info.id().index();
        match self.sparse.binary_search_by_key(&key, |column| column.id.index()) {
            Ok(column) => column,
            Err(column) => {
                storages.columns.require_column(info);
                self.sparse.insert(
                    column,
                    SparseColumn {
                        id: info.id(),
                        range: Range::EMPTY,
                        storage: SparseColumnStorage::with_pages(page_reserve),
                        revision: ColumnRevision::new(&mut storages.revisions),
                    },
                );
                let mut generator = BitFieldGenerator::from_field(&self.sparse_mask);
                generator.add(key);
                self.sparse_mask = generator.build(cache);

                log::debug!("Archetype {} gained sparse column {}", self.id, info.name());
                column
            }
        }
    }

    /// Gives `row` a slot in sparse column `column` and returns its position
    /// in the shared array. The slot holds a default value.
    ///
    /// # Panics
    ///
    /// Panics if the row already has a value.
    pub(crate) fn insert_sparse(&mut self, column: usize, row: u32, storages: &mut Storages) -> usize {
        let column = &mut self.sparse[column];
        let mutation = column.storage.allocate_index(row as usize);
        let data = storages.columns.expect_mut(column.id);

        let required = column.storage.required_len();
        if required > column.range.length {
            let length = required.next_power_of_two().max(PAGE_ROWS as u32);
            column.range = data.resize(column.range, column.range.length, length);
        }

        data.apply_insert(column.range.start, mutation);
        column.revision.mark_created(&mut storages.revisions, row as usize);
        column.range.at(mutation.slot() as usize)
    }

    /// Moves the value of `row` out of sparse column `column`.
    pub(crate) fn take_sparse(
        &mut self,
        column: usize,
        row: u32,
        storages: &mut Storages,
    ) -> Option<BoxedValue> {
        let column = &mut self.sparse[column];
        let slot = column.storage.get_index(row as usize)?;
        let data = storages.columns.expect_mut(column.id);
        let value = data.take_boxed(column.range.at(slot as usize));

        let mutation = column.storage.remove_index(row as usize);
        data.apply_remove(column.range.start, mutation);
        column.revision.mark_destroyed(&mut storages.revisions, row as usize);
        Some(value)
    }

    /// Drops the value of `row` in sparse column `column`, if any.
    pub(crate) fn remove_sparse(&mut self, column: usize, row: u32, storages: &mut Storages) -> bool {
        let column = &mut self.sparse[column];
        let Some(mutation) = column.storage.try_remove_index(row as usize) else {
            return false;
        };
        storages
            .columns
            .expect_mut(column.id)
            .apply_remove(column.range.start, mutation);
        column.revision.mark_destroyed(&mut storages.revisions, row as usize);
        true
    }

    /// Drops every sparse value of `row`.
    pub(crate) fn clear_sparse_row(&mut self, row: u32, storages: &mut Storages) {
        for column in 0..self.sparse.len() {
            self.remove_sparse(column, row, storages);
        }
    }

    /// A sparse value outlived its row. Checked builds stop here; otherwise
    /// the value is dropped so it cannot surface on another entity.
    fn clear_stale_sparse(&mut self, column: usize, row: u32, storages: &mut Storages) {
        if cfg::DEBUG {
            let name = storages.columns.expect(self.sparse[column].id).info().name();
            stale_sparse_value(self.id, row, name);
        }
        self.remove_sparse(column, row, storages);
    }
}

#[cold]
#[inline(never)]
fn not_last_row(id: ArchetypeId, row: u32, len: usize) -> ! {
    panic!("archetype {id} can only release its last row, got {row} of {len}");
}

#[cold]
#[inline(never)]
fn stale_sparse_value(id: ArchetypeId, row: u32, name: DebugName) -> ! {
    panic!("stale {name} value on row {row} of archetype {id}");
}
