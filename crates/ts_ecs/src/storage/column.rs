use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt::Debug;

use super::array::{BoxedValue, ErasedArray, TypedArray, type_mismatch};
use super::{DataMutation, Range, RangeAllocator};
use crate::component::{Component, ComponentId, ComponentInfo};

// -----------------------------------------------------------------------------
// ColumnData

/// All values of one component type, sliced into per-archetype ranges.
pub struct ColumnData {
    info: ComponentInfo,
    array: Box<dyn ErasedArray>,
    ranges: RangeAllocator,
}

impl ColumnData {
    pub(crate) fn new(info: ComponentInfo) -> Self {
        Self {
            array: info.new_array(),
            info,
            ranges: RangeAllocator::new(),
        }
    }

    #[inline(always)]
    pub fn info(&self) -> &ComponentInfo {
        &self.info
    }

    #[inline(always)]
    pub fn id(&self) -> ComponentId {
        self.info.id()
    }

    #[inline(always)]
    pub fn array(&self) -> &dyn ErasedArray {
        &*self.array
    }

    #[inline(always)]
    pub fn ranges(&self) -> &RangeAllocator {
        &self.ranges
    }

    #[inline]
    fn fit(&mut self) {
        let end = self.ranges.end() as usize;
        if self.array.len() < end {
            self.array.resize(end);
        }
    }

    /// Reserves a new range of `length` slots.
    pub fn allocate(&mut self, length: u32) -> Range {
        let range = self.ranges.allocate(length);
        self.fit();
        range
    }

    /// Resizes `range` to `length`, keeping its first `live` values.
    ///
    /// The range is extended in place when the slots behind it are free,
    /// otherwise the live values move to a new range. Either way the returned
    /// range replaces `range`, which must not be used again.
    pub fn resize(&mut self, range: Range, live: u32, length: u32) -> Range {
        debug_assert!(live <= range.length && live <= length);

        if length <= range.length {
            let tail = Range::new(range.start + length, range.length - length);
            self.release(tail);
            return Range::new(range.start, length);
        }

        if self.ranges.try_extend(range, length) {
            self.fit();
            return Range::new(range.start, length);
        }

        let moved = self.ranges.allocate(length);
        self.fit();
        self.array
            .move_values(range.start as usize, moved.start as usize, live as usize);
        self.release(range);
        moved
    }

    /// Drops every value in `range` and returns it to the allocator.
    pub fn release(&mut self, range: Range) {
        if range.is_empty() {
            return;
        }
        self.array.reset(range.start as usize, range.length as usize);
        self.ranges.release(range);
    }

    /// Moves one value, leaving a default behind.
    #[inline]
    pub fn move_value(&mut self, src: usize, dst: usize) {
        self.array.move_values(src, dst, 1);
    }

    #[inline]
    pub fn reset(&mut self, index: usize) {
        self.array.reset(index, 1);
    }

    /// Shifts a sparse page's values to open the slot described by an
    /// insertion. `base` is the start of the sparse column's range.
    pub fn apply_insert(&mut self, base: u32, mutation: DataMutation) {
        let old = (base + mutation.old_offset) as usize;
        let new = (base + mutation.new_offset) as usize;
        let index = mutation.index as usize;
        let after = (mutation.count - mutation.index) as usize;

        if mutation.relocated() {
            self.array.move_values(old, new, index);
            self.array.move_values(old + index, new + index + 1, after);
        } else {
            self.array.move_values(old + index, old + index + 1, after);
        }
    }

    /// Drops the value removed by `mutation` and closes the gap.
    pub fn apply_remove(&mut self, base: u32, mutation: DataMutation) {
        let block = (base + mutation.new_offset) as usize;
        let index = mutation.index as usize;
        let after = (mutation.count - mutation.index - 1) as usize;

        self.array.reset(block + index, 1);
        self.array.move_values(block + index + 1, block + index, after);
    }

    #[inline]
    pub fn clone_boxed(&self, index: usize) -> BoxedValue {
        self.array.clone_boxed(index)
    }

    #[inline]
    pub fn take_boxed(&mut self, index: usize) -> BoxedValue {
        self.array.take_boxed(index)
    }

    #[inline]
    pub fn put_boxed(&mut self, index: usize, value: BoxedValue) {
        self.array.put_boxed(index, value);
    }

    /// The backing array as `T`.
    ///
    /// # Panics
    ///
    /// Panics if the column does not store `T`.
    #[inline]
    pub fn typed<T: Component>(&self) -> &TypedArray<T> {
        let any: &dyn Any = &*self.array;
        match any.downcast_ref::<TypedArray<T>>() {
            Some(typed) => typed,
            None => type_mismatch(self.info.name()),
        }
    }

    /// The backing array as `T`.
    ///
    /// # Panics
    ///
    /// Panics if the column does not store `T`.
    #[inline]
    pub fn typed_mut<T: Component>(&mut self) -> &mut TypedArray<T> {
        let name = self.info.name();
        let any: &mut dyn Any = &mut *self.array;
        match any.downcast_mut::<TypedArray<T>>() {
            Some(typed) => typed,
            None => type_mismatch(name),
        }
    }

    #[inline]
    pub fn get<T: Component>(&self, index: usize) -> &T {
        &self.typed::<T>().as_slice()[index]
    }

    #[inline]
    pub fn get_mut<T: Component>(&mut self, index: usize) -> &mut T {
        &mut self.typed_mut::<T>().as_mut_slice()[index]
    }

    #[inline]
    pub fn slice<T: Component>(&self, range: Range) -> &[T] {
        &self.typed::<T>().as_slice()[range.as_usize()]
    }

    #[inline]
    pub fn slice_mut<T: Component>(&mut self, range: Range) -> &mut [T] {
        &mut self.typed_mut::<T>().as_mut_slice()[range.as_usize()]
    }
}

impl Debug for ColumnData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ColumnData")
            .field("component", &self.info.name())
            .field("len", &self.array.len())
            .field("ranges", &self.ranges)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// ColumnStorage

/// Every [`ColumnData`], indexed by component id.
///
/// Dense and sparse ids are numbered independently, so they index two
/// separate tables. Columns are created the first time an archetype needs
/// them and live as long as the storage.
#[derive(Default)]
pub struct ColumnStorage {
    dense: Vec<Option<ColumnData>>,
    sparse: Vec<Option<ColumnData>>,
}

impl ColumnStorage {
    pub const fn new() -> Self {
        Self {
            dense: Vec::new(),
            sparse: Vec::new(),
        }
    }

    #[inline]
    fn table(&self, id: ComponentId) -> &Vec<Option<ColumnData>> {
        if id.is_sparse() { &self.sparse } else { &self.dense }
    }

    #[inline]
    fn table_mut(&mut self, id: ComponentId) -> &mut Vec<Option<ColumnData>> {
        if id.is_sparse() {
            &mut self.sparse
        } else {
            &mut self.dense
        }
    }

    /// Returns the column of `info`, creating it on first use.
    pub fn require_column(&mut self, info: &ComponentInfo) -> &mut ColumnData {
        let index = info.id().index();
        let table = self.table_mut(info.id());
        if index >= table.len() {
            table.resize_with(index + 1, || None);
        }
        table[index].get_or_insert_with(|| ColumnData::new(*info))
    }

    #[inline]
    pub fn column(&self, id: ComponentId) -> Option<&ColumnData> {
        self.table(id).get(id.index())?.as_ref()
    }

    #[inline]
    pub fn column_mut(&mut self, id: ComponentId) -> Option<&mut ColumnData> {
        self.table_mut(id).get_mut(id.index())?.as_mut()
    }

    /// The column of `id`, which an archetype is known to use.
    #[inline]
    pub(crate) fn expect(&self, id: ComponentId) -> &ColumnData {
        match self.column(id) {
            Some(column) => column,
            None => missing_column(id),
        }
    }

    /// The column of `id`, which an archetype is known to use.
    #[inline]
    pub(crate) fn expect_mut(&mut self, id: ComponentId) -> &mut ColumnData {
        match self.column_mut(id) {
            Some(column) => column,
            None => missing_column(id),
        }
    }

    /// Takes a column out for the duration of an iteration.
    pub(crate) fn checkout(&mut self, id: ComponentId) -> Option<ColumnData> {
        self.table_mut(id).get_mut(id.index())?.take()
    }

    /// Puts back a column taken by [`checkout`](Self::checkout).
    pub(crate) fn restore(&mut self, column: ColumnData) {
        let id = column.id();
        let table = self.table_mut(id);
        debug_assert!(table[id.index()].is_none());
        table[id.index()] = Some(column);
    }

    /// Number of columns created so far.
    pub fn len(&self) -> usize {
        self.dense.iter().chain(&self.sparse).flatten().count()
    }
}

#[cold]
#[inline(never)]
fn missing_column(id: ComponentId) -> ! {
    panic!("no column for {id:?}; it is missing or checked out by an iteration");
}

impl Debug for ColumnStorage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.dense.iter().chain(&self.sparse).flatten())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::ColumnStorage;
    use crate::component::{Component, TypeRegistry};
    use crate::storage::Range;

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Health(u32);
    impl Component for Health {}

    #[test]
    fn ranges_are_independent() {
        let registry = TypeRegistry::new();
        let id = registry.require::<Health>();
        let mut storage = ColumnStorage::new();
        let column = storage.require_column(&registry.info(id).unwrap());

        let a = column.allocate(4);
        let b = column.allocate(4);
        for i in 0..4 {
            *column.get_mut::<Health>(a.at(i)) = Health(i as u32);
            *column.get_mut::<Health>(b.at(i)) = Health(100 + i as u32);
        }

        // `a` is blocked by `b` and must move
        let a2 = column.resize(a, 4, 16);
        assert_ne!(a2.start, a.start);
        assert_eq!(a2.length, 16);
        let values = column.slice::<Health>(Range::new(a2.start, 4));
        assert_eq!(values, [Health(0), Health(1), Health(2), Health(3)]);
        assert_eq!(column.slice::<Health>(b)[3], Health(103));

        // the old slots were reset and are reused first
        let c = column.allocate(2);
        assert_eq!(c.start, a.start);
        assert_eq!(column.slice::<Health>(c), [Health(0), Health(0)]);

        assert_eq!(storage.len(), 1);
        assert!(storage.checkout(id).is_some());
        assert!(storage.column(id).is_none());
    }

    #[test]
    fn grows_in_place_at_the_end() {
        let registry = TypeRegistry::new();
        let id = registry.require::<Health>();
        let mut storage = ColumnStorage::new();
        let column = storage.require_column(&registry.info(id).unwrap());
        let a = column.allocate(8);
        *column.get_mut::<Health>(a.at(7)) = Health(7);
        let grown = column.resize(a, 8, 32);
        assert_eq!(grown, Range::new(a.start, 32));
        assert_eq!(column.get::<Health>(grown.at(7)), &Health(7));
        assert!(column.array().len() >= 32);
    }
}
