use alloc::vec::Vec;
use core::marker::PhantomData;

use crate::archetype::Archetype;
use crate::component::{Component, ComponentId, TypeRegistry};
use crate::storage::{ColumnData, ColumnStorage, SparseColumnStorage};
use crate::utils::DebugName;

// -----------------------------------------------------------------------------
// Access

/// One component a [`QueryData`] reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub id: ComponentId,
    pub write: bool,
    pub name: DebugName,
}

// -----------------------------------------------------------------------------
// QueryData

/// Data fetched per row while iterating a query.
///
/// Implemented for `&T`, `&mut T` and tuples of those. Iteration happens in
/// three steps:
///
/// 1. [`checkout`](Self::checkout) takes the accessed columns out of the
///    [`ColumnStorage`] into a `Guard`, which is what makes handing out
///    `&mut T` for many rows possible without aliasing the storage.
/// 2. Per matched archetype, [`locate`](Self::locate) slices the guard down
///    to that archetype's ranges, and [`fetch`](Self::fetch) yields one row.
/// 3. [`restore`](Self::restore) puts the columns back.
///
/// Every accessed component must be required by the query; see
/// [`Access`].
pub trait QueryData {
    /// The columns held for the whole iteration.
    type Guard;
    /// The columns sliced down to one archetype.
    type Locator<'a>;
    /// What the callback receives for one row.
    type Item<'a>;

    /// Appends the components this data touches to `out`.
    fn access(registry: &TypeRegistry, out: &mut Vec<Access>);

    fn checkout(registry: &TypeRegistry, columns: &mut ColumnStorage) -> Self::Guard;

    fn restore(guard: Self::Guard, columns: &mut ColumnStorage);

    fn locate<'a>(guard: &'a mut Self::Guard, arche: &'a Archetype) -> Self::Locator<'a>;

    fn fetch<'b, 'a: 'b>(locator: &'b mut Self::Locator<'a>, row: usize) -> Self::Item<'b>;
}

// -----------------------------------------------------------------------------
// Locators

/// Shared view of one archetype's values of `T`.
pub enum ColumnLocator<'a, T> {
    /// Indexed by row.
    Dense(&'a [T]),
    /// Indexed by the compacted slot of a row.
    Sparse {
        storage: &'a SparseColumnStorage,
        data: &'a [T],
    },
}

impl<'a, T> ColumnLocator<'a, T> {
    #[inline]
    pub fn get(&self, row: usize) -> Option<&'a T> {
        match *self {
            Self::Dense(data) => data.get(row),
            Self::Sparse { storage, data } => data.get(storage.get_index(row)? as usize),
        }
    }
}

/// Exclusive view of one archetype's values of `T`.
pub enum ColumnLocatorMut<'a, T> {
    /// Indexed by row.
    Dense(&'a mut [T]),
    /// Indexed by the compacted slot of a row.
    Sparse {
        storage: &'a SparseColumnStorage,
        data: &'a mut [T],
    },
}

impl<T> ColumnLocatorMut<'_, T> {
    #[inline]
    pub fn get_mut(&mut self, row: usize) -> Option<&mut T> {
        match self {
            Self::Dense(data) => data.get_mut(row),
            Self::Sparse { storage, data } => data.get_mut(storage.get_index(row)? as usize),
        }
    }
}

/// The slice of `column` owned by `arche`, and the sparse map for sparse
/// components.
fn archetype_slice<'a, T: Component>(
    column: &'a ColumnData,
    arche: &'a Archetype,
) -> (&'a [T], Option<&'a SparseColumnStorage>) {
    let id = column.id();
    if let Some(index) = arche.column_index(id) {
        let range = arche.dense[index].range;
        return (column.slice::<T>(range), None);
    }
    match arche.sparse_index(id) {
        Some(index) => {
            let sparse = &arche.sparse[index];
            (column.slice::<T>(sparse.range), Some(&sparse.storage))
        }
        None => missing_in_archetype(column.info().name(), arche),
    }
}

fn archetype_slice_mut<'a, T: Component>(
    column: &'a mut ColumnData,
    arche: &'a Archetype,
) -> (&'a mut [T], Option<&'a SparseColumnStorage>) {
    let id = column.id();
    if let Some(index) = arche.column_index(id) {
        let range = arche.dense[index].range;
        return (column.slice_mut::<T>(range), None);
    }
    match arche.sparse_index(id) {
        Some(index) => {
            let sparse = &arche.sparse[index];
            (column.slice_mut::<T>(sparse.range), Some(&sparse.storage))
        }
        None => missing_in_archetype(column.info().name(), arche),
    }
}

// -----------------------------------------------------------------------------
// Impls

impl<T: Component> QueryData for &T {
    type Guard = Option<ColumnData>;
    type Locator<'a> = ColumnLocator<'a, T>;
    type Item<'a> = &'a T;

    fn access(registry: &TypeRegistry, out: &mut Vec<Access>) {
        out.push(Access {
            id: registry.require::<T>(),
            write: false,
            name: DebugName::type_name::<T>(),
        });
    }

    #[inline]
    fn checkout(registry: &TypeRegistry, columns: &mut ColumnStorage) -> Self::Guard {
        columns.checkout(registry.require::<T>())
    }

    #[inline]
    fn restore(guard: Self::Guard, columns: &mut ColumnStorage) {
        if let Some(column) = guard {
            columns.restore(column);
        }
    }

    fn locate<'a>(guard: &'a mut Self::Guard, arche: &'a Archetype) -> Self::Locator<'a> {
        let Some(column) = guard.as_ref() else {
            missing_column(DebugName::type_name::<T>());
        };
        match archetype_slice::<T>(column, arche) {
            (data, None) => ColumnLocator::Dense(data),
            (data, Some(storage)) => ColumnLocator::Sparse { storage, data },
        }
    }

    #[inline]
    fn fetch<'b, 'a: 'b>(locator: &'b mut Self::Locator<'a>, row: usize) -> Self::Item<'b> {
        match locator.get(row) {
            Some(value) => value,
            None => missing_row(DebugName::type_name::<T>(), row),
        }
    }
}

impl<T: Component> QueryData for &mut T {
    type Guard = Option<ColumnData>;
    type Locator<'a> = ColumnLocatorMut<'a, T>;
    type Item<'a> = &'a mut T;

    fn access(registry: &TypeRegistry, out: &mut Vec<Access>) {
        out.push(Access {
            id: registry.require::<T>(),
            write: true,
            name: DebugName::type_name::<T>(),
        });
    }

    #[inline]
    fn checkout(registry: &TypeRegistry, columns: &mut ColumnStorage) -> Self::Guard {
        columns.checkout(registry.require::<T>())
    }

    #[inline]
    fn restore(guard: Self::Guard, columns: &mut ColumnStorage) {
        if let Some(column) = guard {
            columns.restore(column);
        }
    }

    fn locate<'a>(guard: &'a mut Self::Guard, arche: &'a Archetype) -> Self::Locator<'a> {
        let Some(column) = guard.as_mut() else {
            missing_column(DebugName::type_name::<T>());
        };
        match archetype_slice_mut::<T>(column, arche) {
            (data, None) => ColumnLocatorMut::Dense(data),
            (data, Some(storage)) => ColumnLocatorMut::Sparse { storage, data },
        }
    }

    #[inline]
    fn fetch<'b, 'a: 'b>(locator: &'b mut Self::Locator<'a>, row: usize) -> Self::Item<'b> {
        match locator.get_mut(row) {
            Some(value) => value,
            None => missing_row(DebugName::type_name::<T>(), row),
        }
    }
}

macro_rules! impl_query_data_tuple {
    ($($name:ident : $index:tt),+) => {
        impl<$($name: QueryData),+> QueryData for ($($name,)+) {
            type Guard = ($($name::Guard,)+);
            type Locator<'a> = ($($name::Locator<'a>,)+);
            type Item<'a> = ($($name::Item<'a>,)+);

            fn access(registry: &TypeRegistry, out: &mut Vec<Access>) {
                $($name::access(registry, out);)+
            }

            fn checkout(registry: &TypeRegistry, columns: &mut ColumnStorage) -> Self::Guard {
                ($($name::checkout(registry, columns),)+)
            }

            fn restore(guard: Self::Guard, columns: &mut ColumnStorage) {
                $($name::restore(guard.$index, columns);)+
            }

            fn locate<'a>(guard: &'a mut Self::Guard, arche: &'a Archetype) -> Self::Locator<'a> {
                ($($name::locate(&mut guard.$index, arche),)+)
            }

            #[inline]
            fn fetch<'b, 'a: 'b>(locator: &'b mut Self::Locator<'a>, row: usize) -> Self::Item<'b> {
                ($($name::fetch(&mut locator.$index, row),)+)
            }
        }
    };
}

impl_query_data_tuple!(A: 0);
impl_query_data_tuple!(A: 0, B: 1);
impl_query_data_tuple!(A: 0, B: 1, C: 2);
impl_query_data_tuple!(A: 0, B: 1, C: 2, D: 3);
impl_query_data_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_query_data_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_query_data_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_query_data_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

// -----------------------------------------------------------------------------
// ColumnCheckout

/// Columns of `D` taken out of a [`ColumnStorage`]; put back on drop, so a
/// panicking callback leaves the storage whole.
pub(crate) struct ColumnCheckout<'s, D: QueryData> {
    guard: Option<D::Guard>,
    columns: &'s mut ColumnStorage,
    _marker: PhantomData<fn() -> D>,
}

impl<'s, D: QueryData> ColumnCheckout<'s, D> {
    pub(crate) fn new(registry: &TypeRegistry, columns: &'s mut ColumnStorage) -> Self {
        let guard = D::checkout(registry, columns);
        Self {
            guard: Some(guard),
            columns,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn locate<'a>(&'a mut self, arche: &'a Archetype) -> D::Locator<'a> {
        match self.guard.as_mut() {
            Some(guard) => D::locate(guard, arche),
            None => unreachable!("columns are only restored on drop"),
        }
    }
}

impl<D: QueryData> Drop for ColumnCheckout<'_, D> {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            D::restore(guard, self.columns);
        }
    }
}

#[cold]
#[inline(never)]
fn missing_column(name: DebugName) -> ! {
    panic!("no column of {name} was checked out for this iteration");
}

#[cold]
#[inline(never)]
fn missing_in_archetype(name: DebugName, arche: &Archetype) -> ! {
    panic!("archetype {} has no column of {name}", arche.id());
}

#[cold]
#[inline(never)]
fn missing_row(name: DebugName, row: usize) -> ! {
    panic!("row {row} holds no {name} value");
}
