//! Shared component storage.
//!
//! Every component type owns one [`ColumnData`]: a type-erased array plus a
//! free-range allocator. Archetypes hold [`Range`]s into it, one per column,
//! and must always adopt the range returned by a resize.
//!
//! Sparse columns additionally keep a [`SparseColumnStorage`] mapping logical
//! rows to compacted slots inside their range.

// -----------------------------------------------------------------------------
// Modules

mod array;
mod column;
mod range;
mod sparse;
mod storages;

// -----------------------------------------------------------------------------
// Exports

pub use array::{BoxedValue, ErasedArray, TypedArray, new_array};
pub use column::{ColumnData, ColumnStorage};
pub use range::{Range, RangeAllocator};
pub use sparse::{DataMutation, PAGE_ROWS, SparseColumnStorage, SparseRows};
pub use storages::Storages;
