use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;
use core::mem;

use crate::component::Component;
use crate::utils::DebugName;

/// A boxed component value crossing a type-erased boundary.
pub type BoxedValue = Box<dyn Any + Send + Sync>;

// -----------------------------------------------------------------------------
// ErasedArray

/// The per-type array behind a [`ColumnData`](super::ColumnData).
///
/// Slots that hold no live value contain `T::default()`. Moves leave a
/// default behind, so resources held by a moved-out value are never dropped
/// twice or leaked.
pub trait ErasedArray: Any + Send + Sync {
    fn len(&self) -> usize;

    /// Grows or shrinks to `len` slots; new slots are default-constructed.
    fn resize(&mut self, len: usize);

    /// Moves `count` values from `src..` to `dst..`. The ranges may overlap.
    fn move_values(&mut self, src: usize, dst: usize, count: usize);

    /// Drops the values in `start..start + count`, resetting them to default.
    fn reset(&mut self, start: usize, count: usize);

    /// Clones the value at `index` into a box.
    fn clone_boxed(&self, index: usize) -> BoxedValue;

    /// Moves the value at `index` into a box, leaving a default behind.
    fn take_boxed(&mut self, index: usize) -> BoxedValue;

    /// Writes a boxed value produced by an array of the same type.
    ///
    /// # Panics
    ///
    /// Panics if `value` holds another type.
    fn put_boxed(&mut self, index: usize, value: BoxedValue);

    fn element_name(&self) -> DebugName;
}

// -----------------------------------------------------------------------------
// TypedArray

/// The only implementation of [`ErasedArray`].
pub struct TypedArray<T>(pub(crate) Vec<T>);

/// Creates an empty array for `T`. Stored in the component vtable.
pub fn new_array<T: Component>() -> Box<dyn ErasedArray> {
    Box::new(TypedArray::<T>(Vec::new()))
}

impl<T: Component> TypedArray<T> {
    #[inline(always)]
    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.0
    }
}

impl<T: Component> ErasedArray for TypedArray<T> {
    #[inline]
    fn len(&self) -> usize {
        self.0.len()
    }

    fn resize(&mut self, len: usize) {
        self.0.resize_with(len, T::default);
    }

    fn move_values(&mut self, src: usize, dst: usize, count: usize) {
        if src == dst || count == 0 {
            return;
        }
        let data = &mut self.0;
        if dst < src {
            for i in 0..count {
                data[dst + i] = mem::take(&mut data[src + i]);
            }
        } else {
            for i in (0..count).rev() {
                data[dst + i] = mem::take(&mut data[src + i]);
            }
        }
    }

    fn reset(&mut self, start: usize, count: usize) {
        self.0[start..start + count].fill_with(T::default);
    }

    fn clone_boxed(&self, index: usize) -> BoxedValue {
        Box::new(self.0[index].clone())
    }

    fn take_boxed(&mut self, index: usize) -> BoxedValue {
        Box::new(mem::take(&mut self.0[index]))
    }

    fn put_boxed(&mut self, index: usize, value: BoxedValue) {
        match value.downcast::<T>() {
            Ok(value) => self.0[index] = *value,
            Err(_) => type_mismatch(DebugName::type_name::<T>()),
        }
    }

    fn element_name(&self) -> DebugName {
        DebugName::type_name::<T>()
    }
}

#[cold]
#[inline(never)]
pub(crate) fn type_mismatch(expected: DebugName) -> ! {
    panic!("value type does not match the column of {expected}");
}
