use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;

use crate::component::Component;
use crate::entity::{Entity, EntityError};
use crate::manager::EntityManager;
use crate::storage::BoxedValue;
use crate::utils::DebugName;

// -----------------------------------------------------------------------------
// ErasedStaging

/// Values of one component type buffered by a command buffer, one slot per
/// buffered entity.
pub trait ErasedStaging: Any + Send + Sync {
    /// Drops every staged value.
    fn clear(&mut self);

    fn contains(&self, slot: usize) -> bool;

    /// Stages a boxed value, replacing the one in `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `value` holds another type.
    fn insert_boxed(&mut self, slot: usize, value: BoxedValue);

    /// Writes the value staged in `slot`, if any, to `entity`.
    fn apply(
        &mut self,
        slot: usize,
        entity: Entity,
        manager: &mut EntityManager,
    ) -> Result<(), EntityError>;

    /// Drops the value staged in `slot`.
    fn discard(&mut self, slot: usize);
}

// -----------------------------------------------------------------------------
// Staging

/// The only implementation of [`ErasedStaging`].
pub struct Staging<T>(Vec<Option<T>>);

/// Creates an empty staging array for `T`. Stored in the component vtable.
pub fn new_staging<T: Component>() -> Box<dyn ErasedStaging> {
    Box::new(Staging::<T>(Vec::new()))
}

impl<T: Component> Staging<T> {
    pub fn insert(&mut self, slot: usize, value: T) {
        if slot >= self.0.len() {
            self.0.resize_with(slot + 1, || None);
        }
        self.0[slot] = Some(value);
    }

    #[inline]
    pub fn get(&self, slot: usize) -> Option<&T> {
        self.0.get(slot)?.as_ref()
    }
}

impl<T: Component> ErasedStaging for Staging<T> {
    fn clear(&mut self) {
        self.0.clear();
    }

    #[inline]
    fn contains(&self, slot: usize) -> bool {
        self.get(slot).is_some()
    }

    fn insert_boxed(&mut self, slot: usize, value: BoxedValue) {
        match value.downcast::<T>() {
            Ok(value) => self.insert(slot, *value),
            Err(_) => staging_mismatch(DebugName::type_name::<T>()),
        }
    }

    fn apply(
        &mut self,
        slot: usize,
        entity: Entity,
        manager: &mut EntityManager,
    ) -> Result<(), EntityError> {
        match self.0.get_mut(slot).and_then(Option::take) {
            Some(value) => manager.write_component(entity, value),
            None => Ok(()),
        }
    }

    fn discard(&mut self, slot: usize) {
        if let Some(value) = self.0.get_mut(slot) {
            *value = None;
        }
    }
}

/// Downcasts type-erased staging to `T`.
pub(crate) fn typed_staging<'a, T: Component>(
    staging: &'a mut (dyn ErasedStaging + 'static),
) -> &'a mut Staging<T> {
    let any: &mut dyn Any = staging;
    match any.downcast_mut::<Staging<T>>() {
        Some(typed) => typed,
        None => staging_mismatch(DebugName::type_name::<T>()),
    }
}

#[cold]
#[inline(never)]
fn staging_mismatch(expected: DebugName) -> ! {
    panic!("staged value type does not match {expected}");
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;

    use super::{ErasedStaging, new_staging, typed_staging};
    use crate::component::Component;

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Hp(u32);
    impl Component for Hp {}

    #[test]
    fn slots_replace_and_discard() {
        let mut staging = new_staging::<Hp>();
        typed_staging::<Hp>(&mut *staging).insert(3, Hp(1));
        staging.insert_boxed(3, Box::new(Hp(2)));
        assert!(staging.contains(3));
        assert!(!staging.contains(0));
        assert_eq!(typed_staging::<Hp>(&mut *staging).get(3), Some(&Hp(2)));

        staging.discard(3);
        assert!(!staging.contains(3));
        staging.discard(10);
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn wrong_boxed_type() {
        let mut staging = new_staging::<Hp>();
        staging.insert_boxed(0, Box::new(5_u8));
    }

    #[test]
    fn erased_staging_is_object_safe() {
        let staging: Box<dyn ErasedStaging> = new_staging::<Hp>();
        assert!(!staging.contains(0));
    }
}
