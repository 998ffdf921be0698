use thiserror::Error;

use crate::entity::Entity;

// -----------------------------------------------------------------------------
// EntityError

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum EntityError {
    #[error("The null entity does not refer to any entity")]
    Null,

    #[error("Entity with index {0} was not found")]
    NotFound(u32),

    #[error("Stale entity handle: expected {expect}, found {actual}")]
    Stale { expect: Entity, actual: Entity },

    #[error("Entity {0} is deferred and exists only inside its command buffer")]
    Deferred(Entity),
}

impl EntityError {
    #[cold]
    #[inline(never)]
    pub fn handle_error(&self) -> ! {
        panic!("{self}");
    }
}
