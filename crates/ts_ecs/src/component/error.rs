use thiserror::Error;

use crate::entity::Entity;
use crate::utils::DebugName;

// -----------------------------------------------------------------------------
// ComponentError

#[derive(Debug, Error, Clone, Copy)]
#[non_exhaustive]
pub enum ComponentError {
    #[error("Entity {entity} does not have component {name}")]
    Missing { entity: Entity, name: DebugName },

    #[error("Entity {entity} already has component {name}")]
    AlreadyPresent { entity: Entity, name: DebugName },
}

impl ComponentError {
    #[cold]
    #[inline(never)]
    pub fn handle_error(&self) -> ! {
        panic!("{self}");
    }
}
