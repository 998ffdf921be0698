//! The crate-wide error type.

use thiserror::Error;

use crate::component::ComponentError;
use crate::entity::EntityError;
use crate::prefab::PrefabKey;
use crate::query::QueryError;

// -----------------------------------------------------------------------------
// EcsError

/// Any error returned by a fallible [`EntityManager`] operation.
///
/// [`EntityManager`]: crate::manager::EntityManager
#[derive(Debug, Error, Clone, Copy)]
#[non_exhaustive]
pub enum EcsError {
    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Command buffer or prefab registry was built on another TypeRegistry")]
    RegistryMismatch,

    #[error("Prefab {0:?} does not exist")]
    UnknownPrefab(PrefabKey),
}

impl EcsError {
    #[cold]
    #[inline(never)]
    pub fn handle_error(&self) -> ! {
        panic!("{self}");
    }
}
