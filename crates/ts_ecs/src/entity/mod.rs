//! Entity handles and the address table.

// -----------------------------------------------------------------------------
// Modules

mod error;
mod ident;
mod storage;

// -----------------------------------------------------------------------------
// Exports

pub use error::EntityError;
pub use ident::Entity;
pub use storage::{EntityAddress, EntityStorage};
