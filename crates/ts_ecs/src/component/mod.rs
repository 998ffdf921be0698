// -----------------------------------------------------------------------------
// Modules

mod error;
mod ident;
mod impls;
mod info;
mod registry;
mod storage;

// -----------------------------------------------------------------------------
// Exports

pub use error::ComponentError;
pub use ident::{ComponentId, TypeCategory};
pub use impls::{Component, Name};
pub use info::{ComponentDescriptor, ComponentInfo};
pub use registry::TypeRegistry;
pub use storage::{ComponentFlags, ComponentStorage};
