//! Deferred structural edits.
//!
//! An [`EntityCommandBuffer`] records component additions, removals and
//! entity lifetimes, then applies them in one pass. Values wait in
//! per-type [`Staging`] arrays created through the component vtable.

mod buffer;
mod staging;

pub use buffer::{CommitResult, EntityCommandBuffer};
pub use staging::{ErasedStaging, Staging, new_staging};

pub(crate) use staging::typed_staging;
