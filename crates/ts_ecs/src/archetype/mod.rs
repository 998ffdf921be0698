//! Archetypes: entities grouped by their set of dense components.
//!
//! An archetype stores its rows compacted in `0..len`. Dense columns are
//! ordered by ascending component id, so the column of a component is the
//! rank of its bit in the archetype's type mask. Sparse columns are added
//! lazily the first time a row of the archetype receives the component.

// -----------------------------------------------------------------------------
// Modules

mod arches;
mod ident;
mod info;

// -----------------------------------------------------------------------------
// Exports

pub use arches::Archetypes;
pub use ident::ArchetypeId;
pub use info::Archetype;

pub(crate) use info::{DenseColumn, SparseColumn};
