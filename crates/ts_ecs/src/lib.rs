#![cfg_attr(docsrs, feature(doc_cfg))]

//! Archetype based entity storage.
//!
//! Entities live in [`Archetype`](archetype::Archetype)s, one per distinct set of
//! dense components. Every archetype slices shared per-type arrays from
//! [`ColumnStorage`](storage::ColumnStorage), optional data goes through
//! page-compacted sparse columns, and every column keeps an epoch log that
//! change monitors read from.
//!
//! [`EntityManager`](manager::EntityManager) is the entry point. Structural edits
//! discovered while iterating a query go through an
//! [`EntityCommandBuffer`](command::EntityCommandBuffer).

// -----------------------------------------------------------------------------
// Compilation config

/// Compilation control.
pub mod cfg {
    /// `true` when runtime consistency checks are compiled in.
    ///
    /// Enabled by `debug_assertions` or the `debug` feature. Release builds
    /// without the feature skip the checks and lose component names in errors.
    pub const DEBUG: bool = cfg!(any(debug_assertions, feature = "debug"));
}

// -----------------------------------------------------------------------------
// no_std paths

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

pub mod error;
pub mod utils;

pub mod bitfield;
pub mod component;
pub mod storage;

pub mod revision;

pub mod archetype;
pub mod entity;

pub mod query;

pub mod manager;

pub mod command;
pub mod prefab;

// -----------------------------------------------------------------------------
// Prelude

pub mod prelude {
    pub use crate::command::{CommitResult, EntityCommandBuffer};
    pub use crate::component::{Component, ComponentId, ComponentStorage, Name, TypeRegistry};
    pub use crate::entity::Entity;
    pub use crate::error::EcsError;
    pub use crate::manager::{EntityListener, EntityManager, StageConfig};
    pub use crate::prefab::{EntityPrefab, PrefabRegistry};
    pub use crate::query::QueryId;
    pub use crate::revision::{ColumnEvent, RevisionMonitor};
}
