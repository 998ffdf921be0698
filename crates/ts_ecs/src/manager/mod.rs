//! The entity manager.
//!
//! [`EntityManager`] owns every entity, archetype, column and query of one
//! stage. It is driven from a single thread: structural edits take
//! `&mut self`, so they cannot overlap an iteration. Edits discovered while
//! iterating go through a [`EntityCommandBuffer`](crate::command::EntityCommandBuffer).

// -----------------------------------------------------------------------------
// Modules

mod config;
mod impls;
mod listener;
mod methods;

// -----------------------------------------------------------------------------
// Exports

pub use config::StageConfig;
pub use impls::EntityManager;
pub use listener::{EntityListener, ListenerId};

pub(crate) use listener::Listeners;
