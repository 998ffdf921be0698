#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

//! Small shared helpers for the tessera crates: fixed-seed hash containers
//! and a [`TypeId`](core::any::TypeId) keyed map.

// -----------------------------------------------------------------------------
// No STD Support

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod default;
mod typeid_map;

pub mod hash;

// -----------------------------------------------------------------------------
// Top-level exports

pub use default::default;
pub use typeid_map::TypeIdMap;
