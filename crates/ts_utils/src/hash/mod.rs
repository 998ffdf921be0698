//! Hash containers used across the workspace, built on *hashbrown* and *foldhash*.
//!
//! All containers default to [`FixedHashState`], so hashing is deterministic
//! between runs. Keys that already are well-distributed integers can use
//! [`NoOpHashState`] instead.

// -----------------------------------------------------------------------------
// Modules

mod hasher;

// -----------------------------------------------------------------------------
// Exports

pub use hasher::{FixedHashState, FixedHasher};
pub use hasher::{NoOpHashState, NoOpHasher};

/// A [`hashbrown::HashMap`] using [`FixedHashState`] by default.
pub type HashMap<K, V, S = FixedHashState> = hashbrown::HashMap<K, V, S>;

/// A [`hashbrown::HashSet`] using [`FixedHashState`] by default.
pub type HashSet<K, S = FixedHashState> = hashbrown::HashSet<K, S>;

/// A [`HashMap`] whose keys are hashed by value, see [`NoOpHashState`].
pub type NoOpHashMap<K, V> = hashbrown::HashMap<K, V, NoOpHashState>;

pub use hashbrown::HashTable;
pub use hashbrown::hash_map::Entry;
pub use hashbrown::hash_table::Entry as TableEntry;

// -----------------------------------------------------------------------------
// Re-export crates

pub use foldhash;
pub use hashbrown;
