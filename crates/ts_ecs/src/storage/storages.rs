use core::fmt::Debug;

use super::ColumnStorage;
use crate::revision::RevisionStorage;

// -----------------------------------------------------------------------------
// Storages

/// Component data and change logs of one manager.
///
/// Archetypes own ranges in both and receive this by reference whenever a
/// row operation touches column data.
#[derive(Default)]
pub struct Storages {
    pub columns: ColumnStorage,
    pub revisions: RevisionStorage,
}

impl Storages {
    pub const fn new() -> Self {
        Self {
            columns: ColumnStorage::new(),
            revisions: RevisionStorage::new(),
        }
    }
}

impl Debug for Storages {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Storages")
            .field("columns", &self.columns.len())
            .field("revisions", &self.revisions.len())
            .finish()
    }
}
