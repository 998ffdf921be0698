use alloc::vec::Vec;

use super::{ColumnRevision, RevisionStorage};
use crate::archetype::ArchetypeId;
use crate::component::ComponentId;
use crate::query::QueryId;

// -----------------------------------------------------------------------------
// ColumnEvent

/// A change reported by a monitor, addressed by logical row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnEvent {
    Created(usize),
    Modified(usize),
    Destroyed(usize),
}

impl ColumnEvent {
    #[inline]
    pub const fn row(self) -> usize {
        match self {
            Self::Created(row) | Self::Modified(row) | Self::Destroyed(row) => row,
        }
    }
}

// -----------------------------------------------------------------------------
// RevisionMonitor

/// Reader cursor over the change log of one archetype column.
///
/// A fresh monitor has not synchronized yet; its first poll reports every
/// live row as [`ColumnEvent::Created`]. Afterwards each poll reports what
/// changed since the previous one, then retains the current revision.
#[derive(Debug, PartialEq, Eq)]
pub struct RevisionMonitor {
    pub(crate) archetype: ArchetypeId,
    pub(crate) column: ComponentId,
    pub(crate) seen: Option<u32>,
}

impl RevisionMonitor {
    pub(crate) const fn new(archetype: ArchetypeId, column: ComponentId) -> Self {
        Self {
            archetype,
            column,
            seen: None,
        }
    }

    #[inline]
    pub const fn archetype(&self) -> ArchetypeId {
        self.archetype
    }

    #[inline]
    pub const fn column(&self) -> ComponentId {
        self.column
    }

    /// The revision this monitor last synchronized with.
    #[inline]
    pub const fn seen(&self) -> Option<u32> {
        self.seen
    }

    /// Reports changes since the last sync, then re-synchronizes.
    ///
    /// Within an epoch rows are reported destroyed first, then created, then
    /// modified; epochs are visited oldest first.
    pub(crate) fn sync(
        &mut self,
        revision: &mut ColumnRevision,
        storage: &mut RevisionStorage,
        live: impl Iterator<Item = usize>,
        mut f: impl FnMut(ColumnEvent),
    ) {
        match self.seen {
            None => live.for_each(|row| f(ColumnEvent::Created(row))),
            Some(seen) => {
                for epoch in revision.epochs_since(storage, seen) {
                    epoch.destroyed().for_each(|row| f(ColumnEvent::Destroyed(row)));
                    epoch.created().for_each(|row| f(ColumnEvent::Created(row)));
                    epoch.changes().for_each(|row| f(ColumnEvent::Modified(row)));
                }
                revision.dereference(storage, seen);
            }
        }
        self.seen = Some(revision.reference(storage));
    }

    pub(crate) fn release(self, revision: &mut ColumnRevision, storage: &mut RevisionStorage) {
        if let Some(seen) = self.seen {
            revision.dereference(storage, seen);
        }
    }
}

// -----------------------------------------------------------------------------
// QueryMonitor

/// Monitors one component column across every archetype a query matches.
///
/// Archetypes that start matching after creation are picked up on the next
/// poll and bootstrap like a fresh [`RevisionMonitor`].
#[derive(Debug)]
pub struct QueryMonitor {
    pub(crate) query: QueryId,
    pub(crate) column: ComponentId,
    pub(crate) monitors: Vec<RevisionMonitor>,
}

impl QueryMonitor {
    pub(crate) const fn new(query: QueryId, column: ComponentId) -> Self {
        Self {
            query,
            column,
            monitors: Vec::new(),
        }
    }

    #[inline]
    pub const fn query(&self) -> QueryId {
        self.query
    }

    #[inline]
    pub const fn column(&self) -> ComponentId {
        self.column
    }

    /// Per-archetype monitors created so far.
    #[inline]
    pub fn monitors(&self) -> &[RevisionMonitor] {
        &self.monitors
    }
}
