//! Per-column change tracking.
//!
//! Each column records created/modified/destroyed rows into epochs. An epoch
//! stays open until a [`RevisionMonitor`] reads the column, which flushes it;
//! the next write opens a new epoch. Monitors reference the epoch they last
//! read, and epochs older than every reference are recycled.

// -----------------------------------------------------------------------------
// Modules

mod column;
mod monitor;
mod storage;

// -----------------------------------------------------------------------------
// Exports

pub use column::{ColumnRevision, FLUSHED};
pub use monitor::{ColumnEvent, QueryMonitor, RevisionMonitor};
pub use storage::{Epoch, RevisionStorage};
