//! Cached queries.
//!
//! A query is a (with, without) pair of dense type masks plus the same pair
//! for sparse components. Building a query interns the masks and records
//! every matching archetype; archetypes created later are matched once, on
//! creation. Sparse conditions are evaluated per row during iteration.

// -----------------------------------------------------------------------------
// Modules

mod builder;
mod cache;
mod data;
mod error;
mod ident;

// -----------------------------------------------------------------------------
// Exports

pub use builder::QueryBuilder;
pub use cache::{QueryCache, QueryInfo, QueryMatch, RowFilter};
pub use data::{Access, ColumnLocator, ColumnLocatorMut, QueryData};
pub use error::QueryError;
pub use ident::QueryId;

pub(crate) use data::ColumnCheckout;
