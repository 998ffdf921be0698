use thiserror::Error;

use crate::query::QueryId;
use crate::utils::DebugName;

// -----------------------------------------------------------------------------
// QueryError

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum QueryError {
    #[error("Query {0} is not registered in this manager")]
    Unknown(QueryId),

    #[error("Component {name} is accessed but not required by the query")]
    Undeclared { name: DebugName },

    #[error("Component {name} is accessed more than once")]
    Conflict { name: DebugName },
}

impl QueryError {
    #[cold]
    #[inline(never)]
    pub fn handle_error(&self) -> ! {
        panic!("{self}");
    }
}
