use core::fmt::{Debug, Display};

// -----------------------------------------------------------------------------
// QueryId

/// Identifier of a query registered in a manager's [`QueryCache`].
///
/// Building the same query twice yields the same id.
///
/// [`QueryCache`]: crate::query::QueryCache
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct QueryId(u32);

impl QueryId {
    #[inline(always)]
    pub(crate) const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Debug for QueryId {
    #[inline(always)]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "QueryId({})", self.0)
    }
}

impl Display for QueryId {
    #[inline(always)]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Display::fmt(&self.0, f)
    }
}
