// -----------------------------------------------------------------------------
// StageConfig

/// Sizing of an [`EntityManager`](super::EntityManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageConfig {
    /// Rows reserved by an archetype's first allocation; later growth doubles.
    pub initial_row_capacity: u32,
    /// Entity handles reserved up front.
    pub entity_capacity: usize,
    /// Sparse pages reserved per sparse column when it is created.
    pub sparse_page_reserve: usize,
}

impl StageConfig {
    pub const DEFAULT: Self = Self {
        initial_row_capacity: 1024,
        entity_capacity: 1024,
        sparse_page_reserve: 0,
    };
}

impl Default for StageConfig {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}
