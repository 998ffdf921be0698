use core::fmt::Debug;

use crate::bitfield::BitFieldGenerator;
use crate::component::{Component, ComponentId};
use crate::manager::EntityManager;
use crate::query::QueryId;

// -----------------------------------------------------------------------------
// QueryBuilder

/// Accumulates the conditions of a query.
///
/// Created by [`EntityManager::begin_query`]. Dense and sparse components go
/// to separate masks; tag components count as dense.
///
/// # Examples
///
/// ```
/// use ts_ecs::prelude::*;
/// # use std::sync::Arc;
///
/// #[derive(Clone, Default)]
/// struct Health(u32);
/// impl Component for Health {}
///
/// #[derive(Clone, Default)]
/// struct Dead;
/// impl Component for Dead {}
///
/// let mut manager = EntityManager::new(Arc::new(TypeRegistry::new()));
/// let alive = manager.begin_query().with::<Health>().without::<Dead>().build();
/// assert_eq!(manager.begin_query().with::<Health>().without::<Dead>().build(), alive);
/// ```
pub struct QueryBuilder<'m> {
    manager: &'m mut EntityManager,
    with: BitFieldGenerator,
    without: BitFieldGenerator,
    with_sparse: BitFieldGenerator,
    without_sparse: BitFieldGenerator,
}

impl Debug for QueryBuilder<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("with", &self.with)
            .field("without", &self.without)
            .field("with_sparse", &self.with_sparse)
            .field("without_sparse", &self.without_sparse)
            .finish()
    }
}

impl<'m> QueryBuilder<'m> {
    pub(crate) fn new(manager: &'m mut EntityManager) -> Self {
        Self {
            manager,
            with: BitFieldGenerator::new(),
            without: BitFieldGenerator::new(),
            with_sparse: BitFieldGenerator::new(),
            without_sparse: BitFieldGenerator::new(),
        }
    }

    /// Requires `T` on every matched entity.
    #[inline]
    pub fn with<T: Component>(self) -> Self {
        let id = self.manager.registry().require::<T>();
        self.with_id(id)
    }

    /// Excludes entities holding `T`.
    #[inline]
    pub fn without<T: Component>(self) -> Self {
        let id = self.manager.registry().require::<T>();
        self.without_id(id)
    }

    pub fn with_id(mut self, id: ComponentId) -> Self {
        if id.is_sparse() {
            self.with_sparse.add(id.index());
        } else {
            self.with.add(id.index());
        }
        self
    }

    pub fn without_id(mut self, id: ComponentId) -> Self {
        if id.is_sparse() {
            self.without_sparse.add(id.index());
        } else {
            self.without.add(id.index());
        }
        self
    }

    /// Interns the conditions and returns the query's id.
    ///
    /// Building the same conditions twice returns the same id.
    pub fn build(self) -> QueryId {
        let cache = self.manager.registry().bitfields();
        let masks = [
            self.with.build(cache),
            self.without.build(cache),
            self.with_sparse.build(cache),
            self.without_sparse.build(cache),
        ];
        self.manager.register_query(masks)
    }
}
