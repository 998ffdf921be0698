use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt::Debug;

use ts_utils::hash::HashMap;

use crate::archetype::{Archetype, ArchetypeId, Archetypes};
use crate::bitfield::BitField;
use crate::component::ComponentId;
use crate::query::{QueryError, QueryId};
use crate::storage::SparseColumnStorage;

// -----------------------------------------------------------------------------
// QueryMatch

/// An archetype matched by a query.
///
/// `columns[i]` is the dense column of the `i`-th bit of the query's with
/// mask, in ascending bit order.
#[derive(Debug, Clone)]
pub struct QueryMatch {
    archetype: ArchetypeId,
    columns: Box<[u32]>,
}

impl QueryMatch {
    #[inline(always)]
    pub fn archetype(&self) -> ArchetypeId {
        self.archetype
    }

    #[inline(always)]
    pub fn columns(&self) -> &[u32] {
        &self.columns
    }
}

// -----------------------------------------------------------------------------
// QueryInfo

/// A registered query and its matched archetypes.
pub struct QueryInfo {
    id: QueryId,
    with: BitField,
    without: BitField,
    with_sparse: BitField,
    without_sparse: BitField,
    matches: Vec<QueryMatch>,
}

impl Debug for QueryInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("QueryInfo")
            .field("id", &self.id)
            .field("with", &self.with)
            .field("without", &self.without)
            .field("with_sparse", &self.with_sparse)
            .field("without_sparse", &self.without_sparse)
            .field("matches", &self.matches.len())
            .finish()
    }
}

impl QueryInfo {
    #[inline(always)]
    pub fn id(&self) -> QueryId {
        self.id
    }

    #[inline(always)]
    pub fn with(&self) -> &BitField {
        &self.with
    }

    #[inline(always)]
    pub fn without(&self) -> &BitField {
        &self.without
    }

    #[inline(always)]
    pub fn with_sparse(&self) -> &BitField {
        &self.with_sparse
    }

    #[inline(always)]
    pub fn without_sparse(&self) -> &BitField {
        &self.without_sparse
    }

    /// Matched archetypes in creation order.
    #[inline(always)]
    pub fn matches(&self) -> &[QueryMatch] {
        &self.matches
    }

    /// Returns `true` if the dense masks accept `arche`.
    #[inline]
    pub fn matches_archetype(&self, arche: &Archetype) -> bool {
        let mask = arche.type_mask();
        mask.contains_all(&self.with) && mask.is_disjoint(&self.without)
    }

    /// Returns `true` if every matched row is guaranteed to hold `id`.
    #[inline]
    pub fn requires(&self, id: ComponentId) -> bool {
        if id.is_sparse() {
            self.with_sparse.contains(id.index())
        } else {
            id.is_dense() && self.with.contains(id.index())
        }
    }

    /// Returns `true` if no row is filtered by sparse conditions.
    #[inline]
    pub fn is_dense_only(&self) -> bool {
        self.with_sparse.is_empty() && self.without_sparse.is_empty()
    }

    fn try_match(&mut self, arche: &Archetype) -> bool {
        if !self.matches_archetype(arche) {
            return false;
        }
        let mask = arche.type_mask();
        let columns = self
            .with
            .iter()
            .map(|bit| mask.rank(bit).map_or(u32::MAX, |rank| rank as u32))
            .collect();
        self.matches.push(QueryMatch {
            archetype: arche.id(),
            columns,
        });
        true
    }
}

// -----------------------------------------------------------------------------
// QueryCache

/// Every query of a manager, deduplicated by their masks.
#[derive(Default)]
pub struct QueryCache {
    queries: Vec<QueryInfo>,
    by_key: HashMap<[BitField; 4], QueryId>,
}

impl Debug for QueryCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(&self.queries, f)
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    #[inline]
    pub fn get(&self, id: QueryId) -> Option<&QueryInfo> {
        self.queries.get(id.index())
    }

    #[inline]
    pub fn require(&self, id: QueryId) -> Result<&QueryInfo, QueryError> {
        self.get(id).ok_or(QueryError::Unknown(id))
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, QueryInfo> {
        self.queries.iter()
    }

    /// Returns the id of the query with these masks, registering it and
    /// matching every existing archetype on first use.
    ///
    /// `masks` is `[with, without, with_sparse, without_sparse]`.
    pub fn register(&mut self, masks: [BitField; 4], archetypes: &Archetypes) -> QueryId {
        if let Some(&id) = self.by_key.get(&masks) {
            return id;
        }

        let id = QueryId::new(self.queries.len() as u32);
        let [with, without, with_sparse, without_sparse] = masks.clone();
        let mut info = QueryInfo {
            id,
            with,
            without,
            with_sparse,
            without_sparse,
            matches: Vec::new(),
        };
        for arche in archetypes {
            info.try_match(arche);
        }

        log::debug!(
            "Registered query {id} matching {} archetypes: {info:?}",
            info.matches.len()
        );
        self.queries.push(info);
        self.by_key.insert(masks, id);
        id
    }

    /// Appends `arche` to every query it matches and returns those queries.
    pub fn on_archetype_created(&mut self, arche: &Archetype) -> Vec<QueryId> {
        self.queries
            .iter_mut()
            .filter_map(|info| info.try_match(arche).then_some(info.id))
            .collect()
    }
}

// -----------------------------------------------------------------------------
// RowFilter

/// The sparse conditions of one query, bound to one archetype.
pub struct RowFilter<'a> {
    with: Vec<&'a SparseColumnStorage>,
    without: Vec<&'a SparseColumnStorage>,
    len: usize,
}

impl<'a> RowFilter<'a> {
    /// Binds the conditions of `info` to `arche`.
    ///
    /// Returns `None` when no row of `arche` can pass: the archetype has no
    /// column for one of the required sparse components.
    pub fn new(info: &QueryInfo, arche: &'a Archetype) -> Option<Self> {
        let mut with = Vec::new();
        for bit in info.with_sparse() {
            let column = arche
                .sparse
                .binary_search_by_key(&bit, |column| column.id.index())
                .ok()?;
            with.push(&arche.sparse[column].storage);
        }
        let without = info
            .without_sparse()
            .iter()
            .filter_map(|bit| {
                let column = arche
                    .sparse
                    .binary_search_by_key(&bit, |column| column.id.index())
                    .ok()?;
                Some(&arche.sparse[column].storage)
            })
            .collect();
        Some(Self {
            with,
            without,
            len: arche.len(),
        })
    }

    /// Returns `true` if `row` passes every condition.
    #[inline]
    pub fn accepts(&self, row: usize) -> bool {
        row < self.len
            && self.with.iter().all(|storage| storage.contains(row))
            && !self.without.iter().any(|storage| storage.contains(row))
    }

    /// Accepted rows, ascending.
    pub fn rows(&self) -> impl Iterator<Item = u32> + '_ {
        let mut next = 0;
        core::iter::from_fn(move || {
            loop {
                let row = match self.with.first() {
                    Some(first) => first.next_set_row(next)?,
                    None => next,
                };
                if row >= self.len {
                    return None;
                }
                next = row + 1;
                if self.accepts(row) {
                    return Some(row as u32);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec::Vec;

    use super::{QueryCache, RowFilter};
    use crate::archetype::{ArchetypeId, Archetypes};
    use crate::bitfield::{BitField, BitFieldGenerator};
    use crate::component::{Component, ComponentId, ComponentStorage, TypeRegistry};
    use crate::entity::Entity;
    use crate::storage::Storages;

    #[derive(Clone, Default)]
    struct A;
    impl Component for A {}
    #[derive(Clone, Default)]
    struct B(#[expect(dead_code, reason = "payload")] u8);
    impl Component for B {}
    #[derive(Clone, Default)]
    struct C(#[expect(dead_code, reason = "payload")] u8);
    impl Component for C {}
    #[derive(Clone, Default)]
    struct S(#[expect(dead_code, reason = "payload")] u8);
    impl Component for S {
        const STORAGE: ComponentStorage = ComponentStorage::Sparse;
    }

    fn mask(registry: &TypeRegistry, ids: &[ComponentId]) -> BitField {
        let mut generator = BitFieldGenerator::new();
        for id in ids {
            generator.add(id.index());
        }
        generator.build(registry.bitfields())
    }

    #[test]
    fn matches_existing_and_new_archetypes() {
        let registry = Arc::new(TypeRegistry::new());
        let mut storages = Storages::new();
        let mut arches = Archetypes::new(registry.bitfields().empty(), &mut storages);
        let (a, b, c) = (
            registry.require::<A>(),
            registry.require::<B>(),
            registry.require::<C>(),
        );

        let ab = arches.require(&mask(&registry, &[a, b]), &registry, &mut storages).0;
        let abc = arches.require(&mask(&registry, &[a, b, c]), &registry, &mut storages).0;

        let empty = registry.bitfields().empty();
        let mut cache = QueryCache::new();
        let masks = [mask(&registry, &[b]), mask(&registry, &[c]), empty.clone(), empty.clone()];
        let q = cache.register(masks.clone(), &arches);
        assert_eq!(cache.register(masks, &arches), q);

        let info = cache.get(q).unwrap();
        let matched: Vec<ArchetypeId> = info.matches().iter().map(|m| m.archetype()).collect();
        assert_eq!(matched, [ab]);
        assert!(!matched.contains(&abc));
        assert_eq!(info.matches()[0].columns(), [1]);

        let (bc, created) = arches.require(&mask(&registry, &[b]), &registry, &mut storages);
        assert!(created);
        let hit = cache.on_archetype_created(arches.get(bc).unwrap());
        assert_eq!(hit, [q]);
        assert_eq!(cache.get(q).unwrap().matches().len(), 2);
        assert_eq!(cache.get(q).unwrap().matches()[1].columns(), [0]);
    }

    #[test]
    fn sparse_rows_are_filtered() {
        let registry = Arc::new(TypeRegistry::new());
        let mut storages = Storages::new();
        let mut arches = Archetypes::new(registry.bitfields().empty(), &mut storages);
        let s = registry.require::<S>();
        let info = registry.require_info(s);

        let arche = arches.expect_mut(ArchetypeId::EMPTY);
        for i in 0..70 {
            arche.allocate_row(Entity::new(i + 1, 1), &mut storages, 8);
        }
        let column = arche.require_sparse_column(&info, &mut storages, registry.bitfields(), 0);
        for row in [3, 40, 64, 69] {
            arche.insert_sparse(column, row, &mut storages);
        }

        let empty = registry.bitfields().empty();
        let sparse = mask(&registry, &[s]);
        let mut cache = QueryCache::new();
        let with = cache.register(
            [empty.clone(), empty.clone(), sparse.clone(), empty.clone()],
            &arches,
        );
        let without = cache.register([empty.clone(), empty.clone(), empty, sparse], &arches);

        let arche = arches.expect(ArchetypeId::EMPTY);
        let filter = RowFilter::new(cache.get(with).unwrap(), arche).unwrap();
        assert_eq!(filter.rows().collect::<Vec<_>>(), [3, 40, 64, 69]);

        let filter = RowFilter::new(cache.get(without).unwrap(), arche).unwrap();
        assert_eq!(filter.rows().count(), 66);
        assert!(!filter.accepts(40));
        assert!(filter.accepts(41));
    }
}
