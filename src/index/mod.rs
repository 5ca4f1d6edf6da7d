pub mod builder;

use crate::catalog::schema::{IndexDef, IndexType, TableSchema};
use crate::catalog::types::Row;
use crate::error::AdaptdbError;
use crate::storage::encoded_key::EncodedKey;
use crate::storage::tile_group::TupleLocator;
use crossbeam_skiplist::SkipSet;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One index posting: key bytes plus the physical address they point at.
/// Ordered by key first, so a skip-list of entries doubles as an ordered
/// multimap, and exact `(key, locator)` duplicates collapse into one entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct IndexEntry {
    pub key: EncodedKey,
    pub locator: TupleLocator,
}

enum IndexStore {
    SkipList(SkipSet<IndexEntry>),
    Hash(DashMap<EncodedKey, BTreeSet<TupleLocator>>),
}

/// Key→locator structure safe for one concurrent writer and many concurrent
/// readers. Owns its "indexed tile-group offset" cursor: the count of tile
/// groups, in creation order, whose contents it fully covers.
pub struct SecondaryIndex {
    def: IndexDef,
    key_columns: Vec<usize>,
    store: IndexStore,
    indexed_groups: AtomicUsize,
}

impl SecondaryIndex {
    pub fn build(def: IndexDef, schema: &TableSchema) -> Result<Self, AdaptdbError> {
        let mut key_columns = Vec::with_capacity(def.columns.len());
        for column in &def.columns {
            let idx =
                schema
                    .column_index(column)
                    .ok_or_else(|| AdaptdbError::UnknownColumn {
                        table: schema.table_name.clone(),
                        column: column.clone(),
                    })?;
            key_columns.push(idx);
        }
        if key_columns.is_empty() {
            return Err(AdaptdbError::Validation(format!(
                "index '{}' has no key columns",
                def.index_name
            )));
        }
        let store = match def.index_type {
            IndexType::SkipList => IndexStore::SkipList(SkipSet::new()),
            IndexType::Hash => IndexStore::Hash(DashMap::new()),
        };
        Ok(Self {
            def,
            key_columns,
            store,
            indexed_groups: AtomicUsize::new(0),
        })
    }

    pub fn def(&self) -> &IndexDef {
        &self.def
    }

    pub fn name(&self) -> &str {
        &self.def.index_name
    }

    pub fn key_columns(&self) -> &[usize] {
        &self.key_columns
    }

    /// Current value of the coverage cursor. A lower bound: readers may find
    /// coverage has advanced past any value they observe, never regressed.
    pub fn indexed_groups(&self) -> usize {
        self.indexed_groups.load(Ordering::Acquire)
    }

    /// Advances the coverage cursor. Builder-only; fetch_max keeps the cursor
    /// monotonic even if a restarted builder replays an old round.
    pub(crate) fn advance_indexed_groups(&self, covered: usize) {
        self.indexed_groups.fetch_max(covered, Ordering::AcqRel);
    }

    /// Projects `row` onto this index's key columns.
    pub fn project_key(&self, row: &Row) -> EncodedKey {
        let mut values = Vec::with_capacity(self.key_columns.len());
        for idx in &self.key_columns {
            values.push(row.values[*idx].clone());
        }
        EncodedKey::from_values(&values)
    }

    /// Inserts one posting. Re-inserting an identical `(key, locator)` pair
    /// is a no-op in both stores, which is what makes builder rounds safely
    /// re-runnable from any committed cursor boundary.
    pub fn insert(&self, key: EncodedKey, locator: TupleLocator) {
        match &self.store {
            IndexStore::SkipList(entries) => {
                entries.insert(IndexEntry { key, locator });
            }
            IndexStore::Hash(entries) => {
                entries.entry(key).or_default().insert(locator);
            }
        }
    }

    pub fn point_query(&self, key: &EncodedKey) -> Vec<TupleLocator> {
        match &self.store {
            IndexStore::SkipList(entries) => entries
                .range((
                    Bound::Included(IndexEntry {
                        key: key.clone(),
                        locator: TupleLocator::MIN,
                    }),
                    Bound::Included(IndexEntry {
                        key: key.clone(),
                        locator: TupleLocator::MAX,
                    }),
                ))
                .map(|entry| entry.value().locator)
                .collect(),
            IndexStore::Hash(entries) => entries
                .get(key)
                .map(|locators| locators.iter().copied().collect())
                .unwrap_or_default(),
        }
    }

    /// Whether the backing store can serve ordered range lookups at all.
    pub fn supports_range(&self) -> bool {
        matches!(self.store, IndexStore::SkipList(_))
    }

    /// Candidates whose key falls in `[lower, upper]`. Empty for stores that
    /// cannot order keys; callers gate on `supports_range` first.
    pub fn range_query(
        &self,
        lower: Bound<EncodedKey>,
        upper: Bound<EncodedKey>,
    ) -> Vec<TupleLocator> {
        match &self.store {
            IndexStore::SkipList(entries) => entries
                .range((entry_lower_bound(lower), entry_upper_bound(upper)))
                .map(|entry| entry.value().locator)
                .collect(),
            IndexStore::Hash(_) => Vec::new(),
        }
    }

    /// Total postings currently stored.
    pub fn entry_count(&self) -> usize {
        match &self.store {
            IndexStore::SkipList(entries) => entries.len(),
            IndexStore::Hash(entries) => entries.iter().map(|kv| kv.value().len()).sum(),
        }
    }
}

impl std::fmt::Debug for SecondaryIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecondaryIndex")
            .field("name", &self.def.index_name)
            .field("type", &self.def.index_type)
            .field("indexed_groups", &self.indexed_groups())
            .finish()
    }
}

fn entry_lower_bound(bound: Bound<EncodedKey>) -> Bound<IndexEntry> {
    match bound {
        Bound::Included(key) => Bound::Included(IndexEntry {
            key,
            locator: TupleLocator::MIN,
        }),
        Bound::Excluded(key) => Bound::Excluded(IndexEntry {
            key,
            locator: TupleLocator::MAX,
        }),
        Bound::Unbounded => Bound::Unbounded,
    }
}

fn entry_upper_bound(bound: Bound<EncodedKey>) -> Bound<IndexEntry> {
    match bound {
        Bound::Included(key) => Bound::Included(IndexEntry {
            key,
            locator: TupleLocator::MAX,
        }),
        Bound::Excluded(key) => Bound::Excluded(IndexEntry {
            key,
            locator: TupleLocator::MIN,
        }),
        Bound::Unbounded => Bound::Unbounded,
    }
}
