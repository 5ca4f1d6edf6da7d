use crate::catalog::schema::TableSchema;
use crate::catalog::types::Row;
use crate::error::{AdaptdbError, ResourceType};
use crate::index::SecondaryIndex;
use crate::storage::tile_group::{TileGroup, TileGroupFull, TileGroupId, TupleLocator};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::debug;

struct TileGroupArena {
    groups: Vec<Arc<TileGroup>>,
    by_id: HashMap<TileGroupId, usize>,
}

/// Append-only ordered sequence of tile groups plus the indexes attached to
/// them. Tile-group ordering, once assigned, never changes; groups are never
/// removed while the table lives.
pub struct DataTable {
    schema: TableSchema,
    tuples_per_tile_group: usize,
    arena: RwLock<TileGroupArena>,
    /// Mirror of `arena.groups.len()` so scans can snapshot the table shape
    /// with a single atomic load.
    group_count: AtomicUsize,
    next_group_id: AtomicU64,
    indexes: RwLock<Vec<Arc<SecondaryIndex>>>,
}

impl DataTable {
    pub fn new(schema: TableSchema, tuples_per_tile_group: usize) -> Self {
        let table = Self {
            schema,
            tuples_per_tile_group,
            arena: RwLock::new(TileGroupArena {
                groups: Vec::new(),
                by_id: HashMap::new(),
            }),
            group_count: AtomicUsize::new(0),
            next_group_id: AtomicU64::new(0),
            indexes: RwLock::new(Vec::new()),
        };
        table.allocate_tile_group(&mut table.arena.write());
        table
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.schema.table_name
    }

    pub fn tuples_per_tile_group(&self) -> usize {
        self.tuples_per_tile_group
    }

    /// Number of tile groups existing at the instant of the call. Scans fix
    /// this once to bound brute-force iteration; groups appended afterwards
    /// are invisible to that scan call.
    pub fn tile_group_count(&self) -> usize {
        self.group_count.load(Ordering::Acquire)
    }

    pub fn tile_group_at(&self, position: usize) -> Option<Arc<TileGroup>> {
        self.arena.read().groups.get(position).cloned()
    }

    pub fn tile_group_by_id(&self, id: TileGroupId) -> Option<Arc<TileGroup>> {
        let arena = self.arena.read();
        let position = *arena.by_id.get(&id)?;
        arena.groups.get(position).cloned()
    }

    /// Resolves a locator to its tile group and that group's position in
    /// creation order.
    pub fn locate(&self, locator: TupleLocator) -> Option<(Arc<TileGroup>, usize)> {
        let arena = self.arena.read();
        let position = *arena.by_id.get(&locator.group)?;
        let group = arena.groups.get(position).cloned()?;
        Some((group, position))
    }

    pub fn read_tuple(&self, locator: TupleLocator) -> Option<Row> {
        self.tile_group_by_id(locator.group)?.read(locator.slot)
    }

    /// Reserves a slot in the active tile group, growing the table when the
    /// group is sealed. Capacity exhaustion is recovered here and never
    /// surfaced to callers.
    pub fn append_tuple(&self, row: &Row) -> Result<TupleLocator, AdaptdbError> {
        self.schema.validate_row(row)?;
        loop {
            let group = self.active_tile_group();
            match group.append(row) {
                Ok(slot) => return Ok(TupleLocator::new(group.id(), slot)),
                Err(TileGroupFull) => self.grow_past(group.id()),
            }
        }
    }

    pub fn add_index(&self, index: Arc<SecondaryIndex>) -> Result<(), AdaptdbError> {
        let mut indexes = self.indexes.write();
        if indexes.iter().any(|i| i.name() == index.name()) {
            return Err(AdaptdbError::AlreadyExists {
                resource_type: ResourceType::Index,
                resource_id: index.name().to_string(),
            });
        }
        indexes.push(index);
        Ok(())
    }

    pub fn index(&self, name: &str) -> Option<Arc<SecondaryIndex>> {
        self.indexes.read().iter().find(|i| i.name() == name).cloned()
    }

    pub fn indexes(&self) -> Vec<Arc<SecondaryIndex>> {
        self.indexes.read().clone()
    }

    fn active_tile_group(&self) -> Arc<TileGroup> {
        let arena = self.arena.read();
        // The arena is never empty: one group is allocated at construction.
        Arc::clone(arena.groups.last().expect("table has no tile groups"))
    }

    /// Appends a fresh tile group unless another appender already grew the
    /// table past `sealed` while we were waiting for the write lock.
    fn grow_past(&self, sealed: TileGroupId) {
        let mut arena = self.arena.write();
        let last = arena.groups.last().expect("table has no tile groups");
        if last.id() != sealed {
            return;
        }
        self.allocate_tile_group(&mut arena);
    }

    fn allocate_tile_group(&self, arena: &mut TileGroupArena) {
        let id = TileGroupId(self.next_group_id.fetch_add(1, Ordering::AcqRel));
        let position = arena.groups.len();
        arena
            .groups
            .push(Arc::new(TileGroup::new(id, position, self.tuples_per_tile_group)));
        arena.by_id.insert(id, position);
        self.group_count.store(arena.groups.len(), Ordering::Release);
        debug!(
            table = %self.schema.table_name,
            %id,
            position,
            "allocated tile group"
        );
    }
}

impl std::fmt::Debug for DataTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataTable")
            .field("name", &self.schema.table_name)
            .field("tile_groups", &self.tile_group_count())
            .field("tuples_per_tile_group", &self.tuples_per_tile_group)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::DataTable;
    use crate::catalog::schema::{ColumnDef, TableSchema};
    use crate::catalog::types::{ColumnType, Row, Value};
    use crate::storage::tile_group::TupleLocator;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn table(capacity: usize) -> DataTable {
        DataTable::new(
            TableSchema::new(
                "numbers",
                vec![ColumnDef {
                    name: "n".into(),
                    col_type: ColumnType::Integer,
                    nullable: false,
                }],
            ),
            capacity,
        )
    }

    fn row(v: i64) -> Row {
        Row::from_values(vec![Value::Integer(v)])
    }

    #[test]
    fn appends_grow_the_table_group_by_group() {
        let table = table(4);
        assert_eq!(table.tile_group_count(), 1);
        let mut locators = Vec::new();
        for v in 0..10 {
            locators.push(table.append_tuple(&row(v)).expect("append"));
        }
        assert_eq!(table.tile_group_count(), 3);

        // Positions are stable and ordered by creation.
        for (i, group_position) in [(0usize, 0usize), (4, 1), (8, 2)] {
            let (_, position) = table.locate(locators[i]).expect("locate");
            assert_eq!(position, group_position);
        }
    }

    #[test]
    fn read_tuple_roundtrips_by_locator() {
        let table = table(8);
        let locator = table.append_tuple(&row(42)).expect("append");
        assert_eq!(
            table.read_tuple(locator),
            Some(Row::from_values(vec![Value::Integer(42)]))
        );
        let missing = TupleLocator::new(locator.group, 5);
        assert_eq!(table.read_tuple(missing), None);
    }

    #[test]
    fn concurrent_appends_yield_distinct_locators() {
        let table = Arc::new(table(16));
        let mut handles = Vec::new();
        for t in 0..8 {
            let table = Arc::clone(&table);
            handles.push(thread::spawn(move || {
                let mut out = Vec::new();
                for i in 0..50 {
                    out.push(table.append_tuple(&row(t * 100 + i)).expect("append"));
                }
                out
            }));
        }
        let mut all: Vec<TupleLocator> = Vec::new();
        for handle in handles {
            all.extend(handle.join().expect("join"));
        }
        let unique: HashSet<TupleLocator> = all.iter().copied().collect();
        assert_eq!(all.len(), 400);
        assert_eq!(unique.len(), 400);
        // 400 tuples over capacity-16 groups: every group but the last sealed.
        assert_eq!(table.tile_group_count(), 400usize.div_ceil(16));
    }

    #[test]
    fn tile_group_count_is_a_shape_snapshot() {
        let table = table(2);
        let before = table.tile_group_count();
        for v in 0..6 {
            table.append_tuple(&row(v)).expect("append");
        }
        assert_eq!(before, 1);
        assert_eq!(table.tile_group_count(), 3);
    }
}
