use crate::index::SecondaryIndex;
use crate::storage::table::DataTable;
use crate::storage::tile_group::TupleLocator;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What one builder round accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundOutcome {
    pub groups_indexed: usize,
    pub entries_inserted: usize,
    /// The coverage cursor reached the table's tile-group count as of the
    /// end of the round.
    pub caught_up: bool,
    /// The round stopped at a group that can still accept appends. That
    /// group stays with the brute-force scan phase until it seals.
    pub stopped_at_open_group: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub rounds: u64,
    pub groups_indexed: usize,
    pub entries_inserted: usize,
    pub cancelled: bool,
}

/// How a background builder decides it is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Exit after the first round that catches up or hits an open group.
    UntilCaughtUp,
    /// Keep absorbing new tile groups until cancelled.
    Continuous,
}

/// Incrementally populates one index over one table's tile groups.
///
/// There is exactly one builder per (table, index) pair: the type is not
/// clonable and `BackgroundBuilder` takes it by value, so the index cursor
/// has a single writer by construction.
pub struct IndexBuilder {
    table: Arc<DataTable>,
    index: Arc<SecondaryIndex>,
}

impl IndexBuilder {
    pub fn new(table: Arc<DataTable>, index: Arc<SecondaryIndex>) -> Self {
        Self { table, index }
    }

    pub fn index(&self) -> &Arc<SecondaryIndex> {
        &self.index
    }

    /// One round: walk tile groups from the committed cursor to the current
    /// count, indexing each group and advancing the cursor behind it.
    ///
    /// The cursor only advances past a group once the group is sealed and
    /// every claimed slot write has completed. A group that can still accept
    /// appends ends the round: advancing past it would let later appends
    /// slip through both scan phases. Re-running a round over already-indexed
    /// groups is harmless; postings dedupe on exact (key, locator) pairs.
    pub fn run_round(&mut self) -> RoundOutcome {
        let start = self.index.indexed_groups();
        let end = self.table.tile_group_count();
        let mut outcome = RoundOutcome::default();

        for position in start..end {
            let Some(group) = self.table.tile_group_at(position) else {
                warn!(
                    index = self.index.name(),
                    position, "tile group vanished mid-round"
                );
                break;
            };
            if !group.is_fully_materialized() {
                outcome.stopped_at_open_group = true;
                debug!(
                    index = self.index.name(),
                    position,
                    claimed = group.next_slot(),
                    capacity = group.capacity(),
                    "deferring open tile group"
                );
                break;
            }
            for slot in 0..group.capacity() as u32 {
                let Some(row) = group.read(slot) else { continue };
                let key = self.index.project_key(&row);
                self.index.insert(key, TupleLocator::new(group.id(), slot));
                outcome.entries_inserted += 1;
            }
            self.index.advance_indexed_groups(position + 1);
            outcome.groups_indexed += 1;
        }

        outcome.caught_up = self.index.indexed_groups() >= self.table.tile_group_count();
        outcome
    }

    /// Runs rounds until caught up, stopped by an open tail group, or
    /// cancelled. Cancellation is only observed between rounds, so the
    /// cursor is always left at a fully-covered boundary.
    pub fn run_until_settled(&mut self, cancel: &AtomicBool) -> BuildSummary {
        let mut summary = BuildSummary::default();
        loop {
            if cancel.load(Ordering::Acquire) {
                summary.cancelled = true;
                return summary;
            }
            let outcome = self.run_round();
            summary.rounds += 1;
            summary.groups_indexed += outcome.groups_indexed;
            summary.entries_inserted += outcome.entries_inserted;
            if outcome.caught_up || outcome.stopped_at_open_group {
                return summary;
            }
        }
    }
}

/// Owns a builder running on its own worker thread.
///
/// Tests and callers can observe progress through the round counter, cancel
/// between rounds, and join for the final summary.
pub struct BackgroundBuilder {
    cancel: Arc<AtomicBool>,
    rounds_completed: Arc<AtomicU64>,
    handle: JoinHandle<BuildSummary>,
}

impl BackgroundBuilder {
    pub fn spawn(mut builder: IndexBuilder, mode: BuildMode, idle_backoff: Duration) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let rounds_completed = Arc::new(AtomicU64::new(0));
        let worker_cancel = Arc::clone(&cancel);
        let worker_rounds = Arc::clone(&rounds_completed);
        let handle = std::thread::spawn(move || {
            let mut summary = BuildSummary::default();
            loop {
                if worker_cancel.load(Ordering::Acquire) {
                    summary.cancelled = true;
                    break;
                }
                let outcome = builder.run_round();
                summary.rounds += 1;
                summary.groups_indexed += outcome.groups_indexed;
                summary.entries_inserted += outcome.entries_inserted;
                worker_rounds.fetch_add(1, Ordering::AcqRel);

                match mode {
                    BuildMode::UntilCaughtUp => {
                        if outcome.caught_up || outcome.stopped_at_open_group {
                            break;
                        }
                    }
                    BuildMode::Continuous => {
                        if outcome.groups_indexed == 0 {
                            std::thread::sleep(idle_backoff);
                        }
                    }
                }
            }
            info!(
                rounds = summary.rounds,
                groups = summary.groups_indexed,
                entries = summary.entries_inserted,
                cancelled = summary.cancelled,
                "index build finished"
            );
            summary
        });
        Self {
            cancel,
            rounds_completed,
            handle,
        }
    }

    pub fn rounds_completed(&self) -> u64 {
        self.rounds_completed.load(Ordering::Acquire)
    }

    /// Requests a stop at the next round boundary.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// Waits for the worker to exit. Callers running `Continuous` mode must
    /// `cancel()` first or this blocks forever.
    pub fn join(self) -> BuildSummary {
        self.handle.join().expect("builder thread panicked")
    }

    pub fn stop(self) -> BuildSummary {
        self.cancel();
        self.join()
    }
}

#[cfg(test)]
mod tests {
    use super::{BackgroundBuilder, BuildMode, IndexBuilder};
    use crate::catalog::schema::{ColumnDef, IndexDef, TableSchema};
    use crate::catalog::types::{ColumnType, Row, Value};
    use crate::index::SecondaryIndex;
    use crate::storage::encoded_key::EncodedKey;
    use crate::storage::table::DataTable;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    fn table_with_rows(capacity: usize, rows: i64) -> Arc<DataTable> {
        let table = Arc::new(DataTable::new(
            TableSchema::new(
                "numbers",
                vec![ColumnDef {
                    name: "n".into(),
                    col_type: ColumnType::Integer,
                    nullable: false,
                }],
            ),
            capacity,
        ));
        for v in 0..rows {
            table
                .append_tuple(&Row::from_values(vec![Value::Integer(v)]))
                .expect("append");
        }
        table
    }

    fn index_for(table: &DataTable) -> Arc<SecondaryIndex> {
        Arc::new(
            SecondaryIndex::build(IndexDef::skip_list("by_n", "numbers", &["n"]), table.schema())
                .expect("index"),
        )
    }

    #[test]
    fn round_indexes_sealed_groups_and_defers_open_tail() {
        // 10 rows over capacity-4 groups: two sealed, one half-full.
        let table = table_with_rows(4, 10);
        let index = index_for(&table);
        let mut builder = IndexBuilder::new(Arc::clone(&table), Arc::clone(&index));

        let outcome = builder.run_round();
        assert_eq!(outcome.groups_indexed, 2);
        assert_eq!(outcome.entries_inserted, 8);
        assert!(outcome.stopped_at_open_group);
        assert!(!outcome.caught_up);
        assert_eq!(index.indexed_groups(), 2);
        assert_eq!(index.entry_count(), 8);
    }

    #[test]
    fn cursor_advances_once_tail_group_seals() {
        let table = table_with_rows(4, 10);
        let index = index_for(&table);
        let mut builder = IndexBuilder::new(Arc::clone(&table), Arc::clone(&index));
        builder.run_round();
        assert_eq!(index.indexed_groups(), 2);

        // Seal the tail group; a later round absorbs it.
        for v in 10..12 {
            table
                .append_tuple(&Row::from_values(vec![Value::Integer(v)]))
                .expect("append");
        }
        let outcome = builder.run_round();
        assert_eq!(index.indexed_groups(), 3);
        assert_eq!(index.entry_count(), 12);
        assert!(outcome.stopped_at_open_group || outcome.caught_up);
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let table = table_with_rows(4, 8);
        let index = index_for(&table);
        let mut builder = IndexBuilder::new(Arc::clone(&table), Arc::clone(&index));
        let cancel = AtomicBool::new(false);

        builder.run_until_settled(&cancel);
        let entries_once = index.entry_count();
        let query_once = index.point_query(&EncodedKey::from_single(&Value::Integer(5)));

        // A second pass over the same groups changes nothing.
        let mut replay = IndexBuilder::new(Arc::clone(&table), Arc::clone(&index));
        replay.run_round();
        assert_eq!(index.entry_count(), entries_once);
        assert_eq!(
            index.point_query(&EncodedKey::from_single(&Value::Integer(5))),
            query_once
        );
    }

    #[test]
    fn cancelled_builder_leaves_cursor_on_a_round_boundary() {
        let table = table_with_rows(4, 16);
        let index = index_for(&table);
        let mut builder = IndexBuilder::new(Arc::clone(&table), Arc::clone(&index));
        let cancel = AtomicBool::new(true);

        let summary = builder.run_until_settled(&cancel);
        assert!(summary.cancelled);
        assert_eq!(index.indexed_groups(), 0);

        // Resuming from the committed cursor completes the build.
        cancel.store(false, std::sync::atomic::Ordering::Release);
        let summary = builder.run_until_settled(&cancel);
        assert!(!summary.cancelled);
        assert_eq!(index.indexed_groups(), 4);
        assert_eq!(index.entry_count(), 16);
    }

    #[test]
    fn background_builder_reports_rounds_and_joins() {
        let table = table_with_rows(4, 16);
        let index = index_for(&table);
        let builder = IndexBuilder::new(Arc::clone(&table), Arc::clone(&index));

        let background =
            BackgroundBuilder::spawn(builder, BuildMode::UntilCaughtUp, Duration::from_millis(1));
        let summary = background.join();
        assert!(summary.rounds >= 1);
        assert_eq!(summary.entries_inserted, 16);
        assert_eq!(index.indexed_groups(), 4);
    }

    #[test]
    fn continuous_builder_stops_on_cancel() {
        let table = table_with_rows(4, 8);
        let index = index_for(&table);
        let builder = IndexBuilder::new(Arc::clone(&table), Arc::clone(&index));

        let background =
            BackgroundBuilder::spawn(builder, BuildMode::Continuous, Duration::from_millis(1));
        while background.rounds_completed() == 0 {
            std::thread::yield_now();
        }
        let summary = background.stop();
        assert!(summary.cancelled);
        assert_eq!(index.indexed_groups(), 2);
    }
}
