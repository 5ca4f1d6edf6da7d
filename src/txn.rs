use crate::storage::tile_group::TupleLocator;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

pub type TxnId = u64;

/// A client-held transaction handle. Holds its own snapshot sequence and the
/// locators it inserted; the manager owns everything else.
#[derive(Debug)]
pub struct Transaction {
    id: TxnId,
    snapshot_seq: u64,
    write_set: Vec<TupleLocator>,
}

impl Transaction {
    pub fn id(&self) -> TxnId {
        self.id
    }

    pub fn snapshot_seq(&self) -> u64 {
        self.snapshot_seq
    }
}

#[derive(Debug, Clone, Copy)]
struct TupleMeta {
    inserted_by: TxnId,
    commit_seq: Option<u64>,
}

/// Minimal transaction manager: sequence-based snapshots and a per-locator
/// visibility predicate. The scan/build core only ever consumes this
/// interface; full MVCC (updates, deletes, aborts) lives outside it.
pub struct TransactionManager {
    next_txn_id: AtomicU64,
    /// Allocation clock for commit sequences.
    commit_clock: AtomicU64,
    /// Highest commit sequence whose tuple stamps are complete. New
    /// snapshots read this, so a snapshot never covers a half-stamped commit.
    visible_seq: AtomicU64,
    tuple_meta: RwLock<HashMap<TupleLocator, TupleMeta>>,
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionManager {
    pub fn new() -> Self {
        Self {
            next_txn_id: AtomicU64::new(1),
            commit_clock: AtomicU64::new(0),
            visible_seq: AtomicU64::new(0),
            tuple_meta: RwLock::new(HashMap::new()),
        }
    }

    pub fn begin(&self) -> Transaction {
        Transaction {
            id: self.next_txn_id.fetch_add(1, Ordering::AcqRel),
            snapshot_seq: self.visible_seq.load(Ordering::Acquire),
            write_set: Vec::new(),
        }
    }

    /// Tags `locator` as inserted by `txn`. Called by insert paths, never by
    /// the scan/build core.
    pub fn record_insert(&self, txn: &mut Transaction, locator: TupleLocator) {
        self.tuple_meta.write().insert(
            locator,
            TupleMeta {
                inserted_by: txn.id,
                commit_seq: None,
            },
        );
        txn.write_set.push(locator);
    }

    /// Stamps the transaction's write set with a fresh commit sequence, then
    /// publishes that sequence for new snapshots. Returns the sequence.
    pub fn commit(&self, txn: Transaction) -> u64 {
        let seq = self.commit_clock.fetch_add(1, Ordering::AcqRel) + 1;
        {
            let mut meta = self.tuple_meta.write();
            for locator in &txn.write_set {
                if let Some(entry) = meta.get_mut(locator) {
                    entry.commit_seq = Some(seq);
                }
            }
        }
        self.visible_seq.fetch_max(seq, Ordering::AcqRel);
        seq
    }

    /// Per-tuple visibility: committed at-or-before the transaction's
    /// snapshot, or written by the transaction itself. A `false` here is a
    /// per-tuple exclusion, never an engine error.
    pub fn is_visible(&self, txn: &Transaction, locator: TupleLocator) -> bool {
        let meta = self.tuple_meta.read();
        match meta.get(&locator) {
            Some(entry) => match entry.commit_seq {
                Some(seq) => seq <= txn.snapshot_seq,
                None => entry.inserted_by == txn.id,
            },
            None => false,
        }
    }

    pub fn visible_seq(&self) -> u64 {
        self.visible_seq.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("visible_seq", &self.visible_seq())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::TransactionManager;
    use crate::storage::tile_group::{TileGroupId, TupleLocator};

    fn locator(slot: u32) -> TupleLocator {
        TupleLocator::new(TileGroupId(0), slot)
    }

    #[test]
    fn own_uncommitted_inserts_are_visible() {
        let manager = TransactionManager::new();
        let mut txn = manager.begin();
        manager.record_insert(&mut txn, locator(0));
        assert!(manager.is_visible(&txn, locator(0)));

        let other = manager.begin();
        assert!(!manager.is_visible(&other, locator(0)));
    }

    #[test]
    fn commits_become_visible_to_later_snapshots_only() {
        let manager = TransactionManager::new();
        let mut writer = manager.begin();
        manager.record_insert(&mut writer, locator(1));

        let before = manager.begin();
        manager.commit(writer);
        let after = manager.begin();

        assert!(!manager.is_visible(&before, locator(1)));
        assert!(manager.is_visible(&after, locator(1)));
    }

    #[test]
    fn unknown_locators_are_invisible() {
        let manager = TransactionManager::new();
        let txn = manager.begin();
        assert!(!manager.is_visible(&txn, locator(9)));
    }

    #[test]
    fn commit_sequences_increase() {
        let manager = TransactionManager::new();
        let a = manager.commit(manager.begin());
        let b = manager.commit(manager.begin());
        assert!(b > a);
        assert_eq!(manager.visible_seq(), b);
    }
}
