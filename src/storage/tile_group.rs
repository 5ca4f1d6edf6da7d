use crate::catalog::types::Row;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct TileGroupId(pub u64);

impl std::fmt::Display for TileGroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tg-{}", self.0)
    }
}

/// Physical address of one tuple slot. Immutable once produced; the value
/// type stored in every index entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct TupleLocator {
    pub group: TileGroupId,
    pub slot: u32,
}

impl TupleLocator {
    pub const MIN: TupleLocator = TupleLocator {
        group: TileGroupId(0),
        slot: 0,
    };
    pub const MAX: TupleLocator = TupleLocator {
        group: TileGroupId(u64::MAX),
        slot: u32::MAX,
    };

    pub fn new(group: TileGroupId, slot: u32) -> Self {
        Self { group, slot }
    }
}

impl std::fmt::Display for TupleLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.group, self.slot)
    }
}

/// Append rejected because every slot has been claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGroupFull;

/// Fixed-capacity block of tuple storage.
///
/// Slot claims go through `next_slot` with a lock-free fetch-update, so no
/// two appenders ever receive the same slot. `filled` counts completed slot
/// writes; `filled == capacity` is the signal the index builder waits for
/// before trusting the group's contents.
pub struct TileGroup {
    id: TileGroupId,
    position: usize,
    capacity: usize,
    next_slot: AtomicUsize,
    filled: AtomicUsize,
    slots: Box<[OnceLock<Row>]>,
}

impl TileGroup {
    pub fn new(id: TileGroupId, position: usize, capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, OnceLock::new);
        Self {
            id,
            position,
            capacity,
            next_slot: AtomicUsize::new(0),
            filled: AtomicUsize::new(0),
            slots: slots.into_boxed_slice(),
        }
    }

    pub fn id(&self) -> TileGroupId {
        self.id
    }

    /// Offset of this group in its table's creation order; never changes.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots claimed so far. Monotonically non-decreasing.
    pub fn next_slot(&self) -> usize {
        self.next_slot.load(Ordering::Acquire)
    }

    /// Every slot has been claimed; no further appends will succeed.
    pub fn is_sealed(&self) -> bool {
        self.next_slot() >= self.capacity
    }

    /// Sealed and every claimed slot's write has completed. Only then can a
    /// reader enumerate the group without racing in-flight appends.
    pub fn is_fully_materialized(&self) -> bool {
        self.filled.load(Ordering::Acquire) >= self.capacity
    }

    /// Claims the next slot and writes `row` into it.
    pub fn append(&self, row: &Row) -> Result<u32, TileGroupFull> {
        let claimed = self
            .next_slot
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.capacity).then_some(n + 1)
            })
            .map_err(|_| TileGroupFull)?;
        // Sole claimant of this slot; the set cannot fail.
        let _ = self.slots[claimed].set(row.clone());
        self.filled.fetch_add(1, Ordering::AcqRel);
        Ok(claimed as u32)
    }

    /// Returns the row in `slot`, or `None` when the slot is unclaimed or its
    /// write has not completed. No visibility checking happens here.
    pub fn read(&self, slot: u32) -> Option<Row> {
        let slot = slot as usize;
        if slot >= self.next_slot() {
            return None;
        }
        self.slots[slot].get().cloned()
    }
}

impl std::fmt::Debug for TileGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileGroup")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("capacity", &self.capacity)
            .field("next_slot", &self.next_slot())
            .finish()
    }
}
