pub mod buffer_pool;

use crate::logging::buffer_pool::{LogBuffer, LogBufferPool};
use crate::storage::tile_group::TupleLocator;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Routes insert records to per-worker buffer pools. The core treats the
/// whole layer as fire-and-forget: a buffer that fills up is recycled
/// straight through its pool, and scan/build correctness never reads it.
pub struct LogRouter {
    queue_size: usize,
    buffer_capacity: usize,
    workers: DashMap<usize, Arc<WorkerLog>>,
}

struct WorkerLog {
    pool: LogBufferPool,
    active: Mutex<LogBuffer>,
}

impl LogRouter {
    pub fn new(queue_size: usize, buffer_capacity: usize) -> Self {
        Self {
            queue_size,
            buffer_capacity,
            workers: DashMap::new(),
        }
    }

    pub fn log_insert(&self, worker_id: usize, epoch: u64, locator: TupleLocator) {
        let worker = self.worker(worker_id);
        let record = encode_insert_record(locator);
        let mut active = worker.active.lock();
        if !active.push_record(&record) {
            let full = std::mem::replace(&mut *active, worker.pool.get_buffer(epoch));
            worker.pool.put_buffer(full);
            active.push_record(&record);
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    fn worker(&self, worker_id: usize) -> Arc<WorkerLog> {
        self.workers
            .entry(worker_id)
            .or_insert_with(|| {
                let pool = LogBufferPool::new(worker_id, self.queue_size, self.buffer_capacity);
                let active = Mutex::new(pool.get_buffer(0));
                Arc::new(WorkerLog { pool, active })
            })
            .clone()
    }
}

fn encode_insert_record(locator: TupleLocator) -> [u8; 12] {
    let mut record = [0u8; 12];
    record[..8].copy_from_slice(&locator.group.0.to_be_bytes());
    record[8..].copy_from_slice(&locator.slot.to_be_bytes());
    record
}

#[cfg(test)]
mod tests {
    use super::LogRouter;
    use crate::storage::tile_group::{TileGroupId, TupleLocator};

    #[test]
    fn each_worker_gets_its_own_pool() {
        let router = LogRouter::new(4, 64);
        router.log_insert(0, 1, TupleLocator::new(TileGroupId(0), 0));
        router.log_insert(1, 1, TupleLocator::new(TileGroupId(0), 1));
        router.log_insert(0, 1, TupleLocator::new(TileGroupId(0), 2));
        assert_eq!(router.worker_count(), 2);
    }

    #[test]
    fn overflow_swaps_in_a_fresh_buffer() {
        // Capacity fits two 12-byte records; the third forces a swap.
        let router = LogRouter::new(4, 24);
        for slot in 0..5 {
            router.log_insert(7, 1, TupleLocator::new(TileGroupId(1), slot));
        }
        assert_eq!(router.worker_count(), 1);
    }
}
