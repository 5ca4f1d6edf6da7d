use parking_lot::Mutex;
use std::collections::VecDeque;

/// A reusable chunk of encoded log records owned by one worker.
#[derive(Debug)]
pub struct LogBuffer {
    worker_id: usize,
    epoch: u64,
    data: Vec<u8>,
    capacity: usize,
}

impl LogBuffer {
    fn new(worker_id: usize, epoch: u64, capacity: usize) -> Self {
        Self {
            worker_id,
            epoch,
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Appends one record. Returns false when the record does not fit; the
    /// caller swaps in a fresh buffer and retries.
    pub fn push_record(&mut self, record: &[u8]) -> bool {
        if self.data.len() + record.len() > self.capacity {
            return false;
        }
        self.data.extend_from_slice(record);
        true
    }

    fn reset(&mut self, epoch: u64) {
        self.epoch = epoch;
        self.data.clear();
    }
}

/// Bounded ring of reusable log buffers keyed to one worker. Buffers cycle
/// through get/put; when the ring is full a returned buffer is simply
/// dropped, and when it is empty a fresh one is allocated.
#[derive(Debug)]
pub struct LogBufferPool {
    worker_id: usize,
    queue_size: usize,
    buffer_capacity: usize,
    idle: Mutex<VecDeque<LogBuffer>>,
}

impl LogBufferPool {
    pub fn new(worker_id: usize, queue_size: usize, buffer_capacity: usize) -> Self {
        Self {
            worker_id,
            queue_size,
            buffer_capacity,
            idle: Mutex::new(VecDeque::with_capacity(queue_size)),
        }
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    pub fn get_buffer(&self, epoch: u64) -> LogBuffer {
        if let Some(mut buffer) = self.idle.lock().pop_front() {
            buffer.reset(epoch);
            return buffer;
        }
        LogBuffer::new(self.worker_id, epoch, self.buffer_capacity)
    }

    pub fn put_buffer(&self, buffer: LogBuffer) {
        let mut idle = self.idle.lock();
        if idle.len() < self.queue_size {
            idle.push_back(buffer);
        }
    }

    pub fn idle_buffers(&self) -> usize {
        self.idle.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::LogBufferPool;

    #[test]
    fn buffers_recycle_through_the_pool() {
        let pool = LogBufferPool::new(3, 2, 64);
        let mut buffer = pool.get_buffer(1);
        assert_eq!(buffer.worker_id(), 3);
        assert!(buffer.push_record(b"record"));
        assert_eq!(buffer.len(), 6);

        pool.put_buffer(buffer);
        assert_eq!(pool.idle_buffers(), 1);

        let recycled = pool.get_buffer(2);
        assert_eq!(recycled.epoch(), 2);
        assert!(recycled.is_empty());
        assert_eq!(pool.idle_buffers(), 0);
    }

    #[test]
    fn ring_is_bounded() {
        let pool = LogBufferPool::new(0, 1, 64);
        pool.put_buffer(pool.get_buffer(1));
        pool.put_buffer(pool.get_buffer(1));
        assert_eq!(pool.idle_buffers(), 1);
    }

    #[test]
    fn full_buffer_rejects_oversized_record() {
        let pool = LogBufferPool::new(0, 1, 8);
        let mut buffer = pool.get_buffer(1);
        assert!(buffer.push_record(&[0u8; 8]));
        assert!(!buffer.push_record(&[0u8; 1]));
    }
}
