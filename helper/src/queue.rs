use std::sync::atomic::{AtomicI64, Ordering};

use crossbeam_queue::SegQueue;

/// Unbounded multi-producer multi-consumer FIFO with ownership handed from
/// enqueuer to dequeuer; producers never block on a consumer.
///
/// `len` is an approximate, eventually-consistent counter. Dequeuing from
/// an empty queue is a caller contract violation and panics: callers must
/// check `len()` first, or drain a batch whose size the domain guarantees,
/// such as a fixed set of outstanding asynchronous responses.
#[derive(Debug)]
pub struct LockFreeQueue<T> {
    inner: SegQueue<T>,
    len:   AtomicI64,
}

impl<T> Default for LockFreeQueue<T> {
    fn default() -> Self { Self::new() }
}

impl<T> LockFreeQueue<T> {
    pub fn new() -> Self {
        Self { inner: SegQueue::new(), len: AtomicI64::new(0) }
    }

    pub fn enqueue(&self, value: T) {
        self.inner.push(value);
        self.len.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dequeue(&self) -> T {
        let value = self
            .inner
            .pop()
            .expect("Dequeued an empty LockFreeQueue, check len() first");
        self.len.fetch_sub(1, Ordering::Relaxed);
        value
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed).max(0) as usize
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}
