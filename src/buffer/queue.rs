use super::error::BufferError;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Prevent excessive memory allocation
pub const MAX_CAPACITY: usize = 100_000_000;

/// Point-in-time view of queue activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueMetrics {
    pub capacity: usize,
    pub len: usize,
    pub enqueued: u64,
    pub dequeued: u64,
    pub peak_len: usize,
    /// Number of times a producer found the queue full and had to wait.
    pub producer_waits: u64,
}

impl QueueMetrics {
    pub fn fill_ratio(&self) -> f64 {
        self.len as f64 / self.capacity as f64
    }
}

/// Fixed-capacity blocking FIFO.
///
/// `enqueue` waits while the queue is full and `dequeue` waits while it is
/// empty; nothing is ever dropped by the hot path. The lock only guards the
/// pending items, activity counters are atomics read without it.
pub struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
    enqueued: AtomicU64,
    dequeued: AtomicU64,
    producer_waits: AtomicU64,
    current_len: AtomicUsize,
    peak_len: AtomicUsize,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(BufferError::InvalidCapacity(capacity));
        }

        Ok(Self {
            items: Mutex::new(VecDeque::with_capacity(capacity.min(65_536))),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            enqueued: AtomicU64::new(0),
            dequeued: AtomicU64::new(0),
            producer_waits: AtomicU64::new(0),
            current_len: AtomicUsize::new(0),
            peak_len: AtomicUsize::new(0),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.current_len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `item`, blocking while the queue is full.
    pub fn enqueue(&self, item: T) {
        let mut items = self.items.lock();
        if items.len() >= self.capacity {
            self.producer_waits.fetch_add(1, Ordering::Relaxed);
            while items.len() >= self.capacity {
                self.not_full.wait(&mut items);
            }
        }
        self.push_locked(&mut items, item);
        drop(items);
        self.not_empty.notify_one();
    }

    /// Append `item` only if there is room right now.
    ///
    /// Hands the item back when the queue is full.
    pub fn try_enqueue(&self, item: T) -> Result<(), T> {
        let mut items = self.items.lock();
        if items.len() >= self.capacity {
            return Err(item);
        }
        self.push_locked(&mut items, item);
        drop(items);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove and return the oldest item, blocking while the queue is empty.
    pub fn dequeue(&self) -> T {
        let mut items = self.items.lock();
        let item = loop {
            if let Some(item) = items.pop_front() {
                break item;
            }
            self.not_empty.wait(&mut items);
        };
        self.current_len.store(items.len(), Ordering::Release);
        drop(items);

        self.dequeued.fetch_add(1, Ordering::Relaxed);
        self.not_full.notify_one();
        item
    }

    /// Drop every pending item and wake all blocked producers.
    ///
    /// Only meant for shutdown, after the stop signal has been raised.
    pub fn discard_pending(&self) -> usize {
        let mut items = self.items.lock();
        let discarded = items.len();
        items.clear();
        self.current_len.store(0, Ordering::Release);
        drop(items);

        self.not_full.notify_all();
        discarded
    }

    pub fn metrics(&self) -> QueueMetrics {
        QueueMetrics {
            capacity: self.capacity,
            len: self.len(),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dequeued: self.dequeued.load(Ordering::Relaxed),
            peak_len: self.peak_len.load(Ordering::Relaxed),
            producer_waits: self.producer_waits.load(Ordering::Relaxed),
        }
    }

    fn push_locked(&self, items: &mut VecDeque<T>, item: T) {
        items.push_back(item);
        let len = items.len();
        self.current_len.store(len, Ordering::Release);
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        self.update_peak_len(len);
    }

    // Helper method to update peak length atomically
    fn update_peak_len(&self, current: usize) {
        let mut peak = self.peak_len.load(Ordering::Relaxed);
        while current > peak {
            match self.peak_len.compare_exchange_weak(
                peak,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(x) => peak = x,
            }
        }
    }
}

impl<T> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("enqueued", &self.enqueued.load(Ordering::Relaxed))
            .field("dequeued", &self.dequeued.load(Ordering::Relaxed))
            .field("peak_len", &self.peak_len.load(Ordering::Relaxed))
            .finish()
    }
}
