use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// How many items the consumer takes off the queue per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// One item per tick. The wire envelope always carries a single post.
    #[default]
    Single,
    /// Everything currently queued, capped at `max_events` (0 = no cap).
    Drain { max_events: usize },
}

impl BatchMode {
    fn limit(&self) -> usize {
        match self {
            BatchMode::Single => 1,
            BatchMode::Drain { max_events: 0 } => usize::MAX,
            BatchMode::Drain { max_events } => *max_events,
        }
    }
}

/// Counters exposed for diagnostics and benchmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueMetrics {
    pub len: usize,
    pub pushed: u64,
    pub popped: u64,
}

/// Unbounded multi-producer / single-consumer FIFO.
///
/// Producers never block beyond the O(1) critical section in [`push`].
/// The consumer may block in [`pop`] or take a whole batch atomically with
/// [`take_batch`]; both go through the same lock, so a batch never
/// interleaves with a concurrent push.
///
/// [`push`]: EventQueue::push
/// [`pop`]: EventQueue::pop
/// [`take_batch`]: EventQueue::take_batch
pub struct EventQueue<T> {
    items: Mutex<VecDeque<T>>,
    available: Condvar,
    pushed: AtomicU64,
    popped: AtomicU64,
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            pushed: AtomicU64::new(0),
            popped: AtomicU64::new(0),
        }
    }

    pub fn push(&self, item: T) {
        {
            let mut items = self.items.lock();
            items.push_back(item);
        }
        self.pushed.fetch_add(1, Ordering::Relaxed);
        self.available.notify_one();
    }

    /// Blocks until an item is available.
    pub fn pop(&self) -> T {
        let mut items = self.items.lock();
        loop {
            if let Some(item) = items.pop_front() {
                self.popped.fetch_add(1, Ordering::Relaxed);
                return item;
            }
            self.available.wait(&mut items);
        }
    }

    pub fn try_pop(&self) -> Option<T> {
        let item = self.items.lock().pop_front();
        if item.is_some() {
            self.popped.fetch_add(1, Ordering::Relaxed);
        }
        item
    }

    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut items = self.items.lock();
        loop {
            if let Some(item) = items.pop_front() {
                self.popped.fetch_add(1, Ordering::Relaxed);
                return Some(item);
            }
            if self.available.wait_until(&mut items, deadline).timed_out() {
                let item = items.pop_front();
                if item.is_some() {
                    self.popped.fetch_add(1, Ordering::Relaxed);
                }
                return item;
            }
        }
    }

    /// Removes up to `mode`'s limit of items from the front, atomically.
    pub fn take_batch(&self, mode: BatchMode) -> Vec<T> {
        let mut items = self.items.lock();
        let count = mode.limit().min(items.len());
        let batch: Vec<T> = items.drain(..count).collect();
        drop(items);

        self.popped.fetch_add(batch.len() as u64, Ordering::Relaxed);
        batch
    }

    /// Racy snapshot: may be stale as soon as it returns.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn metrics(&self) -> QueueMetrics {
        QueueMetrics {
            len: self.len(),
            pushed: self.pushed.load(Ordering::Relaxed),
            popped: self.popped.load(Ordering::Relaxed),
        }
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for EventQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("len", &self.len())
            .field("pushed", &self.pushed.load(Ordering::Relaxed))
            .field("popped", &self.popped.load(Ordering::Relaxed))
            .finish()
    }
}
