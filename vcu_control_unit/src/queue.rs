//! Bounded inter-thread queues.
//!
//! Thin wrapper over `crossbeam::channel::bounded` with the two rules every
//! VCU thread follows: a full queue on enqueue is a warning (the item is
//! dropped, the producer never blocks), and every dequeue names its timeout
//! explicitly.

use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use tracing::warn;

/// How long a consumer is willing to wait for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Return at once if empty.
    Immediate,
    /// Wait at most this long.
    After(Duration),
    /// Block until an item arrives.
    Forever,
}

impl Timeout {
    pub const fn millis(ms: u64) -> Self {
        Self::After(Duration::from_millis(ms))
    }
}

/// Multi-producer, multi-consumer bounded FIFO.
///
/// Cloning yields another handle to the same queue.
#[derive(Debug)]
pub struct Queue<T> {
    name: &'static str,
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

impl<T> Queue<T> {
    pub fn bounded(name: &'static str, capacity: usize) -> Self {
        let (tx, rx) = channel::bounded(capacity);
        Self { name, tx, rx }
    }

    /// Push without blocking. Returns `false` (and warns) if the queue is full.
    pub fn enqueue(&self, item: T) -> bool {
        match self.tx.try_send(item) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(queue = self.name, capacity = self.capacity(), "queue full, item dropped");
                false
            }
            // Both ends live in `self`, so this only happens during teardown.
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn dequeue(&self, timeout: Timeout) -> Option<T> {
        match timeout {
            Timeout::Immediate => match self.rx.try_recv() {
                Ok(item) => Some(item),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
            },
            Timeout::After(d) => match self.rx.recv_timeout(d) {
                Ok(item) => Some(item),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
            },
            Timeout::Forever => self.rx.recv().ok(),
        }
    }

    /// Drain everything currently queued.
    pub fn drain(&self) -> impl Iterator<Item = T> + '_ {
        self.rx.try_iter()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn fifo_order() {
        let q = Queue::bounded("test", 4);
        assert!(q.enqueue(1));
        assert!(q.enqueue(2));
        assert!(q.enqueue(3));
        assert_eq!(q.dequeue(Timeout::Immediate), Some(1));
        assert_eq!(q.dequeue(Timeout::Immediate), Some(2));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let q = Queue::bounded("small", 2);
        assert!(q.enqueue('a'));
        assert!(q.enqueue('b'));
        assert!(!q.enqueue('c'));
        assert_eq!(q.len(), 2);
        assert_eq!(q.drain().collect::<Vec<_>>(), vec!['a', 'b']);
    }

    #[test]
    fn empty_immediate_returns_none() {
        let q: Queue<u8> = Queue::bounded("empty", 1);
        assert_eq!(q.dequeue(Timeout::Immediate), None);
        assert!(q.is_empty());
    }

    #[test]
    fn bounded_wait_times_out() {
        let q: Queue<u8> = Queue::bounded("wait", 1);
        let start = Instant::now();
        assert_eq!(q.dequeue(Timeout::millis(20)), None);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn clone_shares_storage() {
        let q = Queue::bounded("shared", 8);
        let producer = q.clone();
        let handle = std::thread::spawn(move || {
            producer.enqueue(42u32);
        });
        assert_eq!(q.dequeue(Timeout::Forever), Some(42));
        handle.join().unwrap();
        assert_eq!(q.capacity(), 8);
    }
}
