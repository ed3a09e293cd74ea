//! Lock-free lossy frame queue
//!
//! Bounded single-consumer queue for hot paths where taking a mutex per
//! frame is not wanted, e.g. a hardware callback feeding one reader.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::queue::ArrayQueue;

use super::FrameStream;

/// Lock-free bounded queue implementing [`FrameStream`]
///
/// A push into a full queue drops the new frame and is counted as an
/// overflow.
pub struct QueuedStream<T> {
    queue: ArrayQueue<T>,
    overflow_count: AtomicUsize,
}

impl<T> QueuedStream<T> {
    /// Create a new queue with the specified capacity
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            overflow_count: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Number of frames dropped because the queue was full
    pub fn overflow_count(&self) -> usize {
        self.overflow_count.load(Ordering::Relaxed)
    }

    /// Fill level between 0.0 and 1.0
    pub fn fill_level(&self) -> f32 {
        self.len() as f32 / self.capacity() as f32
    }
}

impl<T: Clone + Send> FrameStream<T> for QueuedStream<T> {
    fn size(&self) -> Option<usize> {
        Some(self.queue.len())
    }

    fn pop(&self) -> Option<T> {
        self.queue.pop()
    }

    fn push(&self, frame: &T) -> bool {
        match self.queue.push(frame.clone()) {
            Ok(()) => true,
            Err(_) => {
                self.overflow_count.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}
