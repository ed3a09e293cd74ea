//! Mutex guarded bounded frame queue
//!
//! Any thread may push or pop; the lock serializes them. Once the queue
//! holds `capacity` frames further pushes are refused, so a producer that
//! outpaces its consumer loses the newest frames instead of growing the
//! queue without bound.

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::FrameStream;
use crate::constants::LOCKED_STREAM_CAPACITY;

/// Thread-safe bounded FIFO implementing [`FrameStream`]
pub struct LockedStream<T> {
    frames: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T> LockedStream<T> {
    /// Create a stream with the default hard cap
    pub fn new() -> Self {
        Self::with_capacity(LOCKED_STREAM_CAPACITY)
    }

    /// Create a stream refusing pushes beyond `capacity` frames
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// Number of buffered frames
    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for LockedStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send> FrameStream<T> for LockedStream<T> {
    fn size(&self) -> Option<usize> {
        Some(self.len())
    }

    fn pop(&self) -> Option<T> {
        self.frames.lock().pop_front()
    }

    fn push(&self, frame: &T) -> bool {
        let mut frames = self.frames.lock();
        if frames.len() >= self.capacity {
            // hard limit
            return false;
        }
        frames.push_back(frame.clone());
        true
    }
}
