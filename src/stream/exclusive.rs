//! Sink that accepts a single writer
//!
//! Taps that render or inspect frames themselves only make sense with one
//! producer. A second `subscribe` is refused until the first writer is
//! released.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{same_stream, FrameSink, FrameStream, QueuedStream, SharedStream};

/// Sink allowing at most one writer subscription
pub struct ExclusiveSink<T> {
    writer: Mutex<Option<Arc<QueuedStream<T>>>>,
    capacity: usize,
}

impl<T> ExclusiveSink<T> {
    /// Create a sink whose writer buffers up to `capacity` frames
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            writer: Mutex::new(None),
            capacity: capacity.max(1),
        }
    }

    /// The current writer, for the owner to pop delivered frames from
    pub fn reader(&self) -> Option<Arc<QueuedStream<T>>> {
        self.writer.lock().clone()
    }

    pub fn is_taken(&self) -> bool {
        self.writer.lock().is_some()
    }
}

impl<T: Clone + Send + 'static> FrameSink<T> for ExclusiveSink<T> {
    fn subscribe(&self) -> Option<SharedStream<T>> {
        let mut writer = self.writer.lock();
        if writer.is_some() {
            tracing::debug!("exclusive sink already has a writer");
            return None;
        }

        let stream = Arc::new(QueuedStream::new(self.capacity));
        *writer = Some(stream.clone());
        Some(stream as SharedStream<T>)
    }

    fn unsubscribe(&self, stream: &SharedStream<T>) -> bool {
        let mut writer = self.writer.lock();
        match writer.as_ref() {
            Some(current) if same_stream(current, stream) => {
                *writer = None;
                true
            }
            _ => false,
        }
    }
}

// pass through so the sink itself can be drained like a stream
impl<T: Clone + Send + 'static> FrameStream<T> for ExclusiveSink<T> {
    fn size(&self) -> Option<usize> {
        self.reader().map(|r| r.len())
    }

    fn pop(&self) -> Option<T> {
        self.reader().and_then(|r| r.pop())
    }

    fn push(&self, frame: &T) -> bool {
        match self.reader() {
            Some(r) => r.push(frame),
            None => false,
        }
    }
}
