//! Frame stream contract and its thread-safe implementations
//!
//! A [`FrameStream`] moves values of one payload type between threads. It
//! never blocks: `pop` returns `None` when nothing is buffered and `push`
//! drops the frame when the stream cannot take it.
//!
//! Sources and sinks hand out streams through `subscribe`. The returned
//! [`SharedStream`] is both the data path and the handle that identifies
//! the subscription when it is later given back to `unsubscribe`.

pub mod exclusive;
pub mod locked;
pub mod multi;
pub mod queued;

pub use exclusive::ExclusiveSink;
pub use locked::LockedStream;
pub use multi::MultiSource;
pub use queued::QueuedStream;

use std::sync::Arc;

/// A non-blocking stream of frames of type `T`
pub trait FrameStream<T>: Send + Sync {
    /// Approximate number of buffered frames, `None` if unknown
    fn size(&self) -> Option<usize> {
        None
    }

    /// Remove and return the oldest buffered frame
    fn pop(&self) -> Option<T>;

    /// Offer a frame to the stream
    ///
    /// Returns true if at least one consumer could plausibly receive it.
    /// This is not a delivery guarantee.
    fn push(&self, frame: &T) -> bool;
}

/// Shared handle to a subscribed stream
pub type SharedStream<T> = Arc<dyn FrameStream<T>>;

/// Capability of an object that produces frames of type `T`
///
/// Every subscriber gets its own reader stream.
pub trait FrameSource<T>: Send + Sync {
    /// Create a new reader, `None` if the source refuses more readers
    fn subscribe(&self) -> Option<SharedStream<T>>;

    /// Release a reader obtained from `subscribe`
    fn unsubscribe(&self, stream: &SharedStream<T>) -> bool;
}

/// Capability of an object that consumes frames of type `T`
pub trait FrameSink<T>: Send + Sync {
    /// Create a new writer, `None` if the sink refuses more writers
    fn subscribe(&self) -> Option<SharedStream<T>>;

    /// Release a writer obtained from `subscribe`
    fn unsubscribe(&self, stream: &SharedStream<T>) -> bool;
}

/// Payload type that can flow through the stream manager
///
/// Timestamps and byte sizes are optional. Without a timestamp the
/// manager measures frame intervals with the wall clock, without a byte
/// size it skips rate accounting.
pub trait Frame: Clone + Send + 'static {
    /// Timestamp ticks per second
    const TIMESTAMP_DIVISION: u64 = 1_000_000;

    /// Monotonic timestamp in `TIMESTAMP_DIVISION` ticks per second
    fn timestamp(&self) -> Option<u64> {
        None
    }

    /// Payload size in bytes
    fn byte_size(&self) -> Option<u64> {
        None
    }
}

/// Runtime type tag used to match sources with sinks
pub fn frame_type_name<T: 'static>() -> &'static str {
    std::any::type_name::<T>()
}

/// Whether two handles refer to the same stream instance
pub fn same_stream<T: ?Sized, U: ?Sized>(a: &Arc<T>, b: &Arc<U>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
