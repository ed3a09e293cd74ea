//! Fan-out source
//!
//! Every subscriber gets its own sub-stream and every pushed frame is
//! offered to each of them. A full sub-stream only loses its own copy.

use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{same_stream, FrameSource, FrameStream, LockedStream, SharedStream};

/// Broadcasts one producer's frames to any number of readers
///
/// The producer pushes into the `MultiSource` itself. Readers are
/// created with [`FrameSource::subscribe`] and consume from their own
/// sub-stream of type `S`.
pub struct MultiSource<T, S = LockedStream<T>> {
    sub_streams: Mutex<Vec<Arc<S>>>,
    _frame: PhantomData<fn(T)>,
}

impl<T, S> MultiSource<T, S> {
    pub fn new() -> Self {
        Self {
            sub_streams: Mutex::new(Vec::new()),
            _frame: PhantomData,
        }
    }

    /// Number of currently subscribed readers
    pub fn subscriber_count(&self) -> usize {
        self.sub_streams.lock().len()
    }
}

impl<T, S> Default for MultiSource<T, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> FrameSource<T> for MultiSource<T, S>
where
    T: 'static,
    S: FrameStream<T> + Default + 'static,
{
    fn subscribe(&self) -> Option<SharedStream<T>> {
        let sub = Arc::new(S::default());
        self.sub_streams.lock().push(sub.clone());
        Some(sub as SharedStream<T>)
    }

    fn unsubscribe(&self, stream: &SharedStream<T>) -> bool {
        let mut sub_streams = self.sub_streams.lock();
        match sub_streams.iter().position(|s| same_stream(s, stream)) {
            Some(index) => {
                sub_streams.remove(index);
                true
            }
            None => false,
        }
    }
}

impl<T, S> FrameStream<T> for MultiSource<T, S>
where
    T: 'static,
    S: FrameStream<T> + 'static,
{
    fn pop(&self) -> Option<T> {
        debug_assert!(false, "tried to pop from a fan-out source");
        None
    }

    /// Returns true if there are readers, even if some of them are full
    fn push(&self, frame: &T) -> bool {
        let sub_streams = self.sub_streams.lock();
        for sub in sub_streams.iter() {
            let _ = sub.push(frame);
        }
        !sub_streams.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out_isolation() {
        let source: MultiSource<u32> = MultiSource::new();
        let readers: Vec<_> = (0..3).map(|_| source.subscribe().unwrap()).collect();
        assert_eq!(source.subscriber_count(), 3);

        assert!(source.push(&42));

        for reader in &readers {
            assert_eq!(reader.pop(), Some(42));
            assert_eq!(reader.pop(), None);
        }
    }

    #[test]
    fn test_push_without_readers() {
        let source: MultiSource<u32> = MultiSource::new();
        assert!(!source.push(&1));
    }

    #[test]
    fn test_unsubscribe_by_identity() {
        let source: MultiSource<u32> = MultiSource::new();
        let a = source.subscribe().unwrap();
        let b = source.subscribe().unwrap();

        assert!(source.unsubscribe(&a));
        assert!(!source.unsubscribe(&a));
        assert_eq!(source.subscriber_count(), 1);

        source.push(&7);
        assert_eq!(a.pop(), None);
        assert_eq!(b.pop(), Some(7));

        // a stream from elsewhere is not ours to remove
        let foreign: SharedStream<u32> = Arc::new(LockedStream::new());
        assert!(!source.unsubscribe(&foreign));
    }

    #[derive(Default)]
    struct TinyStream(LockedStream<u32>);

    impl FrameStream<u32> for TinyStream {
        fn pop(&self) -> Option<u32> {
            self.0.pop()
        }

        fn push(&self, frame: &u32) -> bool {
            self.0.is_empty() && self.0.push(frame)
        }
    }

    #[test]
    fn test_full_reader_does_not_starve_others() {
        let source: MultiSource<u32, TinyStream> = MultiSource::new();
        let slow = source.subscribe().unwrap();
        let fast = source.subscribe().unwrap();

        for i in 0..3 {
            // still true, the full reader is still believed in
            assert!(source.push(&i));
            assert_eq!(fast.pop(), Some(i));
        }

        assert_eq!(slow.pop(), Some(0));
        assert_eq!(slow.pop(), None);
    }
}
