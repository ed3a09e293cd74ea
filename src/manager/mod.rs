//! Stream manager
//!
//! Owns every connection between a source and a sink and drives them:
//!
//! ```text
//!   ObjectStore ──events──► StreamManager ──tick()──► main thread pumps
//!        │                       │
//!        │ capabilities          ├── Connection (worker) ──► pump loop
//!        ▼                       └── Connection (main)
//!   FrameSource::subscribe ──reader──► Pump ──writer──► FrameSink::subscribe
//! ```
//!
//! All manager state lives on the thread that calls [`StreamManager::tick`].
//! Worker threads only touch their own pump, the stop/finished flags and
//! the connection metrics.

pub mod connection;
pub mod descriptor;

pub use connection::{ConnectionInfo, ConnectionMetrics, ConnectionState, MetricsSnapshot};
pub use descriptor::{ConnectFn, SinkDescriptor, SourceDescriptor};

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::config::ManagerConfig;
use crate::error::{ConnectError, Side};
use crate::registry::{ObjectEvent, ObjectId, ObjectStore};
use crate::stream::{frame_type_name, Frame, FrameSink, FrameSource};
use connection::{Connection, Pump};

/// Connects sources to sinks and keeps the links alive
pub struct StreamManager {
    store: ObjectStore,
    events: Receiver<ObjectEvent>,
    config: ManagerConfig,
    connections: Vec<Connection>,
    /// Frame type tag -> current default source
    default_sources: HashMap<&'static str, ObjectId>,
    /// Frame type tag -> current default sink
    default_sinks: HashMap<&'static str, ObjectId>,
    /// Objects whose construction has been handled
    constructed: HashSet<ObjectId>,
}

impl StreamManager {
    pub fn new(store: ObjectStore) -> Self {
        Self::with_config(store, ManagerConfig::default())
    }

    /// Objects spawned before this call are not seen as constructed
    pub fn with_config(store: ObjectStore, config: ManagerConfig) -> Self {
        let events = store.events();
        Self {
            store,
            events,
            config,
            connections: Vec::new(),
            default_sources: HashMap::new(),
            default_sinks: HashMap::new(),
            constructed: HashSet::new(),
        }
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Connect the source of `src` to the sink of `sink`
    ///
    /// With `threaded` the connection is pumped by its own worker thread,
    /// otherwise by [`StreamManager::tick`]. On error nothing changes.
    pub fn connect(
        &mut self,
        src: ObjectId,
        sink: ObjectId,
        threaded: bool,
    ) -> Result<(), ConnectError> {
        self.check_connectable(src, sink)?;

        let source_desc = self
            .store
            .source_descriptor(src)
            .ok_or(ConnectError::NotASource(src))?;
        let sink_desc = self
            .store
            .sink_descriptor(sink)
            .ok_or(ConnectError::NotASink(sink))?;

        if source_desc.frame_type() != sink_desc.frame_type() {
            return Err(ConnectError::FrameTypeMismatch {
                source_type: source_desc.frame_type(),
                sink_type: sink_desc.frame_type(),
            });
        }

        source_desc.connect(self, src, sink, threaded)
    }

    /// Connect with a statically known frame type
    ///
    /// This is what [`StreamManager::connect`] dispatches to through the
    /// source descriptor.
    pub fn connect_typed<T: Frame>(
        &mut self,
        src: ObjectId,
        sink: ObjectId,
        threaded: bool,
    ) -> Result<(), ConnectError> {
        self.check_connectable(src, sink)?;

        let source = self
            .store
            .source_capability::<T>(src)
            .ok_or(ConnectError::NotASource(src))?;
        let sink_cap = self
            .store
            .sink_capability::<T>(sink)
            .ok_or(ConnectError::NotASink(sink))?;

        let Some(reader) = source.subscribe() else {
            tracing::debug!("source {} refused a reader", src);
            return Err(ConnectError::SubscriptionFailed {
                endpoint: src,
                side: Side::Source,
            });
        };
        let Some(writer) = sink_cap.subscribe() else {
            tracing::debug!("sink {} refused a writer", sink);
            source.unsubscribe(&reader);
            return Err(ConnectError::SubscriptionFailed {
                endpoint: sink,
                side: Side::Sink,
            });
        };

        let metrics = Arc::new(ConnectionMetrics::default());
        let mut pump = Pump::new(
            reader.clone(),
            writer.clone(),
            metrics.clone(),
            self.config.pump_batch,
            self.config.interval_ema_weight,
        );

        // the capabilities may already be gone when the connection is reaped
        let weak_source: Weak<dyn FrameSource<T>> = Arc::downgrade(&source);
        let weak_sink: Weak<dyn FrameSink<T>> = Arc::downgrade(&sink_cap);
        let unsubscribe = move || {
            if let Some(source) = weak_source.upgrade() {
                source.unsubscribe(&reader);
            }
            if let Some(sink) = weak_sink.upgrade() {
                sink.unsubscribe(&writer);
            }
        };

        let mut connection = Connection::new(
            src,
            sink,
            frame_type_name::<T>(),
            Box::new(move || pump.run()),
            Box::new(unsubscribe),
            metrics,
        );

        if threaded {
            if let Err(e) = connection.spawn_worker(self.config.worker_sleep()) {
                // dropping the connection releases both subscriptions
                drop(connection);
                return Err(ConnectError::WorkerSpawn(e.to_string()));
            }
        }

        connection.mark_established();
        self.connections.push(connection);
        Ok(())
    }

    fn check_connectable(&self, src: ObjectId, sink: ObjectId) -> Result<(), ConnectError> {
        // stopping connections still count until they are reaped
        if self
            .connections
            .iter()
            .any(|con| con.source == src && con.sink == sink)
        {
            return Err(ConnectError::AlreadyConnected { src, sink });
        }
        if !self.store.contains(src) {
            return Err(ConnectError::ObjectNotFound(src));
        }
        if !self.store.contains(sink) {
            return Err(ConnectError::ObjectNotFound(sink));
        }
        Ok(())
    }

    /// Ask the `src -> sink` connection to stop
    ///
    /// The connection is removed by a later [`StreamManager::tick`].
    pub fn disconnect(&mut self, src: ObjectId, sink: ObjectId) -> bool {
        match self
            .connections
            .iter()
            .find(|con| con.source == src && con.sink == sink)
        {
            Some(con) => {
                con.request_stop();
                true
            }
            None => false,
        }
    }

    /// Ask every connection touching `id` to stop
    pub fn disconnect_all(&mut self, id: ObjectId) -> bool {
        let mut found = false;
        for con in self
            .connections
            .iter()
            .filter(|con| con.source == id || con.sink == id)
        {
            con.request_stop();
            found = true;
        }
        found
    }

    /// Handle lifecycle events, pump main thread connections and reap
    /// stopped ones
    ///
    /// Returns how soon the host should tick again.
    pub fn tick(&mut self, _dt: Duration) -> Duration {
        self.process_events();

        for con in &self.connections {
            if con.is_stopping() {
                continue;
            }
            if con.is_threaded() && con.is_finished() {
                tracing::warn!("pump worker {} -> {} exited unexpectedly", con.source, con.sink);
                con.request_stop();
            } else if !self.store.contains(con.source) || !self.store.contains(con.sink) {
                tracing::warn!(
                    "endpoint of {} -> {} vanished without notification",
                    con.source,
                    con.sink
                );
                con.request_stop();
            }
        }

        let mut hint: Option<Duration> = None;
        for con in &mut self.connections {
            if con.is_threaded() || con.is_stopping() {
                continue;
            }
            con.pump();
            if let Some(interval) = con.interval_hint() {
                hint = Some(hint.map_or(interval, |h| h.min(interval)));
            }
        }

        // dropping joins the worker and runs the unsubscribe closure
        self.connections
            .retain(|con| !(con.is_stopping() && con.is_finished()));

        hint.unwrap_or_else(|| self.config.idle_tick_interval())
            .max(self.config.min_tick_interval())
    }

    /// Drain pending lifecycle events from the store
    pub fn process_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(&event);
        }
    }

    /// React to a lifecycle event
    ///
    /// For hosts that deliver events themselves instead of relying on
    /// [`StreamManager::tick`]. Events from this manager's own store are
    /// drained by `tick` as well; a repeated `Constructed` for the same
    /// object is ignored, a repeated `Destroyed` is harmless.
    pub fn handle_event(&mut self, event: &ObjectEvent) {
        tracing::debug!("handling {:?}", event);
        match *event {
            ObjectEvent::Constructed(id) => self.on_constructed(id),
            ObjectEvent::Destroyed(id) => self.on_destroyed(id),
        }
    }

    fn on_constructed(&mut self, id: ObjectId) {
        // already destroyed again before we got to it
        let Some(tags) = self.store.tags(id) else {
            return;
        };
        if !self.constructed.insert(id) {
            tracing::debug!("construction of {} already handled", id);
            return;
        }
        let source = self.store.source_descriptor(id);
        let sink = self.store.sink_descriptor(id);

        if tags.default_target {
            if let Some(desc) = &source {
                self.default_sources.insert(desc.frame_type(), id);
                tracing::info!("default {} source is now {} ({})", desc.frame_type(), id, desc.name());
            }
            if let Some(desc) = &sink {
                self.default_sinks.insert(desc.frame_type(), id);
                tracing::info!("default {} sink is now {} ({})", desc.frame_type(), id, desc.name());
            }
        }

        if !tags.connect_to_default {
            return;
        }
        let threaded = self.config.auto_connect_threaded;

        if let Some(desc) = &source {
            match self.default_sinks.get(desc.frame_type()).copied() {
                Some(target) if target != id => {
                    if let Err(e) = self.connect(id, target, threaded) {
                        tracing::warn!("auto connect {} -> {} failed: {}", id, target, e);
                    }
                }
                Some(_) => {}
                None => tracing::debug!("no default {} sink for {}", desc.frame_type(), id),
            }
        }

        if let Some(desc) = &sink {
            match self.default_sources.get(desc.frame_type()).copied() {
                Some(target) if target != id => {
                    if let Err(e) = self.connect(target, id, threaded) {
                        tracing::warn!("auto connect {} -> {} failed: {}", target, id, e);
                    }
                }
                Some(_) => {}
                None => tracing::debug!("no default {} source for {}", desc.frame_type(), id),
            }
        }
    }

    fn on_destroyed(&mut self, id: ObjectId) {
        self.constructed.remove(&id);
        self.disconnect_all(id);

        self.default_sources.retain(|tag, default| {
            let keep = *default != id;
            if !keep {
                tracing::info!("default {} source {} destroyed", tag, id);
            }
            keep
        });
        self.default_sinks.retain(|tag, default| {
            let keep = *default != id;
            if !keep {
                tracing::info!("default {} sink {} destroyed", tag, id);
            }
            keep
        });
    }

    /// Status of every connection, including ones not yet reaped
    pub fn connections(&self) -> Vec<ConnectionInfo> {
        self.connections.iter().map(Connection::info).collect()
    }

    /// Whether a running `src -> sink` connection exists
    pub fn is_connected(&self, src: ObjectId, sink: ObjectId) -> bool {
        self.connections
            .iter()
            .any(|con| con.source == src && con.sink == sink && !con.is_stopping())
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Live metrics of the `src -> sink` connection
    pub fn connection_metrics(
        &self,
        src: ObjectId,
        sink: ObjectId,
    ) -> Option<Arc<ConnectionMetrics>> {
        self.connections
            .iter()
            .find(|con| con.source == src && con.sink == sink)
            .map(|con| con.metrics().clone())
    }

    /// Current default source for a frame type tag
    pub fn default_source(&self, frame_type: &str) -> Option<ObjectId> {
        self.default_sources.get(frame_type).copied()
    }

    /// Current default sink for a frame type tag
    pub fn default_sink(&self, frame_type: &str) -> Option<ObjectId> {
        self.default_sinks.get(frame_type).copied()
    }
}

impl Drop for StreamManager {
    fn drop(&mut self) {
        // stop everything first so the workers wind down in parallel
        for con in &self.connections {
            con.request_stop();
        }
        self.connections.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFrame;
    use crate::registry::ObjectSpec;
    use crate::stream::{ExclusiveSink, FrameStream, MultiSource, SharedStream};
    use crate::video::VideoFrame;
    use bytes::Bytes;
    use std::thread;
    use std::time::Instant;

    struct Fixture {
        store: ObjectStore,
        manager: StreamManager,
    }

    impl Fixture {
        fn new() -> Self {
            let store = ObjectStore::new();
            let manager = StreamManager::new(store.clone());
            Self { store, manager }
        }

        fn audio_source(&self) -> (ObjectId, Arc<MultiSource<AudioFrame>>) {
            let source = Arc::new(MultiSource::<AudioFrame>::new());
            let id = self
                .store
                .spawn(ObjectSpec::new().with_source("tone", source.clone()));
            (id, source)
        }

        fn audio_sink(&self) -> (ObjectId, Arc<ExclusiveSink<AudioFrame>>) {
            let sink = Arc::new(ExclusiveSink::<AudioFrame>::new(256));
            let id = self
                .store
                .spawn(ObjectSpec::new().with_sink("meter", sink.clone()));
            (id, sink)
        }
    }

    fn tone(first: i16) -> AudioFrame {
        AudioFrame::new(48_000, 1, (first..first + 4).collect())
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        cond()
    }

    #[test]
    fn test_duplicate_connect() {
        let mut fx = Fixture::new();
        let (src, _) = fx.audio_source();
        let (sink, _) = fx.audio_sink();

        assert!(fx.manager.connect(src, sink, false).is_ok());
        assert_eq!(
            fx.manager.connect(src, sink, false),
            Err(ConnectError::AlreadyConnected { src, sink })
        );
        assert_eq!(fx.manager.connection_count(), 1);
    }

    #[test]
    fn test_frame_type_mismatch() {
        let mut fx = Fixture::new();
        let (src, source) = fx.audio_source();
        let sink = fx.store.spawn(
            ObjectSpec::new().with_sink("tap", Arc::new(ExclusiveSink::<VideoFrame>::new(4))),
        );

        let err = fx.manager.connect(src, sink, false).unwrap_err();
        assert!(matches!(err, ConnectError::FrameTypeMismatch { .. }));
        assert!(err.is_rejected());
        assert_eq!(fx.manager.connection_count(), 0);
        assert_eq!(source.subscriber_count(), 0);
    }

    #[test]
    fn test_missing_and_wrong_role() {
        let mut fx = Fixture::new();
        let (src, _) = fx.audio_source();
        let (sink, _) = fx.audio_sink();

        let gone = fx.audio_source().0;
        fx.store.destroy(gone);

        assert_eq!(
            fx.manager.connect(gone, sink, false),
            Err(ConnectError::ObjectNotFound(gone))
        );
        assert_eq!(
            fx.manager.connect(sink, src, false),
            Err(ConnectError::NotASource(sink))
        );
        assert_eq!(
            fx.manager.connect(src, src, false),
            Err(ConnectError::NotASink(src))
        );
        assert_eq!(
            fx.manager.connect_typed::<VideoFrame>(src, sink, false),
            Err(ConnectError::NotASource(src))
        );
    }

    #[test]
    fn test_refused_sink_rolls_back_reader() {
        let mut fx = Fixture::new();
        let (first, source) = fx.audio_source();
        let (second, second_source) = fx.audio_source();
        let (sink, _) = fx.audio_sink();

        fx.manager.connect(first, sink, false).unwrap();
        assert_eq!(source.subscriber_count(), 1);

        let err = fx.manager.connect(second, sink, false).unwrap_err();
        assert_eq!(
            err,
            ConnectError::SubscriptionFailed {
                endpoint: sink,
                side: Side::Sink
            }
        );
        assert!(!err.is_rejected());
        assert_eq!(fx.manager.connection_count(), 1);
        assert_eq!(second_source.subscriber_count(), 0);
        assert_eq!(source.subscriber_count(), 1);
    }

    #[test]
    fn test_rollback_leaves_no_reader() {
        let mut fx = Fixture::new();
        let (src, source) = fx.audio_source();
        let (sink, exclusive) = fx.audio_sink();

        let _taken = exclusive.subscribe().unwrap();
        assert!(fx.manager.connect(src, sink, false).is_err());
        assert_eq!(source.subscriber_count(), 0);
    }

    #[test]
    fn test_main_thread_pump_preserves_order() {
        let mut fx = Fixture::new();
        let (src, source) = fx.audio_source();
        let (sink, exclusive) = fx.audio_sink();

        fx.manager.connect(src, sink, false).unwrap();
        for i in 0..10 {
            source.push(&tone(i * 4));
        }
        fx.manager.tick(Duration::ZERO);

        let reader = exclusive.reader().unwrap();
        let firsts: Vec<i16> = std::iter::from_fn(|| reader.pop())
            .map(|frame| frame.samples[0])
            .collect();
        assert_eq!(firsts, (0..10).map(|i| i * 4).collect::<Vec<_>>());

        let metrics = fx.manager.connection_metrics(src, sink).unwrap();
        assert_eq!(metrics.frame_count(), 10);
        assert_eq!(metrics.byte_count(), 80);
    }

    #[test]
    fn test_threaded_connection_delivers() {
        let mut fx = Fixture::new();
        let (src, source) = fx.audio_source();
        let (sink, exclusive) = fx.audio_sink();

        fx.manager.connect(src, sink, true).unwrap();
        source.push(&tone(7));

        let reader = exclusive.reader().unwrap();
        let mut received = None;
        assert!(wait_until(|| {
            received = reader.pop();
            received.is_some()
        }));
        assert_eq!(received.unwrap().samples[0], 7);

        let info = &fx.manager.connections()[0];
        assert!(info.threaded);
        assert_eq!(info.state, ConnectionState::Running);
    }

    #[test]
    fn test_disconnect_then_tick_removes() {
        let mut fx = Fixture::new();
        let (src, source) = fx.audio_source();
        let (sink, exclusive) = fx.audio_sink();

        fx.manager.connect(src, sink, true).unwrap();
        assert!(fx.manager.is_connected(src, sink));

        assert!(fx.manager.disconnect(src, sink));
        assert!(!fx.manager.is_connected(src, sink));
        assert!(!fx.manager.disconnect(sink, src));

        assert!(wait_until(|| {
            fx.manager.tick(Duration::ZERO);
            fx.manager.connection_count() == 0
        }));
        assert_eq!(source.subscriber_count(), 0);
        assert!(!exclusive.is_taken());

        // a fresh connect is allowed once reaped
        assert!(fx.manager.connect(src, sink, false).is_ok());
    }

    #[test]
    fn test_destroyed_endpoint_tears_down() {
        let mut fx = Fixture::new();
        let (src, source) = fx.audio_source();
        let (sink, _) = fx.audio_sink();
        let (other_sink, other) = fx.audio_sink();

        fx.manager.connect(src, sink, true).unwrap();
        fx.manager.connect(src, other_sink, false).unwrap();
        assert_eq!(source.subscriber_count(), 2);

        fx.store.destroy(sink);
        assert!(wait_until(|| {
            fx.manager.tick(Duration::ZERO);
            fx.manager.connection_count() == 1
        }));
        assert!(fx.manager.is_connected(src, other_sink));
        assert_eq!(source.subscriber_count(), 1);

        for i in 0..3 {
            source.push(&tone(i));
        }
        fx.manager.tick(Duration::ZERO);
        let metrics = fx.manager.connection_metrics(src, other_sink).unwrap();
        let delivered = other.reader().unwrap();
        assert_eq!(metrics.frame_count(), 3);
        assert_eq!(delivered.len(), 3);

        fx.store.destroy(src);
        fx.manager.tick(Duration::ZERO);
        assert_eq!(fx.manager.connection_count(), 0);
        assert_eq!(source.subscriber_count(), 0);
        assert!(!other.is_taken());

        assert!(!source.push(&tone(100)));
        fx.manager.tick(Duration::ZERO);
        assert_eq!(metrics.frame_count(), 3);
        assert_eq!(delivered.len(), 3);
    }

    /// Source whose reader panics on the first pop
    struct PanickingSource;

    struct PanickingStream;

    impl FrameStream<AudioFrame> for PanickingStream {
        fn pop(&self) -> Option<AudioFrame> {
            panic!("reader failed");
        }

        fn push(&self, _frame: &AudioFrame) -> bool {
            false
        }
    }

    impl FrameSource<AudioFrame> for PanickingSource {
        fn subscribe(&self) -> Option<SharedStream<AudioFrame>> {
            Some(Arc::new(PanickingStream) as SharedStream<AudioFrame>)
        }

        fn unsubscribe(&self, _stream: &SharedStream<AudioFrame>) -> bool {
            true
        }
    }

    #[test]
    fn test_panicked_worker_is_reaped() {
        let mut fx = Fixture::new();
        let src = fx
            .store
            .spawn(ObjectSpec::new().with_source("broken", Arc::new(PanickingSource)));
        let (sink, exclusive) = fx.audio_sink();

        fx.manager.connect(src, sink, true).unwrap();
        assert!(fx.manager.disconnect(src, sink));

        assert!(wait_until(|| {
            fx.manager.tick(Duration::ZERO);
            fx.manager.connection_count() == 0
        }));
        assert!(!exclusive.is_taken());
        assert!(fx.manager.connect(src, sink, false).is_ok());
    }

    #[test]
    fn test_dead_worker_stops_without_disconnect() {
        let mut fx = Fixture::new();
        let src = fx
            .store
            .spawn(ObjectSpec::new().with_source("broken", Arc::new(PanickingSource)));
        let (sink, exclusive) = fx.audio_sink();

        fx.manager.connect(src, sink, true).unwrap();
        assert!(wait_until(|| {
            fx.manager.tick(Duration::ZERO);
            fx.manager.connection_count() == 0
        }));
        assert!(!exclusive.is_taken());
    }

    #[test]
    fn test_default_wiring() {
        let mut fx = Fixture::new();
        let tag = frame_type_name::<AudioFrame>();

        let speaker = Arc::new(ExclusiveSink::<AudioFrame>::new(16));
        let sink = fx
            .store
            .spawn(ObjectSpec::new().with_sink("speaker", speaker.clone()).default_target());
        let mic = Arc::new(MultiSource::<AudioFrame>::new());
        let src = fx
            .store
            .spawn(ObjectSpec::new().with_source("mic", mic.clone()).connect_to_default());

        fx.manager.tick(Duration::ZERO);

        assert_eq!(fx.manager.default_sink(tag), Some(sink));
        assert_eq!(fx.manager.default_source(tag), None);
        assert!(fx.manager.is_connected(src, sink));
        assert!(speaker.is_taken());
        assert_eq!(mic.subscriber_count(), 1);
    }

    #[test]
    fn test_sink_connects_to_default_source() {
        let mut fx = Fixture::new();
        let tag = frame_type_name::<AudioFrame>();

        let mic = Arc::new(MultiSource::<AudioFrame>::new());
        let src = fx
            .store
            .spawn(ObjectSpec::new().with_source("mic", mic.clone()).default_target());
        let speaker = Arc::new(ExclusiveSink::<AudioFrame>::new(16));
        let sink = fx.store.spawn(
            ObjectSpec::new()
                .with_sink("speaker", speaker.clone())
                .connect_to_default(),
        );

        fx.manager.tick(Duration::ZERO);

        assert_eq!(fx.manager.default_source(tag), Some(src));
        assert_eq!(fx.manager.default_sink(tag), None);
        assert!(fx.manager.is_connected(src, sink));
        assert!(speaker.is_taken());
        assert_eq!(mic.subscriber_count(), 1);
    }

    #[test]
    fn test_own_default_is_not_self_connected() {
        let mut fx = Fixture::new();
        let tag = frame_type_name::<AudioFrame>();

        let loopback = fx.store.spawn(
            ObjectSpec::new()
                .with_source("loopback", Arc::new(MultiSource::<AudioFrame>::new()))
                .with_sink("loopback", Arc::new(ExclusiveSink::<AudioFrame>::new(4)))
                .default_target()
                .connect_to_default(),
        );

        fx.manager.tick(Duration::ZERO);

        assert_eq!(fx.manager.default_source(tag), Some(loopback));
        assert_eq!(fx.manager.default_sink(tag), Some(loopback));
        assert_eq!(fx.manager.connection_count(), 0);
    }

    #[test]
    fn test_repeated_construct_event_is_ignored() {
        let mut fx = Fixture::new();
        let sink = fx.store.spawn(
            ObjectSpec::new()
                .with_sink("speaker", Arc::new(ExclusiveSink::<AudioFrame>::new(4)))
                .default_target(),
        );
        let mic = Arc::new(MultiSource::<AudioFrame>::new());
        let src = fx
            .store
            .spawn(ObjectSpec::new().with_source("mic", mic.clone()).connect_to_default());

        fx.manager.tick(Duration::ZERO);
        fx.manager.handle_event(&ObjectEvent::Constructed(src));
        fx.manager.handle_event(&ObjectEvent::Constructed(sink));
        fx.manager.tick(Duration::ZERO);

        assert_eq!(fx.manager.connection_count(), 1);
        assert_eq!(mic.subscriber_count(), 1);
    }

    #[test]
    fn test_connect_to_default_without_default() {
        let mut fx = Fixture::new();
        fx.store.spawn(
            ObjectSpec::new()
                .with_source("mic", Arc::new(MultiSource::<AudioFrame>::new()))
                .connect_to_default(),
        );

        fx.manager.tick(Duration::ZERO);
        assert_eq!(fx.manager.connection_count(), 0);
    }

    #[test]
    fn test_destroyed_default_is_not_replaced() {
        let mut fx = Fixture::new();
        let tag = frame_type_name::<AudioFrame>();

        let first = fx.store.spawn(
            ObjectSpec::new()
                .with_sink("first", Arc::new(ExclusiveSink::<AudioFrame>::new(4)))
                .default_target(),
        );
        let second = fx.store.spawn(
            ObjectSpec::new()
                .with_sink("second", Arc::new(ExclusiveSink::<AudioFrame>::new(4)))
                .default_target(),
        );
        fx.manager.tick(Duration::ZERO);
        // last registration wins
        assert_eq!(fx.manager.default_sink(tag), Some(second));

        let src = fx.store.spawn(
            ObjectSpec::new()
                .with_source("mic", Arc::new(MultiSource::<AudioFrame>::new()))
                .connect_to_default(),
        );
        fx.manager.tick(Duration::ZERO);
        assert!(fx.manager.is_connected(src, second));

        fx.store.destroy(second);
        fx.manager.tick(Duration::ZERO);
        fx.manager.tick(Duration::ZERO);

        assert_eq!(fx.manager.default_sink(tag), None);
        assert!(!fx.manager.is_connected(src, first));
        assert!(fx.store.contains(first));
    }

    #[test]
    fn test_idle_hint_fallback() {
        let mut fx = Fixture::new();
        assert_eq!(fx.manager.tick(Duration::ZERO), Duration::from_secs(2));

        let (src, _) = fx.audio_source();
        let (sink, _) = fx.audio_sink();
        fx.manager.connect(src, sink, false).unwrap();
        assert_eq!(fx.manager.tick(Duration::ZERO), Duration::from_secs(2));
    }

    #[test]
    fn test_hint_follows_frame_interval() {
        let mut fx = Fixture::new();
        let source = Arc::new(MultiSource::<VideoFrame>::new());
        let src = fx
            .store
            .spawn(ObjectSpec::new().with_source("camera", source.clone()));
        let sink = fx.store.spawn(
            ObjectSpec::new().with_sink("tap", Arc::new(ExclusiveSink::<VideoFrame>::new(64))),
        );
        fx.manager.connect(src, sink, false).unwrap();

        for i in 0..8 {
            source.push(&VideoFrame::new(i * 10_000, 4, 4, Bytes::from_static(&[0; 16])));
        }
        let hint = fx.manager.tick(Duration::ZERO);
        assert!((hint.as_secs_f32() - 0.01).abs() < 1e-4, "hint {:?}", hint);
    }

    #[test]
    fn test_drop_joins_workers() {
        let store = ObjectStore::new();
        let mut manager = StreamManager::new(store.clone());
        let source = Arc::new(MultiSource::<AudioFrame>::new());
        let sink = Arc::new(ExclusiveSink::<AudioFrame>::new(4));
        let src = store.spawn(ObjectSpec::new().with_source("tone", source.clone()));
        let dst = store.spawn(ObjectSpec::new().with_sink("meter", sink.clone()));

        manager.connect(src, dst, true).unwrap();
        drop(manager);

        assert_eq!(source.subscriber_count(), 0);
        assert!(!sink.is_taken());
    }
}
