//! Live producer to consumer links
//!
//! A connection owns the reader it subscribed from the source and the
//! writer it subscribed from the sink. It is pumped either by a dedicated
//! worker thread or by the manager's `tick` on the main thread.
//!
//! ```text
//!  Running ──stop──► Stopping ──worker exits──► Finished ──tick──► removed
//! ```
//!
//! Main thread connections skip `Stopping`: they are finished as soon as
//! they are asked to stop.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::registry::ObjectId;
use crate::stream::{Frame, SharedStream};

/// `f32` stored in an `AtomicU32`
#[derive(Debug, Default)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

fn moving_average(avg: f32, sample: f32, weight: f32) -> f32 {
    if avg == 0.0 {
        sample
    } else {
        avg * (1.0 - weight) + sample * weight
    }
}

/// Frame timing and throughput of one connection
///
/// Written by whichever thread pumps the connection, read by anyone.
#[derive(Debug, Default)]
pub struct ConnectionMetrics {
    interval_avg: AtomicF32,
    frames: AtomicU64,
    bytes: AtomicU64,
    bytes_per_sec: AtomicF32,
}

impl ConnectionMetrics {
    /// Moving average of the frame interval in seconds, 0.0 until known
    pub fn interval_avg(&self) -> f32 {
        self.interval_avg.load()
    }

    pub fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn byte_count(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Moving average of the byte rate, 0.0 until known
    pub fn bytes_per_sec(&self) -> f32 {
        self.bytes_per_sec.load()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            interval_avg_secs: self.interval_avg(),
            frames: self.frame_count(),
            bytes: self.byte_count(),
            bytes_per_sec: self.bytes_per_sec(),
        }
    }

    /// Account one forwarded frame
    ///
    /// `delta` is the time since the previous frame in seconds, `None` for
    /// the first frame of a connection.
    pub(crate) fn record(&self, delta: Option<f64>, bytes: Option<u64>, weight: f32) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        if let Some(bytes) = bytes {
            self.bytes.fetch_add(bytes, Ordering::Relaxed);
        }

        // timestamps running backwards or a broken division are not timing
        let Some(delta) = delta.filter(|d| d.is_finite() && *d >= 0.0) else {
            return;
        };
        let delta = delta as f32;

        self.interval_avg
            .store(moving_average(self.interval_avg.load(), delta, weight));

        if let Some(bytes) = bytes {
            if delta > 0.0 {
                let rate = bytes as f32 / delta;
                self.bytes_per_sec
                    .store(moving_average(self.bytes_per_sec.load(), rate, weight));
            }
        }
    }
}

/// Point in time copy of [`ConnectionMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub interval_avg_secs: f32,
    pub frames: u64,
    pub bytes: u64,
    pub bytes_per_sec: f32,
}

/// Moves frames from one reader to one writer
pub(crate) struct Pump<T> {
    reader: SharedStream<T>,
    writer: SharedStream<T>,
    metrics: Arc<ConnectionMetrics>,
    batch: usize,
    weight: f32,
    clock: Instant,
    last_time: Option<f64>,
}

impl<T: Frame> Pump<T> {
    pub(crate) fn new(
        reader: SharedStream<T>,
        writer: SharedStream<T>,
        metrics: Arc<ConnectionMetrics>,
        batch: usize,
        weight: f32,
    ) -> Self {
        Self {
            reader,
            writer,
            metrics,
            batch,
            weight,
            clock: Instant::now(),
            last_time: None,
        }
    }

    /// Forward up to one batch of frames, returns how many were moved
    pub(crate) fn run(&mut self) -> usize {
        let mut moved = 0;
        while moved < self.batch {
            let Some(frame) = self.reader.pop() else {
                break;
            };

            let now = match frame.timestamp() {
                Some(ts) => ts as f64 / T::TIMESTAMP_DIVISION as f64,
                None => self.clock.elapsed().as_secs_f64(),
            };
            let delta = self.last_time.map(|last| now - last);
            self.last_time = Some(now);
            self.metrics.record(delta, frame.byte_size(), self.weight);

            let _ = self.writer.push(&frame);
            moved += 1;
        }
        moved
    }
}

/// Lifecycle state of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Running,
    Stopping,
    Finished,
}

/// Status of a connection, for UIs and status output
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub source: ObjectId,
    pub sink: ObjectId,
    pub frame_type: &'static str,
    pub threaded: bool,
    pub state: ConnectionState,
    pub metrics: MetricsSnapshot,
    pub connected_at: DateTime<Utc>,
}

type PumpFn = Box<dyn FnMut() -> usize + Send>;
type UnsubscribeFn = Box<dyn FnOnce() + Send>;

pub(crate) struct Connection {
    pub(crate) source: ObjectId,
    pub(crate) sink: ObjectId,
    frame_type: &'static str,
    threaded: bool,
    // taken by the worker for threaded connections
    pump: Option<PumpFn>,
    unsubscribe: Option<UnsubscribeFn>,
    worker: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    // set once the manager has taken ownership, rollbacks stay unset
    established: bool,
    metrics: Arc<ConnectionMetrics>,
    connected_at: DateTime<Utc>,
}

impl Connection {
    /// A connection pumped by the manager's `tick`
    pub(crate) fn new(
        source: ObjectId,
        sink: ObjectId,
        frame_type: &'static str,
        pump: PumpFn,
        unsubscribe: UnsubscribeFn,
        metrics: Arc<ConnectionMetrics>,
    ) -> Self {
        Self {
            source,
            sink,
            frame_type,
            threaded: false,
            pump: Some(pump),
            unsubscribe: Some(unsubscribe),
            worker: None,
            stop: Arc::new(AtomicBool::new(false)),
            finished: Arc::new(AtomicBool::new(false)),
            established: false,
            metrics,
            connected_at: Utc::now(),
        }
    }

    /// Move pumping onto a dedicated worker thread
    ///
    /// The worker pumps, sleeps `interval` and repeats until stopped. On
    /// error the pump is gone and the connection must be dropped.
    pub(crate) fn spawn_worker(&mut self, interval: Duration) -> io::Result<()> {
        let Some(mut pump) = self.pump.take() else {
            return Ok(());
        };
        let stop = self.stop.clone();
        let finished = self.finished.clone();

        self.threaded = true;
        let handle = thread::Builder::new()
            .name(format!("pump-{}-{}", self.source, self.sink))
            .spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    pump();
                    thread::sleep(interval);
                }
                finished.store(true, Ordering::Release);
            })?;

        self.worker = Some(handle);
        Ok(())
    }

    /// Announce the connection as live
    pub(crate) fn mark_established(&mut self) {
        self.established = true;
        tracing::info!(
            "connected {} -> {} ({}, {})",
            self.source,
            self.sink,
            self.frame_type,
            if self.threaded { "worker thread" } else { "main thread" }
        );
    }

    pub(crate) fn is_established(&self) -> bool {
        self.established
    }

    pub(crate) fn is_threaded(&self) -> bool {
        self.threaded
    }

    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub(crate) fn is_stopping(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Whether nothing is pumping this connection any more
    ///
    /// A worker that died by panicking never sets the finished flag, so
    /// the thread handle is consulted as well.
    pub(crate) fn is_finished(&self) -> bool {
        !self.threaded
            || self.finished.load(Ordering::Acquire)
            || self.worker.as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub(crate) fn state(&self) -> ConnectionState {
        if !self.is_stopping() {
            ConnectionState::Running
        } else if self.is_finished() {
            ConnectionState::Finished
        } else {
            ConnectionState::Stopping
        }
    }

    /// Pump a main thread connection once
    pub(crate) fn pump(&mut self) -> usize {
        match self.pump.as_mut() {
            Some(pump) => pump(),
            None => 0,
        }
    }

    /// Measured frame interval, if any frames have been timed yet
    pub(crate) fn interval_hint(&self) -> Option<Duration> {
        let interval = self.metrics.interval_avg();
        (interval > 0.0).then(|| Duration::from_secs_f32(interval))
    }

    pub(crate) fn metrics(&self) -> &Arc<ConnectionMetrics> {
        &self.metrics
    }

    pub(crate) fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            source: self.source,
            sink: self.sink,
            frame_type: self.frame_type,
            threaded: self.threaded,
            state: self.state(),
            metrics: self.metrics.snapshot(),
            connected_at: self.connected_at,
        }
    }
}

impl Drop for Connection {
    // stop, join the worker, then release both subscriptions
    fn drop(&mut self) {
        self.request_stop();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("pump worker {} -> {} panicked", self.source, self.sink);
            }
        }

        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }

        if self.established {
            tracing::info!(
                "disconnected {} -> {} after {} frames",
                self.source,
                self.sink,
                self.metrics.frame_count()
            );
        } else {
            tracing::debug!("rolled back {} -> {}", self.source, self.sink);
        }
    }
}
