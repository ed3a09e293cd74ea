//! Stream manager demo host
//!
//! Wires a test tone source to a level meter through the default target
//! tables and drives the manager from a tokio host loop.
//!
//! Usage: `framewire-demo [config.toml]`

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::f32::consts::TAU;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use framewire::{
    audio::{AudioFrame, Reframer},
    config::{AppConfig, PipelineConfig},
    manager::{ConnectionInfo, StreamManager},
    registry::{EndpointInfo, ObjectSpec, ObjectStore},
    stream::{same_stream, FrameSink, FrameStream, LockedStream, MultiSource, SharedStream},
};

/// Longest the host sleeps before draining the meter
const METER_INTERVAL: Duration = Duration::from_millis(250);

/// Chunk lengths the generator cycles through, in milliseconds
const CHUNK_PATTERN_MS: [u32; 4] = [7, 10, 3, 13];

/// Produces a sine tone in irregular chunks on its own thread
struct ToneGenerator {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ToneGenerator {
    fn start(output: Arc<MultiSource<AudioFrame>>, pipeline: PipelineConfig) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();

        let handle = thread::Builder::new()
            .name("tone-generator".into())
            .spawn(move || {
                let channels = pipeline.channels as usize;
                let step = TAU * pipeline.tone_frequency_hz / pipeline.sample_rate as f32;
                let mut phase = 0.0f32;

                for chunk_ms in CHUNK_PATTERN_MS.iter().cycle() {
                    if !flag.load(Ordering::Relaxed) {
                        break;
                    }

                    let frames = (pipeline.sample_rate * chunk_ms / 1000) as usize;
                    let mut samples = Vec::with_capacity(frames * channels);
                    for _ in 0..frames {
                        let value = (phase.sin() * 0.25 * i16::MAX as f32) as i16;
                        samples.extend(std::iter::repeat(value).take(channels));
                        phase = (phase + step) % TAU;
                    }

                    // nobody listening is fine, the frame is just dropped
                    let _ = output.push(&AudioFrame::new(
                        pipeline.sample_rate,
                        pipeline.channels,
                        samples,
                    ));
                    thread::sleep(Duration::from_millis(*chunk_ms as u64));
                }
            })
            .context("Failed to spawn tone generator")?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ToneGenerator {
    fn drop(&mut self) {
        self.stop();
    }
}

type MeterStream = Reframer<LockedStream<AudioFrame>>;

/// Sink that measures the level of fixed length chunks
struct LevelMeter {
    frame_length_ms: u32,
    writer: Mutex<Option<Arc<MeterStream>>>,
}

impl LevelMeter {
    fn new(frame_length_ms: u32) -> Self {
        Self {
            frame_length_ms,
            writer: Mutex::new(None),
        }
    }

    /// Drain reframed chunks and log their level
    fn report(&self) {
        let Some(writer) = self.writer.lock().clone() else {
            return;
        };

        let mut chunks = 0usize;
        let mut peak_db = f32::NEG_INFINITY;
        let mut sum_db = 0.0f32;
        while let Some(chunk) = writer.pop() {
            let db = rms_dbfs(&chunk.samples);
            peak_db = peak_db.max(db);
            sum_db += db;
            chunks += 1;
        }

        if chunks > 0 {
            tracing::info!(
                "level {:.1} dBFS avg, {:.1} dBFS peak over {} chunks of {} ms",
                sum_db / chunks as f32,
                peak_db,
                chunks,
                self.frame_length_ms
            );
        }
    }
}

impl FrameSink<AudioFrame> for LevelMeter {
    fn subscribe(&self) -> Option<SharedStream<AudioFrame>> {
        let mut writer = self.writer.lock();
        if writer.is_some() {
            return None;
        }
        let stream = Arc::new(Reframer::new(self.frame_length_ms, LockedStream::new()));
        *writer = Some(stream.clone());
        Some(stream as SharedStream<AudioFrame>)
    }

    fn unsubscribe(&self, stream: &SharedStream<AudioFrame>) -> bool {
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

fn rms_dbfs(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return f32::NEG_INFINITY;
    }
    let sum: f64 = samples
        .iter()
        .map(|&s| {
            let v = s as f64 / i16::MAX as f64;
            v * v
        })
        .sum();
    let rms = (sum / samples.len() as f64).sqrt() as f32;
    20.0 * rms.max(1e-9).log10()
}

#[derive(Serialize)]
struct Status {
    uptime_secs: f64,
    sources: Vec<EndpointInfo>,
    sinks: Vec<EndpointInfo>,
    connections: Vec<ConnectionInfo>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref()).context("Failed to load config")?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting framewire demo");

    let store = ObjectStore::new();
    let mut manager = StreamManager::with_config(store.clone(), config.manager.clone());
    let pipeline = config.pipeline.clone();

    let meter = Arc::new(LevelMeter::new(pipeline.frame_length_ms));
    let meter_id = store.spawn(
        ObjectSpec::new()
            .with_sink("level meter", meter.clone())
            .default_target(),
    );

    let tone = Arc::new(MultiSource::<AudioFrame>::new());
    let tone_id = store.spawn(
        ObjectSpec::new()
            .with_source("test tone", tone.clone())
            .connect_to_default(),
    );

    tracing::info!(
        "Tone {} Hz, {} Hz x {} channels, {} ms chunks",
        pipeline.tone_frequency_hz,
        pipeline.sample_rate,
        pipeline.channels,
        pipeline.frame_length_ms
    );
    let mut generator = ToneGenerator::start(tone, pipeline.clone())?;

    let started = Instant::now();
    let status_interval = Duration::from_secs(pipeline.status_interval_secs);
    let mut last_status = Instant::now();
    let mut last_tick = Instant::now();
    let mut hint = manager.tick(Duration::ZERO);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(hint.min(METER_INTERVAL)) => {}
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl-C")?;
                tracing::info!("Shutting down...");
                break;
            }
        }

        let now = Instant::now();
        hint = manager.tick(now - last_tick);
        last_tick = now;
        meter.report();

        if !status_interval.is_zero() && last_status.elapsed() >= status_interval {
            last_status = Instant::now();
            let status = Status {
                uptime_secs: started.elapsed().as_secs_f64(),
                sources: store.sources(),
                sinks: store.sinks(),
                connections: manager.connections(),
            };
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    generator.stop();
    store.destroy(tone_id);
    store.destroy(meter_id);

    let deadline = Instant::now() + Duration::from_secs(2);
    while manager.connection_count() > 0 && Instant::now() < deadline {
        manager.tick(Duration::ZERO);
        tokio::time::sleep(manager.config().worker_sleep()).await;
    }
    if manager.connection_count() > 0 {
        tracing::warn!("{} connections still running at exit", manager.connection_count());
    }

    tracing::info!("Demo stopped");
    Ok(())
}
