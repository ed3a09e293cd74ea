//! # framewire
//!
//! Typed frame streams and a connection manager that wires producers to
//! consumers across threads.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                           ObjectStore (registry)                     │
//! │   ┌──────────────┐        ┌──────────────┐        ┌──────────────┐   │
//! │   │ Microphone   │        │ Camera       │        │ Speaker      │   │
//! │   │ FrameSource  │        │ FrameSource  │        │ FrameSink    │   │
//! │   │ <AudioFrame> │        │ <VideoFrame> │        │ <AudioFrame> │   │
//! │   └──────┬───────┘        └──────┬───────┘        └──────▲───────┘   │
//! └──────────┼───────────────────────┼───────────────────────┼───────────┘
//!            │ subscribe             │ subscribe             │ subscribe
//!            ▼                       ▼                       │
//! ┌──────────────────────────────────────────────────────────┼───────────┐
//! │                      StreamManager (manager)             │           │
//! │   ┌──────────────────────────────┐                       │           │
//! │   │ Connection mic -> speaker    │  reader ──► Pump ──► writer       │
//! │   │ worker thread, EMA metrics   │                                   │
//! │   └──────────────────────────────┘                                   │
//! │   ┌──────────────────────────────┐                                   │
//! │   │ Connection camera -> tap     │  pumped by tick() on main thread  │
//! │   └──────────────────────────────┘                                   │
//! │   default source / sink tables, keyed by frame type                  │
//! └──────────────────────────────────────────────────────────────────────┘
//!
//!   Streams:  LockedStream (mutex, 1024 cap)   QueuedStream (lock-free)
//!             MultiSource (fan-out)            ExclusiveSink (one writer)
//!             Reframer (fixed length audio chunks)
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod manager;
pub mod registry;
pub mod stream;
pub mod video;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default sample rate for audio processing
    pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

    /// Default channel count (stereo)
    pub const DEFAULT_CHANNELS: u16 = 2;

    /// Default reframed chunk length in milliseconds
    pub const DEFAULT_FRAME_LENGTH_MS: u32 = 20;

    /// Hard cap of a locked stream (in frames)
    pub const LOCKED_STREAM_CAPACITY: usize = 1024;

    /// Frames moved per pump invocation
    pub const DEFAULT_PUMP_BATCH: usize = 64;

    /// Sleep between pump invocations of a worker thread
    pub const DEFAULT_WORKER_SLEEP_MS: u64 = 5;

    /// Weight of a new sample in connection moving averages
    pub const DEFAULT_INTERVAL_EMA_WEIGHT: f32 = 0.05;

    /// Tick hint when nothing reports frame timing
    pub const DEFAULT_IDLE_TICK_SECS: f32 = 2.0;

    /// Lower bound of the tick hint
    pub const DEFAULT_MIN_TICK_MS: u64 = 1;
}
