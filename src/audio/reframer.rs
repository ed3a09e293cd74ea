//! Fixed duration re-chunking of audio streams
//!
//! Capture devices deliver audio in whatever chunk size their callback
//! happens to use, while encoders want fixed frames (e.g. 20 ms). The
//! [`Reframer`] wraps the stream a consumer pops from and accumulates
//! samples until a full chunk is available.

use parking_lot::Mutex;

use super::AudioFrame;
use crate::constants::{DEFAULT_FRAME_LENGTH_MS, DEFAULT_SAMPLE_RATE};
use crate::stream::FrameStream;

struct ReframeState {
    buffer: Vec<i16>,
    sample_rate: u32,
    // 0 until the first frame arrives
    channels: u16,
}

/// Pops fixed duration audio frames from a variable chunk stream
///
/// Reframing happens on `pop` only, `push` hands frames to the inner
/// stream unchanged. A change of sample rate or channel count discards
/// whatever was buffered in the old format.
pub struct Reframer<S> {
    frame_length_ms: u32,
    inner: S,
    state: Mutex<ReframeState>,
}

impl<S> Reframer<S> {
    /// Wrap `inner`, emitting chunks of `frame_length_ms` milliseconds
    pub fn new(frame_length_ms: u32, inner: S) -> Self {
        Self {
            frame_length_ms,
            inner,
            state: Mutex::new(ReframeState {
                buffer: Vec::new(),
                sample_rate: DEFAULT_SAMPLE_RATE,
                channels: 0,
            }),
        }
    }

    pub fn frame_length_ms(&self) -> u32 {
        self.frame_length_ms
    }

    /// The wrapped stream
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Samples (all channels) waiting for the next chunk
    pub fn buffered_samples(&self) -> usize {
        self.state.lock().buffer.len()
    }

    /// Samples per output chunk for a format, interleaved channels included
    pub fn chunk_samples(&self, sample_rate: u32, channels: u16) -> usize {
        (self.frame_length_ms as u64 * sample_rate as u64 * channels as u64 / 1000) as usize
    }
}

impl<S: Default> Default for Reframer<S> {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_LENGTH_MS, S::default())
    }
}

impl<S: FrameStream<AudioFrame>> FrameStream<AudioFrame> for Reframer<S> {
    fn pop(&self) -> Option<AudioFrame> {
        let mut state = self.state.lock();

        match self.inner.pop() {
            Some(frame) => {
                if state.sample_rate != frame.sample_rate || state.channels != frame.channels {
                    if state.channels != 0 {
                        tracing::debug!(
                            "reframer reconfigured {}Hz/{}ch -> {}Hz/{}ch, dropping {} samples",
                            state.sample_rate,
                            state.channels,
                            frame.sample_rate,
                            frame.channels,
                            state.buffer.len()
                        );
                    }
                    state.sample_rate = frame.sample_rate;
                    state.channels = frame.channels;
                    state.buffer.clear();
                }
                state.buffer.extend_from_slice(&frame.samples);
            }
            None if state.buffer.is_empty() => return None,
            None => {}
        }

        let desired = self.chunk_samples(state.sample_rate, state.channels);
        if desired == 0 {
            // no usable format, nothing can ever be emitted from this buffer
            state.buffer.clear();
            return None;
        }
        if state.buffer.len() < desired {
            return None;
        }

        let samples: Vec<i16> = state.buffer.drain(..desired).collect();
        Some(AudioFrame::new(state.sample_rate, state.channels, samples))
    }

    fn push(&self, frame: &AudioFrame) -> bool {
        self.inner.push(frame)
    }
}
