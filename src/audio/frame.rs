//! Raw interleaved audio frames

use std::time::Duration;

use crate::stream::Frame;

/// Chunk of interleaved signed 16 bit samples
///
/// Planar layouts are not supported. A frame with zero channels carries no
/// usable audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// Samples per second
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
    /// Interleaved samples
    pub samples: Vec<i16>,
}

impl AudioFrame {
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<i16>) -> Self {
        Self {
            sample_rate,
            channels,
            samples,
        }
    }

    /// Get number of samples per channel
    pub fn samples_per_channel(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Playback duration of this frame
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(
            self.samples_per_channel() as u64 * 1_000_000 / self.sample_rate as u64,
        )
    }

    /// Whether two frames share sample rate and channel layout
    pub fn same_format(&self, other: &AudioFrame) -> bool {
        self.sample_rate == other.sample_rate && self.channels == other.channels
    }
}

impl Frame for AudioFrame {
    fn byte_size(&self) -> Option<u64> {
        Some((self.samples.len() * std::mem::size_of::<i16>()) as u64)
    }
}
