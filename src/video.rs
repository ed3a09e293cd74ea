//! Decoded video frames

use bytes::Bytes;

use crate::stream::Frame;

/// A decoded video surface
///
/// Pixel data is reference counted, so fan-out copies share one
/// allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    /// Capture time in microseconds
    pub timestamp_us: u64,
    pub width: u32,
    pub height: u32,
    /// Packed pixel data, layout is up to the producer
    pub data: Bytes,
}

impl VideoFrame {
    pub fn new(timestamp_us: u64, width: u32, height: u32, data: Bytes) -> Self {
        Self {
            timestamp_us,
            width,
            height,
            data,
        }
    }
}

impl Frame for VideoFrame {
    const TIMESTAMP_DIVISION: u64 = 1_000_000;

    fn timestamp(&self) -> Option<u64> {
        Some(self.timestamp_us)
    }

    fn byte_size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_frame_capabilities() {
        let frame = VideoFrame::new(33_333, 4, 2, Bytes::from(vec![0u8; 32]));

        assert_eq!(frame.timestamp(), Some(33_333));
        assert_eq!(frame.byte_size(), Some(32));
    }

    #[test]
    fn test_clone_shares_pixels() {
        let frame = VideoFrame::new(0, 1, 1, Bytes::from_static(&[1, 2, 3, 4]));
        let copy = frame.clone();

        assert_eq!(frame.data.as_ptr(), copy.data.as_ptr());
    }
}
