//! Video frame data structures

use bytes::Bytes;
use std::time::Instant;

use super::format::{PixelFormat, Resolution};

/// A video frame with metadata
///
/// Frames are transient: pulled from the capture source, encoded,
/// emitted, and dropped. Nothing stores them.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Raw frame data
    data: Bytes,
    /// Frame resolution
    pub resolution: Resolution,
    /// Pixel format
    pub format: PixelFormat,
    /// Frame sequence number
    pub sequence: u64,
    /// Timestamp when frame was captured
    pub capture_ts: Instant,
}

impl VideoFrame {
    /// Create a new video frame
    pub fn new(data: Bytes, resolution: Resolution, format: PixelFormat, sequence: u64) -> Self {
        Self {
            data,
            resolution,
            format,
            sequence,
            capture_ts: Instant::now(),
        }
    }

    /// Create a frame from a Vec<u8>
    pub fn from_vec(
        data: Vec<u8>,
        resolution: Resolution,
        format: PixelFormat,
        sequence: u64,
    ) -> Self {
        Self::new(Bytes::from(data), resolution, format, sequence)
    }

    /// Payload as a byte slice
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload as `Bytes` (cheap clone)
    pub fn data_bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// Whether this frame carries a complete JPEG payload
    pub fn is_valid_jpeg(&self) -> bool {
        self.format.is_compressed() && is_valid_jpeg(&self.data)
    }
}

/// Validate JPEG payload bytes (SOI/EOI markers, minimum plausible size)
pub fn is_valid_jpeg(data: &[u8]) -> bool {
    if data.len() < 125 {
        return false;
    }
    // Check start marker (0xFFD8)
    let start_marker = ((data[0] as u16) << 8) | data[1] as u16;
    if start_marker != 0xFFD8 {
        return false;
    }
    // Check end marker
    let end = data.len();
    let end_marker = ((data[end - 2] as u16) << 8) | data[end - 1] as u16;
    // Valid end markers: 0xFFD9, 0xD900, 0x0000 (padded)
    matches!(end_marker, 0xFFD9 | 0xD900 | 0x0000)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a minimal byte blob that passes the JPEG marker check
    pub(crate) fn fake_jpeg() -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        data.extend(vec![0u8; 200]);
        data.extend([0xFF, 0xD9]);
        data
    }

    #[test]
    fn test_valid_jpeg_markers() {
        assert!(is_valid_jpeg(&fake_jpeg()));

        // Too small
        assert!(!is_valid_jpeg(&[0xFF, 0xD8, 0xFF, 0xD9]));

        // Wrong header
        let mut bad = vec![0x00, 0x00];
        bad.extend(vec![0u8; 200]);
        assert!(!is_valid_jpeg(&bad));
    }

    #[test]
    fn test_frame_validity_depends_on_format() {
        let frame = VideoFrame::from_vec(fake_jpeg(), Resolution::VGA, PixelFormat::Mjpeg, 0);
        assert!(frame.is_valid_jpeg());

        // Same bytes labelled as raw are not a JPEG frame
        let frame = VideoFrame::from_vec(fake_jpeg(), Resolution::VGA, PixelFormat::Yuyv, 0);
        assert!(!frame.is_valid_jpeg());
    }
}
