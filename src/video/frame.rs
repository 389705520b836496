//! Video frame data structures

use bytes::Bytes;

use super::format::{PixelFormat, Resolution};

/// A single camera sample with metadata
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Raw frame data (cheap to clone)
    data: Bytes,
    /// Frame resolution
    pub resolution: Resolution,
    /// Pixel format
    pub format: PixelFormat,
    /// Frame sequence number within its capture session
    pub sequence: u64,
}

impl VideoFrame {
    /// Create a new video frame
    pub fn new(data: Bytes, resolution: Resolution, format: PixelFormat, sequence: u64) -> Self {
        Self {
            data,
            resolution,
            format,
            sequence,
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

    /// Get frame data as bytes slice
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get frame data as Bytes (cheap clone)
    pub fn data_bytes(&self) -> Bytes {
        self.data.clone()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if format is JPEG/MJPEG
    pub fn is_jpeg(&self) -> bool {
        self.format.is_compressed()
    }

    /// Validate JPEG frame data (SOI marker at start, EOI or padding at end)
    pub fn is_valid_jpeg(&self) -> bool {
        if !self.is_jpeg() || self.data.len() < 4 {
            return false;
        }
        let start_marker = ((self.data[0] as u16) << 8) | self.data[1] as u16;
        if start_marker != 0xFFD8 {
            return false;
        }
        let end = self.data.len();
        let end_marker = ((self.data[end - 2] as u16) << 8) | self.data[end - 1] as u16;
        // Some UVC cameras pad the buffer after EOI
        matches!(end_marker, 0xFFD9 | 0xD900 | 0x0000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_jpeg() {
        let mut data = vec![0xFF, 0xD8];
        data.extend(vec![0x11u8; 200]);
        data.extend([0xFF, 0xD9]);
        let frame = VideoFrame::from_vec(data, Resolution::VGA, PixelFormat::Mjpeg, 0);
        assert!(frame.is_valid_jpeg());

        let mut bad = vec![0x00, 0x00];
        bad.extend(vec![0u8; 200]);
        let frame = VideoFrame::from_vec(bad, Resolution::VGA, PixelFormat::Mjpeg, 0);
        assert!(!frame.is_valid_jpeg());
    }

    #[test]
    fn test_raw_frame_is_not_jpeg() {
        let frame = VideoFrame::from_vec(
            vec![0xFF, 0xD8, 0xFF, 0xD9],
            Resolution::VGA,
            PixelFormat::Yuyv,
            3,
        );
        assert!(!frame.is_jpeg());
        assert!(!frame.is_valid_jpeg());
        assert_eq!(frame.len(), 4);
    }
}
