//! JPEG encoder implementation
//!
//! Encodes raw camera frames (YUYV, RGB, BGR) to JPEG with turbojpeg.
//! YUYV is first decimated to I420 so turbojpeg can skip its own color
//! conversion; packed RGB/BGR is handed over as-is.

use bytes::Bytes;

use crate::error::{AppError, Result};
use crate::video::convert::Yuv420pBuffer;
use crate::video::format::{PixelFormat, Resolution};
use crate::video::frame::VideoFrame;

/// JPEG encoder using turbojpeg
///
/// ```text
/// YUYV ──decimate──> I420 ──turbojpeg──> JPEG
/// RGB24/BGR24 ──────────────turbojpeg──> JPEG
/// ```
///
/// Note: This encoder is NOT thread-safe due to turbojpeg limitations.
/// Each preview worker owns its own instance.
pub struct JpegEncoder {
    resolution: Resolution,
    compressor: turbojpeg::Compressor,
    /// I420 scratch buffer for YUYV input
    i420: Yuv420pBuffer,
}

impl JpegEncoder {
    /// Create a new JPEG encoder
    pub fn new(resolution: Resolution, quality: u32) -> Result<Self> {
        let mut compressor = turbojpeg::Compressor::new().map_err(|e| {
            AppError::VideoError(format!("Failed to create turbojpeg compressor: {}", e))
        })?;

        compressor
            .set_quality(quality.clamp(1, 100) as i32)
            .map_err(|e| AppError::VideoError(format!("Failed to set JPEG quality: {}", e)))?;
        compressor
            .set_subsamp(turbojpeg::Subsamp::Sub2x2)
            .map_err(|e| AppError::VideoError(format!("Failed to set JPEG subsampling: {}", e)))?;

        Ok(Self {
            resolution,
            compressor,
            i420: Yuv420pBuffer::new(resolution),
        })
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Encode any supported frame to JPEG bytes.
    ///
    /// MJPEG frames are already JPEG and are passed through untouched.
    pub fn encode(&mut self, frame: &VideoFrame) -> Result<Bytes> {
        if frame.resolution != self.resolution && !frame.is_jpeg() {
            return Err(AppError::FrameMismatch {
                expected: self.resolution,
                actual: frame.resolution,
            });
        }

        match frame.format {
            PixelFormat::Mjpeg => Ok(frame.data_bytes()),
            PixelFormat::Yuyv => self.encode_yuyv(frame.data()),
            PixelFormat::Rgb24 => self.encode_packed(frame.data(), turbojpeg::PixelFormat::RGB),
            PixelFormat::Bgr24 => self.encode_packed(frame.data(), turbojpeg::PixelFormat::BGR),
        }
    }

    /// Encode YUYV (YUV422) frame to JPEG
    pub fn encode_yuyv(&mut self, data: &[u8]) -> Result<Bytes> {
        self.i420.fill_from_yuyv(data)?;

        let yuv_image = turbojpeg::YuvImage {
            pixels: self.i420.as_bytes(),
            width: self.resolution.width as usize,
            height: self.resolution.height as usize,
            align: 1, // No padding between rows
            subsamp: turbojpeg::Subsamp::Sub2x2,
        };

        let jpeg = self
            .compressor
            .compress_yuv_to_vec(yuv_image)
            .map_err(|e| AppError::VideoError(format!("JPEG compression failed: {}", e)))?;

        Ok(Bytes::from(jpeg))
    }

    fn encode_packed(&mut self, data: &[u8], format: turbojpeg::PixelFormat) -> Result<Bytes> {
        let width = self.resolution.width as usize;
        let height = self.resolution.height as usize;
        let expected = width * height * 3;

        if data.len() < expected {
            return Err(AppError::VideoError(format!(
                "{:?} data too small: {} < {}",
                format,
                data.len(),
                expected
            )));
        }

        let image = turbojpeg::Image {
            pixels: &data[..expected],
            width,
            pitch: width * 3,
            height,
            format,
        };

        let jpeg = self
            .compressor
            .compress_to_vec(image)
            .map_err(|e| AppError::VideoError(format!("JPEG compression failed: {}", e)))?;

        Ok(Bytes::from(jpeg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUALITY: u32 = 80;

    #[test]
    fn test_mjpeg_passthrough() {
        let mut encoder = JpegEncoder::new(Resolution::VGA, QUALITY).unwrap();
        let frame = VideoFrame::from_vec(
            vec![0xFF, 0xD8, 1, 2, 3, 0xFF, 0xD9],
            Resolution::VGA,
            PixelFormat::Mjpeg,
            1,
        );
        assert_eq!(encoder.encode(&frame).unwrap(), frame.data_bytes());
    }

    #[test]
    fn test_encode_yuyv_produces_jpeg() {
        let res = Resolution::new(16, 16);
        let mut encoder = JpegEncoder::new(res, 75).unwrap();
        let frame = VideoFrame::from_vec(
            vec![128u8; 16 * 16 * 2],
            res,
            PixelFormat::Yuyv,
            1,
        );
        let jpeg = encoder.encode(&frame).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_raw_resolution_mismatch() {
        let mut encoder = JpegEncoder::new(Resolution::new(16, 16), 75).unwrap();
        let frame = VideoFrame::from_vec(
            vec![0u8; 32 * 16 * 3],
            Resolution::new(32, 16),
            PixelFormat::Rgb24,
            1,
        );
        assert!(matches!(
            encoder.encode(&frame),
            Err(AppError::FrameMismatch { .. })
        ));
    }
}
