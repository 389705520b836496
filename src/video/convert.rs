//! Pixel format conversion utilities
//!
//! Primary use case: YUYV (from V4L2 capture) → YUV420P for JPEG encoding.

use crate::error::{AppError, Result};
use crate::video::format::Resolution;

/// YUV420P buffer with separate Y, U, V planes
pub struct Yuv420pBuffer {
    /// Raw buffer containing all planes
    data: Vec<u8>,
    resolution: Resolution,
    /// U plane offset
    u_offset: usize,
    /// V plane offset
    v_offset: usize,
}

impl Yuv420pBuffer {
    /// Create a new YUV420P buffer for the given resolution
    pub fn new(resolution: Resolution) -> Self {
        // YUV420P: Y = width*height, U = width*height/4, V = width*height/4
        let y_size = resolution.pixels() as usize;
        let uv_size = y_size / 4;

        Self {
            data: vec![0u8; y_size + uv_size * 2],
            resolution,
            u_offset: y_size,
            v_offset: y_size + uv_size,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn y_plane(&self) -> &[u8] {
        &self.data[..self.u_offset]
    }

    pub fn u_plane(&self) -> &[u8] {
        &self.data[self.u_offset..self.v_offset]
    }

    pub fn v_plane(&self) -> &[u8] {
        &self.data[self.v_offset..]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Fill the buffer from packed YUYV (YUV 4:2:2) data.
    ///
    /// Chroma is taken from even rows only, which is the usual 4:2:2 → 4:2:0
    /// decimation. Width and height must be even.
    pub fn fill_from_yuyv(&mut self, input: &[u8]) -> Result<()> {
        let width = self.resolution.width as usize;
        let height = self.resolution.height as usize;
        let expected = width * height * 2;

        if width % 2 != 0 || height % 2 != 0 {
            return Err(AppError::VideoError(format!(
                "YUYV conversion needs even dimensions, got {}",
                self.resolution
            )));
        }
        if input.len() < expected {
            return Err(AppError::VideoError(format!(
                "YUYV data too small: {} < {}",
                input.len(),
                expected
            )));
        }

        let chroma_width = width / 2;
        let (y_plane, chroma) = self.data.split_at_mut(self.u_offset);
        let (u_plane, v_plane) = chroma.split_at_mut(self.v_offset - self.u_offset);

        for row in 0..height {
            let src = &input[row * width * 2..(row + 1) * width * 2];
            let y_row = &mut y_plane[row * width..(row + 1) * width];

            for (pair, px) in src.chunks_exact(4).enumerate() {
                y_row[pair * 2] = px[0];
                y_row[pair * 2 + 1] = px[2];
            }

            if row % 2 == 0 {
                let chroma_row = (row / 2) * chroma_width;
                for (pair, px) in src.chunks_exact(4).enumerate() {
                    u_plane[chroma_row + pair] = px[1];
                    v_plane[chroma_row + pair] = px[3];
                }
            }
        }

        Ok(())
    }
}
