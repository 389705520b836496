//! Pixel format and resolution definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use v4l::format::fourcc;

/// Pixel formats a capture session can deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PixelFormat {
    /// MJPEG compressed format (each frame is a complete JPEG)
    Mjpeg,
    /// YUYV 4:2:2 packed format
    Yuyv,
    /// RGB24 format (3 bytes per pixel)
    Rgb24,
    /// BGR24 format (3 bytes per pixel)
    Bgr24,
}

impl PixelFormat {
    /// Convert to V4L2 FourCC
    pub fn to_fourcc(&self) -> fourcc::FourCC {
        match self {
            PixelFormat::Mjpeg => fourcc::FourCC::new(b"MJPG"),
            PixelFormat::Yuyv => fourcc::FourCC::new(b"YUYV"),
            PixelFormat::Rgb24 => fourcc::FourCC::new(b"RGB3"),
            PixelFormat::Bgr24 => fourcc::FourCC::new(b"BGR3"),
        }
    }

    /// Try to convert from V4L2 FourCC
    pub fn from_fourcc(fourcc: fourcc::FourCC) -> Option<Self> {
        match &fourcc.repr {
            b"MJPG" | b"JPEG" => Some(PixelFormat::Mjpeg),
            b"YUYV" => Some(PixelFormat::Yuyv),
            b"RGB3" => Some(PixelFormat::Rgb24),
            b"BGR3" => Some(PixelFormat::Bgr24),
            _ => None,
        }
    }

    /// Check if format is compressed (JPEG/MJPEG)
    pub fn is_compressed(&self) -> bool {
        matches!(self, PixelFormat::Mjpeg)
    }

    /// Expected frame size for a given resolution.
    /// Returns None for compressed formats (variable size)
    pub fn frame_size(&self, resolution: Resolution) -> Option<usize> {
        let pixels = resolution.pixels() as usize;
        match self {
            PixelFormat::Mjpeg => None,
            PixelFormat::Yuyv => Some(pixels * 2),
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => Some(pixels * 3),
        }
    }

    /// Name of the matching ffmpeg raw pixel format
    pub fn ffmpeg_pix_fmt(&self) -> Option<&'static str> {
        match self {
            PixelFormat::Mjpeg => None,
            PixelFormat::Yuyv => Some("yuyv422"),
            PixelFormat::Rgb24 => Some("rgb24"),
            PixelFormat::Bgr24 => Some("bgr24"),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelFormat::Mjpeg => "MJPEG",
            PixelFormat::Yuyv => "YUYV",
            PixelFormat::Rgb24 => "RGB24",
            PixelFormat::Bgr24 => "BGR24",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for PixelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MJPEG" | "MJPG" | "JPEG" => Ok(PixelFormat::Mjpeg),
            "YUYV" => Ok(PixelFormat::Yuyv),
            "RGB24" => Ok(PixelFormat::Rgb24),
            "BGR24" => Ok(PixelFormat::Bgr24),
            _ => Err(format!("Unknown pixel format: {}", s)),
        }
    }
}

/// Resolution (width x height)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Check if resolution is valid
    pub fn is_valid(&self) -> bool {
        self.width >= 160 && self.width <= 15360 && self.height >= 120 && self.height <= 8640
    }

    /// Get total pixels
    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub const VGA: Resolution = Resolution {
        width: 640,
        height: 480,
    };
    pub const HD720: Resolution = Resolution {
        width: 1280,
        height: 720,
    };
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_round_trip() {
        for format in [
            PixelFormat::Mjpeg,
            PixelFormat::Yuyv,
            PixelFormat::Rgb24,
            PixelFormat::Bgr24,
        ] {
            assert_eq!(PixelFormat::from_fourcc(format.to_fourcc()), Some(format));
        }
        assert_eq!(
            PixelFormat::from_fourcc(fourcc::FourCC::new(b"JPEG")),
            Some(PixelFormat::Mjpeg)
        );
        assert_eq!(PixelFormat::from_fourcc(fourcc::FourCC::new(b"NV12")), None);
    }

    #[test]
    fn test_frame_size() {
        assert_eq!(PixelFormat::Mjpeg.frame_size(Resolution::VGA), None);
        assert_eq!(
            PixelFormat::Yuyv.frame_size(Resolution::VGA),
            Some(640 * 480 * 2)
        );
        assert_eq!(
            PixelFormat::Bgr24.frame_size(Resolution::VGA),
            Some(640 * 480 * 3)
        );
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("mjpg".parse::<PixelFormat>(), Ok(PixelFormat::Mjpeg));
        assert_eq!("YUYV".parse::<PixelFormat>(), Ok(PixelFormat::Yuyv));
        assert!("h264".parse::<PixelFormat>().is_err());
    }
}
