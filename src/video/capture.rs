//! Camera capture sessions
//!
//! A [`FrameSource`] knows how to open the camera; every caller gets its own
//! [`CaptureSession`], which owns the device handle until it is closed or
//! dropped. The V4L2 implementation uses memory-mapped buffers.

use bytes::Bytes;
use std::io;
use tracing::{debug, info, warn};
use v4l::buffer::Type as BufferType;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::capture::Parameters;
use v4l::video::Capture;
use v4l::Format;

use super::format::{PixelFormat, Resolution};
use super::frame::VideoFrame;
use crate::config::CameraConfig;
use crate::error::{AppError, Result};

/// Default number of capture buffers
const DEFAULT_BUFFER_COUNT: u32 = 4;
/// Minimum valid frame size (bytes)
const MIN_FRAME_SIZE: usize = 128;

/// Outcome of a single frame read
#[derive(Debug)]
pub enum FrameRead {
    /// A frame was captured
    Frame(VideoFrame),
    /// The device will not produce any more frames
    EndOfStream,
}

/// Opens capture sessions on a camera
pub trait FrameSource: Send + Sync {
    /// Human readable device name for logs
    fn describe(&self) -> String;

    /// Acquire the device. Fails fast with [`AppError::DeviceUnavailable`],
    /// no retry is attempted here.
    fn open(&self) -> Result<Box<dyn CaptureSession>>;
}

/// An open handle to the camera, exclusively owned by whoever opened it
pub trait CaptureSession {
    /// Negotiated frame size
    fn resolution(&self) -> Resolution;

    /// Negotiated pixel format
    fn format(&self) -> PixelFormat;

    /// Pull the next frame, blocking on device I/O.
    ///
    /// `Err(AppError::FrameRead)` is a transient failure; the session stays usable.
    fn next_frame(&mut self) -> Result<FrameRead>;

    /// Release the device. Dropping the session has the same effect.
    fn close(self: Box<Self>) {}
}

/// V4L2 camera addressed by index (`/dev/video<index>`)
#[derive(Debug, Clone)]
pub struct V4l2Camera {
    index: usize,
    resolution: Resolution,
    format: PixelFormat,
    fps: u32,
}

impl V4l2Camera {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            index: config.index,
            resolution: config.resolution(),
            format: config.format,
            fps: config.fps,
        }
    }

    fn device_path(&self) -> String {
        format!("/dev/video{}", self.index)
    }

    fn unavailable(&self, reason: impl std::fmt::Display) -> AppError {
        AppError::DeviceUnavailable {
            device: self.device_path(),
            reason: reason.to_string(),
        }
    }
}

impl FrameSource for V4l2Camera {
    fn describe(&self) -> String {
        self.device_path()
    }

    fn open(&self) -> Result<Box<dyn CaptureSession>> {
        debug!("Opening camera {}", self.device_path());

        let device = Device::new(self.index).map_err(|e| self.unavailable(e))?;

        let requested = Format::new(
            self.resolution.width,
            self.resolution.height,
            self.format.to_fourcc(),
        );
        let actual = device
            .set_format(&requested)
            .map_err(|e| self.unavailable(format!("failed to set format: {}", e)))?;

        let resolution = Resolution::new(actual.width, actual.height);
        let format = PixelFormat::from_fourcc(actual.fourcc).ok_or_else(|| {
            self.unavailable(format!("unsupported pixel format {}", actual.fourcc))
        })?;

        if resolution != self.resolution || format != self.format {
            warn!(
                "Camera {} negotiated {} {} instead of requested {} {}",
                self.device_path(),
                resolution,
                format,
                self.resolution,
                self.format
            );
        }

        if self.fps > 0 {
            if let Err(e) = device.set_params(&Parameters::with_fps(self.fps)) {
                warn!("Failed to set camera frame rate to {}: {}", self.fps, e);
            }
        }

        let stream = MmapStream::with_buffers(&device, BufferType::VideoCapture, DEFAULT_BUFFER_COUNT)
            .map_err(|e| self.unavailable(format!("failed to start stream: {}", e)))?;

        info!(
            "Camera {} opened: {} {} @ {}fps",
            self.device_path(),
            resolution,
            format,
            self.fps
        );

        Ok(Box::new(V4l2Session {
            device_path: self.device_path(),
            _device: device,
            stream,
            resolution,
            format,
            sequence: 0,
        }))
    }
}

/// Live V4L2 session; buffers are unmapped and streaming stops on drop
struct V4l2Session {
    device_path: String,
    _device: Device,
    stream: MmapStream<'static>,
    resolution: Resolution,
    format: PixelFormat,
    sequence: u64,
}

impl CaptureSession for V4l2Session {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn next_frame(&mut self) -> Result<FrameRead> {
        let (buf, meta) = match self.stream.next() {
            Ok(next) => next,
            Err(e) if is_device_lost(&e) => {
                warn!("Camera {} lost: {}", self.device_path, e);
                return Ok(FrameRead::EndOfStream);
            }
            Err(e) => return Err(AppError::FrameRead(e.to_string())),
        };

        // Use actual bytes used, not buffer size
        let used = match meta.bytesused as usize {
            0 => buf.len(),
            n => n.min(buf.len()),
        };
        if used < MIN_FRAME_SIZE {
            return Err(AppError::FrameRead(format!("short frame: {} bytes", used)));
        }

        self.sequence += 1;
        Ok(FrameRead::Frame(VideoFrame::new(
            Bytes::copy_from_slice(&buf[..used]),
            self.resolution,
            self.format,
            self.sequence,
        )))
    }

    fn close(self: Box<Self>) {
        debug!("Closing camera {}", self.device_path);
    }
}

/// Errors after which the device will not deliver frames again
fn is_device_lost(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(5)      // EIO - I/O error (device removed)
            | Some(6)   // ENXIO - No such device or address
            | Some(19)  // ENODEV - No such device
            | Some(32)  // EPIPE - Broken pipe
            | Some(108) // ESHUTDOWN - Transport endpoint shutdown
    )
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_device_lost_errors() {
        assert!(is_device_lost(&io::Error::from_raw_os_error(19)));
        assert!(is_device_lost(&io::Error::from_raw_os_error(5)));
        assert!(!is_device_lost(&io::Error::from_raw_os_error(11)));
        assert!(!is_device_lost(&io::Error::new(io::ErrorKind::TimedOut, "t")));
    }

    #[test]
    fn test_camera_device_path() {
        let camera = V4l2Camera::new(&CameraConfig::default());
        assert_eq!(camera.describe(), "/dev/video1");
    }

    #[test]
    fn test_scripted_session_closes_on_drop() {
        let source = ScriptedSource::new(vec![Step::Frame, Step::Short, Step::Fail, Step::End]);
        let mut session = source.open().unwrap();
        assert!(matches!(session.next_frame(), Ok(FrameRead::Frame(f)) if f.is_valid_jpeg()));
        assert!(matches!(session.next_frame(), Ok(FrameRead::Frame(f)) if !f.is_valid_jpeg()));
        assert!(matches!(session.next_frame(), Err(AppError::FrameRead(_))));
        assert!(matches!(session.next_frame(), Ok(FrameRead::EndOfStream)));
        session.close();
        assert_eq!(source.opened(), 1);
        assert_eq!(source.closed(), 1);
    }
}
