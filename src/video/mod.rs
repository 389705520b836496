//! Camera capture and frame encoding
//!
//! This module provides V4L2 capture sessions, the frame model and JPEG
//! encoding for raw frames.

pub mod capture;
pub mod convert;
pub mod encoder;
pub mod format;
pub mod frame;

pub use capture::{CaptureSession, FrameRead, FrameSource, V4l2Camera};
pub use encoder::JpegEncoder;
pub use format::{PixelFormat, Resolution};
pub use frame::VideoFrame;
