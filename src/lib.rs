//! Cat Cam - a small home camera server
//!
//! Records fixed-length clips from a V4L2 camera at fixed times of day,
//! lists and serves the recordings over HTTP, and offers a live MJPEG view.

pub mod config;
pub mod error;
pub mod recording;
pub mod state;
pub mod stream;
pub mod utils;
pub mod video;
pub mod web;

pub use error::{AppError, Result};
