//! Still image encoding for the live preview

pub mod jpeg;

pub use jpeg::JpegEncoder;
