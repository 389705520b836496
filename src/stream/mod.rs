//! Live preview streaming

pub mod mjpeg;

pub use mjpeg::{create_mjpeg_part, LivePreview, PreviewGuard, MJPEG_CONTENT_TYPE};
