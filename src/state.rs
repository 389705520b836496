use std::sync::Arc;

use crate::config::AppConfig;
use crate::recording::RecordingCatalog;
use crate::stream::LivePreview;
use crate::video::capture::FrameSource;

/// Application-wide state shared across handlers
///
/// Handlers only read: the catalog looks at the recordings directory and
/// the preview opens its own capture session per viewer.
pub struct AppState {
    /// Recordings directory view
    pub catalog: RecordingCatalog,
    /// Live MJPEG preview
    pub preview: Arc<LivePreview>,
}

impl AppState {
    pub fn new(config: &AppConfig, source: Arc<dyn FrameSource>) -> Arc<Self> {
        let catalog = RecordingCatalog::new(
            config.recording.dir.clone(),
            config.recording.extension.clone(),
        );
        let preview = Arc::new(LivePreview::new(source, &config.stream));

        Arc::new(Self { catalog, preview })
    }
}
