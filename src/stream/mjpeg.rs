//! Live MJPEG preview
//!
//! Every viewer gets its own capture session and a blocking producer that
//! reads, encodes and hands frames to a capacity-1 channel. The HTTP body
//! drains that channel, so a slow viewer slows its own producer and nothing
//! else. The producer stops when the camera ends, a read or encode fails,
//! or the viewer goes away; in every case the session is released.

use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::StreamConfig;
use crate::error::{AppError, Result};
use crate::utils::LogThrottler;
use crate::video::capture::{CaptureSession, FrameRead, FrameSource};
use crate::video::encoder::JpegEncoder;
use crate::video::frame::VideoFrame;

/// Multipart boundary between JPEG parts
pub const BOUNDARY: &str = "frame";

/// Content type of the preview response
pub const MJPEG_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Client ID type (UUID string)
pub type ClientId = String;

#[derive(Debug, Clone)]
struct ClientSession {
    connected_at: Instant,
    frames_sent: u64,
}

/// Serves live previews from a frame source
pub struct LivePreview {
    source: Arc<dyn FrameSource>,
    jpeg_quality: u32,
    clients: RwLock<HashMap<ClientId, ClientSession>>,
    throttler: LogThrottler,
}

impl LivePreview {
    pub fn new(source: Arc<dyn FrameSource>, config: &StreamConfig) -> Self {
        Self {
            source,
            jpeg_quality: config.jpeg_quality,
            clients: RwLock::new(HashMap::new()),
            throttler: LogThrottler::with_secs(10),
        }
    }

    /// Number of viewers with a running producer
    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    fn register_client(&self, client_id: &str) {
        let count = {
            let mut clients = self.clients.write();
            clients.insert(
                client_id.to_string(),
                ClientSession {
                    connected_at: Instant::now(),
                    frames_sent: 0,
                },
            );
            clients.len()
        };
        info!("Preview client {} connected (total: {})", client_id, count);
    }

    fn unregister_client(&self, client_id: &str) {
        if let Some(session) = self.clients.write().remove(client_id) {
            let duration_secs = session.connected_at.elapsed().as_secs_f32();
            let avg_fps = if duration_secs > 0.1 {
                session.frames_sent as f32 / duration_secs
            } else {
                0.0
            };
            info!(
                "Preview client {} disconnected after {:.1}s ({} frames, {:.1} avg FPS)",
                client_id, duration_secs, session.frames_sent, avg_fps
            );
        }
    }

    fn record_frame_sent(&self, client_id: &str) {
        if let Some(session) = self.clients.write().get_mut(client_id) {
            session.frames_sent += 1;
        }
    }

    /// Start a producer for one viewer and return the receiving end of its
    /// multipart parts. The channel closes when the producer stops.
    pub fn start(self: &Arc<Self>, client_id: ClientId) -> mpsc::Receiver<Bytes> {
        // Capacity 1: the producer only reads the next frame once the
        // previous part has been taken by the response body.
        let (tx, rx) = mpsc::channel::<Bytes>(1);
        let guard = PreviewGuard::new(client_id, self.clone());

        tokio::task::spawn_blocking(move || {
            guard.preview.produce(&guard, &tx);
            // Unregister before the channel closes
            drop(guard);
            drop(tx);
        });

        rx
    }

    fn produce(&self, guard: &PreviewGuard, tx: &mpsc::Sender<Bytes>) {
        let mut session = match self.source.open() {
            Ok(session) => session,
            Err(e) => {
                warn!(
                    "Preview client {} gets an empty stream, camera unavailable: {}",
                    guard.id(),
                    e
                );
                return;
            }
        };

        let mut encoder: Option<JpegEncoder> = None;
        loop {
            let frame = match session.next_frame() {
                Ok(FrameRead::Frame(frame)) => frame,
                Ok(FrameRead::EndOfStream) => {
                    debug!("Camera ended preview for client {}", guard.id());
                    break;
                }
                Err(e) => {
                    warn!("Preview for client {} stopped: {}", guard.id(), e);
                    break;
                }
            };

            if frame.is_jpeg() && !frame.is_valid_jpeg() {
                crate::warn_throttled!(
                    self.throttler,
                    "invalid_jpeg",
                    "Skipping corrupt JPEG frame #{}",
                    frame.sequence
                );
                continue;
            }

            let jpeg = match self.encode(session.as_ref(), &mut encoder, &frame) {
                Ok(jpeg) => jpeg,
                Err(e) => {
                    warn!("Preview for client {} stopped: {}", guard.id(), e);
                    break;
                }
            };

            if tx.blocking_send(create_mjpeg_part(&jpeg)).is_err() {
                debug!("Preview client {} went away", guard.id());
                break;
            }
            self.record_frame_sent(guard.id());
        }

        session.close();
    }

    fn encode(
        &self,
        session: &dyn CaptureSession,
        encoder: &mut Option<JpegEncoder>,
        frame: &VideoFrame,
    ) -> Result<Bytes> {
        if frame.is_jpeg() {
            return Ok(frame.data_bytes());
        }

        if encoder
            .as_ref()
            .map_or(true, |e| e.resolution() != frame.resolution)
        {
            if frame.resolution != session.resolution() {
                debug!(
                    "Frame size {} differs from negotiated {}",
                    frame.resolution,
                    session.resolution()
                );
            }
            *encoder = Some(JpegEncoder::new(frame.resolution, self.jpeg_quality)?);
        }

        match encoder.as_mut() {
            Some(encoder) => encoder.encode(frame),
            None => Err(AppError::VideoError("JPEG encoder not initialized".to_string())),
        }
    }
}

/// Registers a viewer for as long as its producer runs
pub struct PreviewGuard {
    client_id: ClientId,
    preview: Arc<LivePreview>,
}

impl PreviewGuard {
    pub fn new(client_id: ClientId, preview: Arc<LivePreview>) -> Self {
        preview.register_client(&client_id);
        Self { client_id, preview }
    }

    pub fn id(&self) -> &str {
        &self.client_id
    }
}

impl Drop for PreviewGuard {
    fn drop(&mut self) {
        self.preview.unregister_client(&self.client_id);
    }
}

/// Create MJPEG multipart frame bytes
pub fn create_mjpeg_part(jpeg_data: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(128 + jpeg_data.len());

    buf.put_slice(b"--");
    buf.put_slice(BOUNDARY.as_bytes());
    buf.put_slice(b"\r\nContent-Type: image/jpeg\r\n");
    buf.put_slice(format!("Content-Length: {}\r\n\r\n", jpeg_data.len()).as_bytes());
    buf.put_slice(jpeg_data);
    buf.put_slice(b"\r\n");

    buf.freeze()
}
