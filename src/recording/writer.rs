//! Video sinks for recorded clips
//!
//! Clips are written by an `ffmpeg` child process fed through its stdin:
//! MJPEG camera frames are piped as a JPEG sequence, raw frames as
//! `rawvideo` with the declared size and pixel format. ffmpeg muxes the
//! result into the target container.

use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdin, Command, Stdio};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use crate::config::RecordingCodec;
use crate::error::{AppError, Result};
use crate::video::format::{PixelFormat, Resolution};
use crate::video::frame::VideoFrame;

/// Bytes of ffmpeg's stderr kept for error reports
const STDERR_TAIL: usize = 4096;

/// Properties a sink is opened with; every appended frame must match them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    pub fps: u32,
    pub resolution: Resolution,
    pub input_format: PixelFormat,
    pub codec: RecordingCodec,
}

/// Destination for the frames of one recording
pub trait VideoSink: Send {
    /// Append one frame. Frames that do not match the declared properties are
    /// refused with [`AppError::FrameMismatch`] or [`AppError::FrameRejected`]
    /// and nothing is written; the sink stays usable.
    fn append(&mut self, frame: &VideoFrame) -> Result<()>;

    /// Flush and close the file
    fn finalize(self: Box<Self>) -> Result<()>;
}

/// Opens sinks at a given path
pub trait SinkFactory: Send + Sync {
    fn create(&self, path: &Path, config: &SinkConfig) -> Result<Box<dyn VideoSink>>;
}

/// Check a frame against the sink's declared properties
pub fn check_frame(config: &SinkConfig, frame: &VideoFrame) -> Result<()> {
    if frame.resolution != config.resolution {
        return Err(AppError::FrameMismatch {
            expected: config.resolution,
            actual: frame.resolution,
        });
    }
    if frame.format != config.input_format {
        return Err(AppError::FrameRejected(format!(
            "frame format {} does not match sink input {}",
            frame.format, config.input_format
        )));
    }
    match config.input_format.frame_size(config.resolution) {
        Some(expected) if frame.len() != expected => {
            return Err(AppError::FrameRejected(format!(
                "raw frame has {} bytes, expected {}",
                frame.len(),
                expected
            )));
        }
        None if !frame.is_valid_jpeg() => {
            return Err(AppError::FrameRejected(format!(
                "corrupt JPEG frame #{}",
                frame.sequence
            )));
        }
        _ => {}
    }
    Ok(())
}

/// Command line for encoding `config` input from stdin into `output`
pub fn ffmpeg_args(config: &SinkConfig, output: &Path) -> Vec<String> {
    let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-y"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let fps = config.fps.to_string();
    match config.input_format.ffmpeg_pix_fmt() {
        None => {
            args.extend(
                ["-f", "image2pipe", "-c:v", "mjpeg", "-framerate", &fps]
                    .iter()
                    .map(|s| s.to_string()),
            );
        }
        Some(pix_fmt) => {
            let size = config.resolution.to_string();
            args.extend(
                [
                    "-f", "rawvideo", "-pix_fmt", pix_fmt, "-s", &size, "-framerate", &fps,
                ]
                .iter()
                .map(|s| s.to_string()),
            );
        }
    }
    args.extend(["-i", "pipe:0"].iter().map(|s| s.to_string()));

    args.extend(["-c:v", config.codec.ffmpeg_encoder()].iter().map(|s| s.to_string()));
    let output_opts: &[&str] = match config.codec {
        RecordingCodec::H264 => &[
            "-preset",
            "veryfast",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ],
        RecordingCodec::Mjpeg => &["-q:v", "3"],
    };
    args.extend(output_opts.iter().map(|s| s.to_string()));
    args.push(output.to_string_lossy().into_owned());
    args
}

/// Spawns an ffmpeg process per recording
#[derive(Debug, Clone)]
pub struct FfmpegSinkFactory {
    binary: PathBuf,
}

impl FfmpegSinkFactory {
    /// Use the `ffmpeg` found on `PATH`
    pub fn new() -> Self {
        Self::with_binary("ffmpeg")
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfmpegSinkFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SinkFactory for FfmpegSinkFactory {
    fn create(&self, path: &Path, config: &SinkConfig) -> Result<Box<dyn VideoSink>> {
        Ok(Box::new(FfmpegWriter::spawn(&self.binary, path, *config)?))
    }
}

/// Sink backed by a running ffmpeg process
pub struct FfmpegWriter {
    child: Option<Child>,
    stdin: Option<BufWriter<ChildStdin>>,
    /// Reader thread draining stderr so ffmpeg never blocks on it
    stderr: Option<JoinHandle<String>>,
    config: SinkConfig,
    path: PathBuf,
    frames: u64,
}

impl FfmpegWriter {
    pub fn spawn(binary: &Path, path: &Path, config: SinkConfig) -> Result<Self> {
        let args = ffmpeg_args(&config, path);
        debug!("Starting {} {}", binary.display(), args.join(" "));

        let mut command = Command::new(binary);
        command.args(&args);
        Self::start(command, path, config)
    }

    fn start(mut command: Command, path: &Path, config: SinkConfig) -> Result<Self> {
        let program = command.get_program().to_string_lossy().into_owned();
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AppError::Encoder(format!("Failed to start {}: {}", program, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::Encoder("Failed to capture ffmpeg stdin".to_string()))?;
        let stderr = match child.stderr.take().map(drain_stderr).transpose() {
            Ok(stderr) => stderr,
            Err(e) => {
                if let Err(kill_err) = child.kill() {
                    warn!("Failed to stop {}: {}", program, kill_err);
                }
                let _ = child.wait();
                return Err(AppError::Encoder(format!(
                    "Failed to start ffmpeg stderr reader: {}",
                    e
                )));
            }
        };

        info!(
            "Recording to {} ({} {} @ {}fps, {:?})",
            path.display(),
            config.resolution,
            config.input_format,
            config.fps,
            config.codec
        );

        Ok(Self {
            child: Some(child),
            stdin: Some(BufWriter::new(stdin)),
            stderr,
            config,
            path: path.to_path_buf(),
            frames: 0,
        })
    }

    fn collect_stderr(&mut self) -> String {
        self.stderr
            .take()
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default()
    }
}

/// Read stderr until ffmpeg closes it, keeping only the tail
fn drain_stderr(mut stderr: ChildStderr) -> io::Result<JoinHandle<String>> {
    thread::Builder::new()
        .name("ffmpeg-stderr".to_string())
        .spawn(move || {
            let mut tail: Vec<u8> = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                match stderr.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        tail.extend_from_slice(&buf[..n]);
                        if tail.len() > STDERR_TAIL {
                            let excess = tail.len() - STDERR_TAIL;
                            tail.drain(..excess);
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
            String::from_utf8_lossy(&tail).into_owned()
        })
}

impl VideoSink for FfmpegWriter {
    fn append(&mut self, frame: &VideoFrame) -> Result<()> {
        check_frame(&self.config, frame)?;

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| AppError::Encoder("ffmpeg input already closed".to_string()))?;
        stdin
            .write_all(frame.data())
            .map_err(|e| AppError::Encoder(format!("Failed to write frame to ffmpeg: {}", e)))?;

        self.frames += 1;
        Ok(())
    }

    fn finalize(mut self: Box<Self>) -> Result<()> {
        // ffmpeg finishes the container once its input is closed
        if let Some(mut stdin) = self.stdin.take() {
            if let Err(e) = stdin.flush() {
                warn!("Failed to flush ffmpeg input: {}", e);
            }
        }

        let mut child = self
            .child
            .take()
            .ok_or_else(|| AppError::Encoder("ffmpeg already finished".to_string()))?;
        let status = child
            .wait()
            .map_err(|e| AppError::Encoder(format!("Failed to wait for ffmpeg: {}", e)))?;
        let stderr = self.collect_stderr();

        if !status.success() {
            return Err(AppError::Encoder(format!(
                "ffmpeg exited with {} while writing {}: {}",
                status,
                self.path.display(),
                stderr.trim()
            )));
        }

        debug!("Finalized {} ({} frames)", self.path.display(), self.frames);
        Ok(())
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        // Closing stdin lets ffmpeg finish the container; reap it so no zombie is left.
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.wait() {
                warn!("Failed to reap ffmpeg for {}: {}", self.path.display(), e);
            }
        }
        self.collect_stderr();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory sink for tests

    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// What a [`MemorySink`] saw
    #[derive(Debug, Default, Clone)]
    pub struct SinkRecord {
        pub path: PathBuf,
        pub frames: Vec<u64>,
        pub finalized: bool,
    }

    /// Creates the target file (empty) and records appended frame sequence numbers
    #[derive(Default)]
    pub struct MemorySinkFactory {
        pub records: Arc<Mutex<Vec<SinkRecord>>>,
        /// Fail `append` after this many frames
        pub fail_after: Option<usize>,
    }

    impl MemorySinkFactory {
        pub fn records(&self) -> Vec<SinkRecord> {
            self.records.lock().clone()
        }
    }

    impl SinkFactory for MemorySinkFactory {
        fn create(&self, path: &Path, config: &SinkConfig) -> Result<Box<dyn VideoSink>> {
            std::fs::File::create(path)?;
            let mut records = self.records.lock();
            records.push(SinkRecord {
                path: path.to_path_buf(),
                ..Default::default()
            });
            Ok(Box::new(MemorySink {
                config: *config,
                index: records.len() - 1,
                records: self.records.clone(),
                fail_after: self.fail_after,
            }))
        }
    }

    struct MemorySink {
        config: SinkConfig,
        index: usize,
        records: Arc<Mutex<Vec<SinkRecord>>>,
        fail_after: Option<usize>,
    }

    impl VideoSink for MemorySink {
        fn append(&mut self, frame: &VideoFrame) -> Result<()> {
            check_frame(&self.config, frame)?;
            let mut records = self.records.lock();
            let record = &mut records[self.index];
            if self.fail_after == Some(record.frames.len()) {
                return Err(AppError::Encoder("broken pipe".to_string()));
            }
            record.frames.push(frame.sequence);
            Ok(())
        }

        fn finalize(self: Box<Self>) -> Result<()> {
            self.records.lock()[self.index].finalized = true;
            Ok(())
        }
    }
}
