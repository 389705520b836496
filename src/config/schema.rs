use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::video::format::{PixelFormat, Resolution};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Camera capture settings
    pub camera: CameraConfig,
    /// Scheduled recording settings
    pub recording: RecordingConfig,
    /// Live preview settings
    pub stream: StreamConfig,
    /// Web server settings
    pub web: WebConfig,
}

/// Camera capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device index (`/dev/video<index>`)
    pub index: usize,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Frame rate, also used as the recording frame rate
    pub fps: u32,
    /// Pixel format requested from the driver
    pub format: PixelFormat,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 1,
            width: 640,
            height: 480,
            fps: 20,
            format: PixelFormat::Mjpeg,
        }
    }
}

impl CameraConfig {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

/// Codec used for recorded clips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordingCodec {
    /// H.264 (avc1), plays in every browser
    #[default]
    H264,
    /// Motion JPEG, no re-encoding cost
    Mjpeg,
}

impl RecordingCodec {
    /// ffmpeg encoder name
    pub fn ffmpeg_encoder(&self) -> &'static str {
        match self {
            RecordingCodec::H264 => "libx264",
            RecordingCodec::Mjpeg => "mjpeg",
        }
    }
}

/// Scheduled recording configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Directory holding recordings
    pub dir: PathBuf,
    /// Length of each clip in seconds
    pub duration_secs: u64,
    /// Container extension (without dot)
    pub extension: String,
    /// Video codec
    pub codec: RecordingCodec,
    /// Daily trigger times
    pub schedule: Vec<ScheduleEntry>,
    /// Scheduler poll interval in seconds
    pub poll_interval_secs: u64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("recordings"),
            duration_secs: 240, // 4 minutes
            extension: "mp4".to_string(),
            codec: RecordingCodec::H264,
            schedule: [(13, 49), (8, 59), (15, 59), (22, 59)]
                .into_iter()
                .filter_map(|(hour, minute)| ScheduleEntry::new(hour, minute))
                .collect(),
            poll_interval_secs: 30,
        }
    }
}

/// Live preview configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// JPEG quality for raw camera formats (1-100)
    pub jpeg_quality: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { jpeg_quality: 80 }
    }
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Bind address
    pub bind_address: String,
    /// HTTP port
    pub http_port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            http_port: 5000,
        }
    }
}

/// A daily time of day (`HH:MM`, 24h) at which a recording starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScheduleEntry(NaiveTime);

impl ScheduleEntry {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0.hour(), self.0.minute())
    }
}

impl FromStr for ScheduleEntry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (hour, minute) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid schedule time '{}', expected HH:MM", s))?;
        if hour.len() != 2 || minute.len() != 2 {
            return Err(format!("Invalid schedule time '{}', expected HH:MM", s));
        }
        let hour: u32 = hour
            .parse()
            .map_err(|_| format!("Invalid hour in schedule time '{}'", s))?;
        let minute: u32 = minute
            .parse()
            .map_err(|_| format!("Invalid minute in schedule time '{}'", s))?;
        Self::new(hour, minute).ok_or_else(|| format!("Schedule time out of range: '{}'", s))
    }
}

impl TryFrom<String> for ScheduleEntry {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScheduleEntry> for String {
    fn from(entry: ScheduleEntry) -> Self {
        entry.to_string()
    }
}
