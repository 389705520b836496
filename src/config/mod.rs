//! Application configuration
//!
//! All settings are fixed at process start: defaults are the built-in
//! constants and a handful of them can be overridden on the command line.
//! The resulting [`AppConfig`] is handed to each component explicitly.

mod schema;

pub use schema::*;

use std::collections::HashSet;
use std::time::Duration;

use crate::error::{AppError, Result};

impl AppConfig {
    /// Reject settings the recorder and the preview cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.camera.fps == 0 {
            return Err(AppError::Config("camera fps must be > 0".to_string()));
        }
        if !self.camera.resolution().is_valid() {
            return Err(AppError::Config(format!(
                "unsupported camera resolution {}",
                self.camera.resolution()
            )));
        }
        if self.recording.duration_secs == 0 {
            return Err(AppError::Config(
                "recording duration must be > 0".to_string(),
            ));
        }
        if self.recording.poll_interval_secs == 0 {
            return Err(AppError::Config(
                "scheduler poll interval must be > 0".to_string(),
            ));
        }
        if self.recording.schedule.is_empty() {
            return Err(AppError::Config(
                "recording schedule has no entries".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(entry) = self
            .recording
            .schedule
            .iter()
            .find(|entry| !seen.insert(**entry))
        {
            return Err(AppError::Config(format!(
                "schedule entry {} is listed twice",
                entry
            )));
        }
        let ext = &self.recording.extension;
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::Config(format!(
                "invalid recording extension '{}'",
                ext
            )));
        }
        if !(1..=100).contains(&self.stream.jpeg_quality) {
            return Err(AppError::Config(format!(
                "jpeg quality must be 1-100, got {}",
                self.stream.jpeg_quality
            )));
        }
        Ok(())
    }
}

impl RecordingConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.web.http_port, 5000);
        assert_eq!(config.camera.index, 1);
        assert_eq!(config.camera.fps, 20);
        assert_eq!(config.recording.duration(), Duration::from_secs(240));
        assert_eq!(config.recording.poll_interval(), Duration::from_secs(30));

        let schedule: Vec<String> = config
            .recording
            .schedule
            .iter()
            .map(|e| e.to_string())
            .collect();
        assert_eq!(schedule, ["13:49", "08:59", "15:59", "22:59"]);
    }

    #[test]
    fn test_schedule_entry_parse() {
        assert_eq!(
            "08:59".parse::<ScheduleEntry>(),
            Ok(ScheduleEntry::new(8, 59).unwrap())
        );
        assert!("8:59".parse::<ScheduleEntry>().is_err());
        assert!("24:00".parse::<ScheduleEntry>().is_err());
        assert!("12:60".parse::<ScheduleEntry>().is_err());
        assert!("noon".parse::<ScheduleEntry>().is_err());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = AppConfig::default();
        config.camera.fps = 0;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        let mut config = AppConfig::default();
        config.recording.extension = "../mp4".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.stream.jpeg_quality = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_schedule_validation() {
        let mut config = AppConfig::default();
        config.recording.schedule.clear();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        let mut config = AppConfig::default();
        config.recording.schedule.push("08:59".parse().unwrap());
        match config.validate() {
            Err(AppError::Config(message)) => assert!(message.contains("08:59")),
            other => panic!("expected a config error, got {:?}", other),
        }
    }

    #[test]
    fn test_json_round_trip_keeps_schedule_format() {
        let config = AppConfig::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["recording"]["schedule"][1], "08:59");
        assert_eq!(json["camera"]["format"], "MJPEG");

        let parsed: AppConfig = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.recording.schedule, config.recording.schedule);
    }
}
