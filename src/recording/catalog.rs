//! Listing and lookup of recorded clips

use chrono::NaiveDateTime;
use serde::Serialize;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use super::naming::{display_time, parse_recorded_at};
use crate::error::{AppError, Result};

/// One recording on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingEntry {
    pub file_name: String,
    pub size: u64,
    /// Start time parsed from the file name, if it follows the naming scheme
    pub recorded_at: Option<NaiveDateTime>,
}

impl RecordingEntry {
    /// "Recording from March 15, 2024 at 12:00 PM", or the raw file name
    pub fn display_label(&self) -> String {
        match self.recorded_at {
            Some(at) => format!("Recording from {}", display_time(at)),
            None => self.file_name.clone(),
        }
    }
}

/// Read-only view of the recordings directory
#[derive(Debug, Clone)]
pub struct RecordingCatalog {
    dir: PathBuf,
    extension: String,
}

impl RecordingCatalog {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    /// Recordings, newest first by file name. A missing directory is empty.
    pub fn list(&self) -> Result<Vec<RecordingEntry>> {
        let read_dir = match std::fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Recordings directory {} does not exist", self.dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let suffix = format!(".{}", self.extension);
        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry?;
            let Ok(file_name) = dir_entry.file_name().into_string() else {
                continue;
            };
            if !file_name.ends_with(&suffix) {
                continue;
            }
            let metadata = dir_entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            entries.push(RecordingEntry {
                recorded_at: parse_recorded_at(&file_name),
                size: metadata.len(),
                file_name,
            });
        }

        entries.sort_by(|a, b| b.file_name.cmp(&a.file_name));
        Ok(entries)
    }

    /// Path of the recording called `name`.
    ///
    /// Only plain file names inside the directory resolve; anything with a
    /// path separator or a parent reference is treated as not found.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let not_found = || AppError::NotFound(format!("recording '{}'", name));

        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(not_found());
        }
        let mut components = Path::new(name).components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            return Err(not_found());
        }

        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(not_found());
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;

    fn catalog_with(files: &[(&str, usize)]) -> (tempfile::TempDir, RecordingCatalog) {
        let dir = tempfile::tempdir().unwrap();
        for (name, size) in files {
            fs::write(dir.path().join(name), vec![0u8; *size]).unwrap();
        }
        let catalog = RecordingCatalog::new(dir.path(), "mp4");
        (dir, catalog)
    }

    #[test]
    fn test_list_newest_first() {
        let (_dir, catalog) = catalog_with(&[
            ("recording_20240101_080000.mp4", 10),
            ("recording_20240315_120000.mp4", 20),
            ("recording_20231231_235959.mp4", 30),
            ("notes.txt", 5),
        ]);

        let entries = catalog.list().unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(
            names,
            [
                "recording_20240315_120000.mp4",
                "recording_20240101_080000.mp4",
                "recording_20231231_235959.mp4",
            ]
        );
        assert_eq!(entries[0].size, 20);
        assert_eq!(
            entries[0].recorded_at,
            NaiveDate::from_ymd_opt(2024, 3, 15)
                .unwrap()
                .and_hms_opt(12, 0, 0)
        );
    }

    #[test]
    fn test_display_label() {
        let (_dir, catalog) = catalog_with(&[
            ("recording_20240315_120000.mp4", 1),
            ("holiday.mp4", 1),
        ]);
        let labels: Vec<String> = catalog
            .list()
            .unwrap()
            .iter()
            .map(RecordingEntry::display_label)
            .collect();
        assert_eq!(
            labels,
            ["Recording from March 15, 2024 at 12:00 PM", "holiday.mp4"]
        );
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = RecordingCatalog::new(dir.path().join("nope"), "mp4");
        assert!(catalog.list().unwrap().is_empty());
    }

    #[test]
    fn test_subdirectories_are_ignored() {
        let (dir, catalog) = catalog_with(&[("recording_20240101_080000.mp4", 1)]);
        fs::create_dir(dir.path().join("old.mp4")).unwrap();
        assert_eq!(catalog.list().unwrap().len(), 1);
    }

    #[test]
    fn test_resolve() {
        let (dir, catalog) = catalog_with(&[("recording_20240101_080000.mp4", 1)]);
        assert_eq!(
            catalog.resolve("recording_20240101_080000.mp4").unwrap(),
            dir.path().join("recording_20240101_080000.mp4")
        );
        for bad in ["missing.mp4", "", "..", ".", "../etc/passwd", "a/b.mp4", "..\\x.mp4"] {
            assert!(
                matches!(catalog.resolve(bad), Err(AppError::NotFound(_))),
                "{} should not resolve",
                bad
            );
        }
    }
}
