//! Recording file names
//!
//! Recordings are named `recording_<YYYYMMDD>_<HHMMSS>.<ext>` after the wall
//! clock time at which the job started. Lexicographic order of these names is
//! chronological order.

use chrono::NaiveDateTime;

/// File name prefix of every recording
pub const RECORDING_PREFIX: &str = "recording";

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const DISPLAY_FORMAT: &str = "%B %d, %Y at %I:%M %p";

/// Build the file name for a recording started at `started_at`
pub fn recording_file_name(started_at: NaiveDateTime, extension: &str) -> String {
    format!(
        "{}_{}.{}",
        RECORDING_PREFIX,
        started_at.format(TIMESTAMP_FORMAT),
        extension
    )
}

/// Parse the start time embedded in a recording file name.
///
/// The timestamp is read from the second and third `_`-separated fields, the
/// third one cut at its first `.`. Returns `None` for names that don't follow
/// the pattern.
pub fn parse_recorded_at(file_name: &str) -> Option<NaiveDateTime> {
    let mut fields = file_name.split('_');
    let date = fields.nth(1)?;
    let time = fields.next()?.split('.').next()?;
    NaiveDateTime::parse_from_str(&format!("{}_{}", date, time), TIMESTAMP_FORMAT).ok()
}

/// Human readable form used in the catalog, e.g. `March 15, 2024 at 12:00 PM`
pub fn display_time(recorded_at: NaiveDateTime) -> String {
    recorded_at.format(DISPLAY_FORMAT).to_string()
}
