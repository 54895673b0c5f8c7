use std::{fmt, path::PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Calendar-day grouping shared by the local archive and the remote layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DayBucket {
    pub date: NaiveDate,
}

impl DayBucket {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    pub fn for_timestamp(timestamp: NaiveDateTime) -> Self {
        Self::new(timestamp.date())
    }

    /// Directory / folder name, `YYYY-MM-DD`.
    pub fn name(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for DayBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// File name of a capture taken at `timestamp`, to second resolution.
pub fn frame_file_name(timestamp: NaiveDateTime) -> String {
    format!("{}.jpg", timestamp.format("%Y-%m-%d_%H%M%S"))
}

/// Folder relative to the uploader's remote root. An empty path is the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RemoteFolder(String);

impl RemoteFolder {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn for_bucket(bucket: &DayBucket) -> Self {
        Self(bucket.name())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full remote path below `remote_root`.
    pub fn under(&self, remote_root: &str) -> String {
        if self.is_root() {
            remote_root.to_string()
        } else {
            format!("{}/{}", remote_root.trim_end_matches('/'), self.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStatus {
    Pending,
    Uploaded,
    Failed,
}

/// Bookkeeping for one frame from capture to local removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub id: Uuid,
    pub timestamp: NaiveDateTime,
    pub bucket: DayBucket,
    pub local_path: PathBuf,
    pub frame_upload: UploadStatus,
    pub log_upload: UploadStatus,
    pub removed: bool,
}

impl CaptureRecord {
    pub fn new(timestamp: NaiveDateTime, local_path: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            bucket: DayBucket::for_timestamp(timestamp),
            local_path,
            frame_upload: UploadStatus::Pending,
            log_upload: UploadStatus::Pending,
            removed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    Capture(String),
    Write(String),
}

/// Terminal state of a single cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CycleOutcome {
    Ok(CaptureRecord),
    Skipped(SkipReason),
}

impl CycleOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, CycleOutcome::Ok(_))
    }

    pub fn record(&self) -> Option<&CaptureRecord> {
        match self {
            CycleOutcome::Ok(record) => Some(record),
            CycleOutcome::Skipped(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(hh, mm, ss))
            .expect("valid timestamp")
    }

    #[test]
    fn same_day_shares_bucket_and_midnight_splits() {
        let morning = DayBucket::for_timestamp(at(2024, 1, 1, 8, 0, 0));
        let evening = DayBucket::for_timestamp(at(2024, 1, 1, 23, 59, 59));
        let next = DayBucket::for_timestamp(at(2024, 1, 2, 0, 0, 0));
        assert_eq!(morning, evening);
        assert_eq!(morning.name(), "2024-01-01");
        assert_ne!(evening, next);
        assert_eq!(next.name(), "2024-01-02");
    }

    #[test]
    fn frame_names_use_second_resolution() {
        assert_eq!(
            frame_file_name(at(2024, 1, 1, 0, 1, 0)),
            "2024-01-01_000100.jpg"
        );
        assert_eq!(
            frame_file_name(at(2023, 12, 31, 23, 59, 7)),
            "2023-12-31_235907.jpg"
        );
    }

    #[test]
    fn remote_folder_paths() {
        let bucket = DayBucket::for_timestamp(at(2024, 3, 9, 12, 0, 0));
        assert_eq!(RemoteFolder::root().under("home-monitor"), "home-monitor");
        assert_eq!(
            RemoteFolder::for_bucket(&bucket).under("home-monitor/"),
            "home-monitor/2024-03-09"
        );
    }
}
