//! Date-bucketed local frame archive.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use homemon_types::{
    capture::{frame_file_name, DayBucket},
    config::ArchiveConfig,
    frame::Frame,
    MonitorError, Result,
};
use image::{codecs::jpeg::JpegEncoder, ColorType};
use tokio::fs;
use tracing::{debug, warn};

#[async_trait]
pub trait LocalArchive: Send + Sync {
    /// Create the bucket directory if it is missing and return its path.
    async fn ensure_day_bucket(&self, bucket: &DayBucket) -> Result<PathBuf>;
    /// Encode `frame` and store it under `bucket_dir`, named by `timestamp`.
    async fn write(
        &self,
        bucket_dir: &Path,
        timestamp: NaiveDateTime,
        frame: &Frame,
    ) -> Result<PathBuf>;
    /// Delete a stored frame. An already absent file is not an error.
    async fn remove(&self, path: &Path) -> Result<()>;
}

/// Filesystem archive laid out as `<root>/<YYYY-MM-DD>/<YYYY-MM-DD_HHMMSS>.jpg`.
#[derive(Debug, Clone)]
pub struct FsArchive {
    root: PathBuf,
    jpeg_quality: u8,
}

impl FsArchive {
    pub fn new(config: &ArchiveConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root),
            jpeg_quality: config.jpeg_quality.clamp(1, 100),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn encode(&self, frame: &Frame) -> Result<Vec<u8>> {
        if frame.is_empty() || !frame.is_consistent() {
            return Err(write_error(format!(
                "frame buffer does not match {}x{} RGB",
                frame.width, frame.height
            )));
        }
        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, self.jpeg_quality)
            .encode(&frame.pixels, frame.width, frame.height, ColorType::Rgb8)
            .map_err(|err| write_error(format!("jpeg encoding failed: {err}")))?;
        Ok(encoded)
    }
}

#[async_trait]
impl LocalArchive for FsArchive {
    async fn ensure_day_bucket(&self, bucket: &DayBucket) -> Result<PathBuf> {
        let dir = self.root.join(bucket.name());
        fs::create_dir_all(&dir).await.map_err(|err| {
            write_error(format!("failed to create bucket {}: {err}", dir.display()))
        })?;
        debug!("Day bucket ready at {:?}", dir);
        Ok(dir)
    }

    async fn write(
        &self,
        bucket_dir: &Path,
        timestamp: NaiveDateTime,
        frame: &Frame,
    ) -> Result<PathBuf> {
        let encoded = self.encode(frame)?;
        let path = bucket_dir.join(frame_file_name(timestamp));
        if let Err(err) = fs::write(&path, &encoded).await {
            // Don't leave a truncated JPEG behind.
            if let Err(cleanup) = fs::remove_file(&path).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!("Partial capture {} left behind: {cleanup}", path.display());
                }
            }
            return Err(write_error(format!(
                "failed to write {}: {err}",
                path.display()
            )));
        }
        debug!("Encoded {} ({} bytes)", path.display(), encoded.len());
        Ok(path)
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("Capture {} already absent", path.display());
                Ok(())
            }
            Err(err) => Err(write_error(format!(
                "failed to remove {}: {err}",
                path.display()
            ))),
        }
    }
}

pub fn write_error(message: impl Into<String>) -> MonitorError {
    MonitorError::Write(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn archive(dir: &TempDir) -> FsArchive {
        FsArchive::new(&ArchiveConfig {
            root: dir.path().join("archive").to_string_lossy().into_owned(),
            jpeg_quality: 80,
        })
    }

    fn at(hh: u32, mm: u32, ss: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(hh, mm, ss))
            .expect("valid timestamp")
    }

    #[tokio::test]
    async fn ensure_day_bucket_is_idempotent() {
        let dir = tempfile::tempdir().expect("temp dir");
        let archive = archive(&dir);
        let bucket = DayBucket::for_timestamp(at(9, 0, 0));

        let first = archive.ensure_day_bucket(&bucket).await.expect("create");
        let second = archive.ensure_day_bucket(&bucket).await.expect("exists");
        assert_eq!(first, second);
        assert!(first.ends_with("archive/2024-01-01"));
        assert!(first.is_dir());
    }

    #[tokio::test]
    async fn write_encodes_jpeg_named_by_timestamp() {
        let dir = tempfile::tempdir().expect("temp dir");
        let archive = archive(&dir);
        let timestamp = at(0, 1, 0);
        let bucket_dir = archive
            .ensure_day_bucket(&DayBucket::for_timestamp(timestamp))
            .await
            .expect("bucket");

        let path = archive
            .write(&bucket_dir, timestamp, &Frame::solid(16, 8, [200, 10, 10]))
            .await
            .expect("write");
        assert!(path.ends_with("2024-01-01/2024-01-01_000100.jpg"));

        let decoded = image::open(&path).expect("decode jpeg");
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[tokio::test]
    async fn write_into_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().expect("temp dir");
        let archive = archive(&dir);
        let missing = dir.path().join("nope");

        let err = archive
            .write(&missing, at(1, 2, 3), &Frame::solid(2, 2, [0, 0, 0]))
            .await
            .expect_err("missing bucket");
        assert!(matches!(err, MonitorError::Write(_)));
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn inconsistent_frame_is_write_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let archive = archive(&dir);
        let bucket_dir = archive
            .ensure_day_bucket(&DayBucket::for_timestamp(at(0, 0, 0)))
            .await
            .expect("bucket");

        let err = archive
            .write(&bucket_dir, at(0, 0, 0), &Frame::from_rgb(4, 4, vec![1, 2, 3]))
            .await
            .expect_err("bad frame");
        assert!(matches!(err, MonitorError::Write(_)));
        assert!(!bucket_dir.join("2024-01-01_000000.jpg").exists());
    }

    #[tokio::test]
    async fn remove_tolerates_absent_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let archive = archive(&dir);
        let bucket_dir = archive
            .ensure_day_bucket(&DayBucket::for_timestamp(at(0, 0, 0)))
            .await
            .expect("bucket");
        let path = archive
            .write(&bucket_dir, at(0, 0, 30), &Frame::solid(2, 2, [9, 9, 9]))
            .await
            .expect("write");

        archive.remove(&path).await.expect("first remove");
        assert!(!path.exists());
        archive.remove(&path).await.expect("second remove is a no-op");
    }
}
