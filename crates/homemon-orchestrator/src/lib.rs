//! Capture cycle controller: capture, archive, upload, clean up.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use homemon_archive::{write_error, LocalArchive};
use homemon_camera::{capture_error, CaptureSource};
use homemon_ops::StatusLog;
use homemon_types::{
    capture::{CaptureRecord, CycleOutcome, DayBucket, RemoteFolder, SkipReason, UploadStatus},
    clock::Clock,
    MonitorError, Result,
};
use homemon_uploader::{upload_error, RemoteUploader};
use tokio::time::timeout;
use tracing::{debug, info};

mod scheduler;

pub use scheduler::{PeriodicTask, Scheduler};

pub struct CaptureCycle<C, A, U>
where
    C: CaptureSource,
    A: LocalArchive,
    U: RemoteUploader,
{
    camera: C,
    archive: A,
    uploader: U,
    clock: Arc<dyn Clock>,
    log: Arc<dyn StatusLog>,
    step_timeout: Option<Duration>,
    /// Last day whose remote folder was requested, successful or not.
    remote_bucket: Option<DayBucket>,
}

impl<C, A, U> CaptureCycle<C, A, U>
where
    C: CaptureSource,
    A: LocalArchive,
    U: RemoteUploader,
{
    pub fn new(
        camera: C,
        archive: A,
        uploader: U,
        clock: Arc<dyn Clock>,
        log: Arc<dyn StatusLog>,
    ) -> Self {
        Self {
            camera,
            archive,
            uploader,
            clock,
            log,
            step_timeout: None,
            remote_bucket: None,
        }
    }

    /// Bound every collaborator call; a timed out step fails like any other.
    pub fn with_step_timeout(mut self, step_timeout: Option<Duration>) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let frame = match within(self.step_timeout, "capture", self.camera.capture(), capture_error)
            .await
        {
            Ok(frame) => frame,
            Err(err) => {
                self.log.error(&format!("Cannot open camera: {err}"));
                return CycleOutcome::Skipped(SkipReason::Capture(err.to_string()));
            }
        };

        let timestamp = self.clock.now();
        let bucket = DayBucket::for_timestamp(timestamp);
        let persisted = async {
            let dir = within(
                self.step_timeout,
                "bucket",
                self.archive.ensure_day_bucket(&bucket),
                write_error,
            )
            .await?;
            within(
                self.step_timeout,
                "write",
                self.archive.write(&dir, timestamp, &frame),
                write_error,
            )
            .await
        }
        .await;
        drop(frame);

        let path = match persisted {
            Ok(path) => path,
            Err(err) => {
                self.log.error(&format!("Failed to save capture: {err}"));
                return CycleOutcome::Skipped(SkipReason::Write(err.to_string()));
            }
        };
        let mut record = CaptureRecord::new(timestamp, path);
        self.log
            .info(&format!("Capture saved to {}.", record.local_path.display()));

        self.upload(&mut record).await;

        match within(
            self.step_timeout,
            "remove",
            self.archive.remove(&record.local_path),
            write_error,
        )
        .await
        {
            Ok(()) => {
                record.removed = true;
                self.log.info("Local capture removed.");
            }
            Err(err) => self
                .log
                .warn(&format!("Failed to remove local capture: {err}")),
        }

        info!(
            "Cycle {} finished: frame {:?}, log {:?}",
            record.id, record.frame_upload, record.log_upload
        );
        CycleOutcome::Ok(record)
    }

    async fn upload(&mut self, record: &mut CaptureRecord) {
        let folder = RemoteFolder::for_bucket(&record.bucket);
        if self.remote_bucket != Some(record.bucket) {
            self.remote_bucket = Some(record.bucket);
            if let Err(err) = within(
                self.step_timeout,
                "mkdir",
                self.uploader.ensure_remote_folder(&folder),
                upload_error,
            )
            .await
            {
                self.log
                    .warn(&format!("Remote folder {} not created: {err}", folder.as_str()));
            }
        }

        record.frame_upload = match within(
            self.step_timeout,
            "upload",
            self.uploader.upload_file(&record.local_path, &folder),
            upload_error,
        )
        .await
        {
            Ok(()) => {
                self.log.info("Capture uploaded.");
                UploadStatus::Uploaded
            }
            Err(err) => {
                self.log.warn(&format!("Capture upload failed: {err}"));
                UploadStatus::Failed
            }
        };

        let Some(log_path) = self.log.path() else {
            debug!("Status log has no backing file; skipping log upload");
            return;
        };
        record.log_upload = match within(
            self.step_timeout,
            "log upload",
            self.uploader.upload_log(log_path, &RemoteFolder::root()),
            upload_error,
        )
        .await
        {
            Ok(()) => UploadStatus::Uploaded,
            Err(err) => {
                self.log.warn(&format!("Log upload failed: {err}"));
                UploadStatus::Failed
            }
        };
    }
}

#[async_trait]
impl<C, A, U> PeriodicTask for CaptureCycle<C, A, U>
where
    C: CaptureSource,
    A: LocalArchive,
    U: RemoteUploader,
{
    async fn tick(&mut self, index: u64) {
        debug!("Starting capture cycle {}", index);
        if let CycleOutcome::Skipped(reason) = self.run_cycle().await {
            info!("Cycle {} skipped: {:?}", index, reason);
        }
    }
}

async fn within<T, F, E>(limit: Option<Duration>, step: &str, fut: F, on_timeout: E) -> Result<T>
where
    F: Future<Output = Result<T>>,
    E: FnOnce(String) -> MonitorError,
{
    match limit {
        Some(limit) => timeout(limit, fut)
            .await
            .map_err(|_| on_timeout(format!("{step} timed out after {limit:?}")))?,
        None => fut.await,
    }
}
