//! Remote upload abstraction over the cloud storage CLI.

use std::path::Path;

use async_trait::async_trait;
use homemon_types::{capture::RemoteFolder, MonitorError, Result};
use tracing::debug;

mod onedrive;

pub use onedrive::OneDriveCliUploader;

/// Every operation is best-effort from the cycle's point of view: callers log
/// a returned [`MonitorError::Upload`] and carry on.
#[async_trait]
pub trait RemoteUploader: Send + Sync {
    /// Create `folder` below the remote root. Already existing is fine.
    async fn ensure_remote_folder(&self, folder: &RemoteFolder) -> Result<()>;
    async fn upload_file(&self, local_path: &Path, folder: &RemoteFolder) -> Result<()>;
    async fn upload_log(&self, log_path: &Path, folder: &RemoteFolder) -> Result<()>;
}

/// Uploader that keeps everything local.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullUploader;

#[async_trait]
impl RemoteUploader for NullUploader {
    async fn ensure_remote_folder(&self, folder: &RemoteFolder) -> Result<()> {
        debug!("Null uploader: skipping mkdir {:?}", folder.as_str());
        Ok(())
    }

    async fn upload_file(&self, local_path: &Path, _folder: &RemoteFolder) -> Result<()> {
        debug!("Null uploader: skipping {}", local_path.display());
        Ok(())
    }

    async fn upload_log(&self, log_path: &Path, _folder: &RemoteFolder) -> Result<()> {
        debug!("Null uploader: skipping log {}", log_path.display());
        Ok(())
    }
}

pub fn upload_error(message: impl Into<String>) -> MonitorError {
    MonitorError::Upload(message.into())
}
