use std::path::{Path, PathBuf};

use async_trait::async_trait;
use homemon_types::{capture::RemoteFolder, config::UploaderConfig, Result};
use tokio::process::Command;
use tracing::{debug, info};

use crate::{upload_error, RemoteUploader};

/// Drives `onedrive-cli` (`mkdir <path>`, `put <file> <path>`).
pub struct OneDriveCliUploader {
    program: PathBuf,
    remote_root: String,
}

impl OneDriveCliUploader {
    pub fn new(config: &UploaderConfig) -> Self {
        Self {
            program: PathBuf::from(&config.program),
            remote_root: config.remote_root.clone(),
        }
    }

    fn mkdir_args(&self, folder: &RemoteFolder) -> Vec<String> {
        vec!["mkdir".into(), folder.under(&self.remote_root)]
    }

    fn put_args(&self, local_path: &Path, folder: &RemoteFolder) -> Vec<String> {
        vec![
            "put".into(),
            local_path.to_string_lossy().into_owned(),
            folder.under(&self.remote_root),
        ]
    }

    async fn run(&self, args: &[String]) -> Result<()> {
        let output = Command::new(&self.program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| {
                upload_error(format!(
                    "failed to run {:?} {}: {err}",
                    self.program,
                    args.join(" ")
                ))
            })?;

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if !stdout.trim().is_empty() {
                debug!("{:?} output: {}", self.program, stdout.trim());
            }
            Ok(())
        } else {
            Err(upload_error(format!(
                "{:?} {} exited with {}: {}",
                self.program,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

#[async_trait]
impl RemoteUploader for OneDriveCliUploader {
    async fn ensure_remote_folder(&self, folder: &RemoteFolder) -> Result<()> {
        self.run(&self.mkdir_args(folder)).await
    }

    async fn upload_file(&self, local_path: &Path, folder: &RemoteFolder) -> Result<()> {
        self.run(&self.put_args(local_path, folder)).await?;
        info!(
            "Uploaded {} to {}",
            local_path.display(),
            folder.under(&self.remote_root)
        );
        Ok(())
    }

    async fn upload_log(&self, log_path: &Path, folder: &RemoteFolder) -> Result<()> {
        self.run(&self.put_args(log_path, folder)).await
    }
}
