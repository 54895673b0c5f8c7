use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Instant,
};

use async_trait::async_trait;
use homemon_types::{config::CameraConfig, frame::Frame, Result};
use tokio::process::Command;

use crate::{capture_error, CaptureMetrics, CaptureSource};

const DEVICE_PLACEHOLDER: &str = "{device}";

/// Grabs frames by running an external program that writes one encoded
/// image to stdout (ffmpeg against a V4L2 device by default).
pub struct CommandCamera {
    config: CameraConfig,
    program: PathBuf,
    metrics: Arc<Mutex<CaptureMetrics>>,
}

impl CommandCamera {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.program.trim().is_empty() {
            return Err(capture_error("camera program is not configured"));
        }
        let program = PathBuf::from(&config.program);
        Ok(Self {
            config,
            program,
            metrics: Arc::new(Mutex::new(CaptureMetrics::default())),
        })
    }

    fn args(&self) -> Vec<String> {
        self.config
            .args
            .iter()
            .map(|arg| arg.replace(DEVICE_PLACEHOLDER, &self.config.device))
            .collect()
    }

    async fn grab(&self) -> Result<Vec<u8>> {
        let args = self.args();
        let output = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| {
                capture_error(format!(
                    "cannot open camera {}: failed to run {:?}: {err}",
                    self.config.device, self.program
                ))
            })?;

        if !output.status.success() {
            return Err(capture_error(format!(
                "cannot open camera {} ({}): {}",
                self.config.device,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if output.stdout.is_empty() {
            return Err(capture_error(format!(
                "camera {} returned no frame",
                self.config.device
            )));
        }
        Ok(output.stdout)
    }

    fn record(&self, start: Instant, ok: bool) {
        if let Ok(mut guard) = self.metrics.lock() {
            if ok {
                guard.captured += 1;
                guard.last_capture_ms = Some(start.elapsed().as_millis() as u64);
            } else {
                guard.failed += 1;
            }
        }
    }
}

#[async_trait]
impl CaptureSource for CommandCamera {
    async fn capture(&self) -> Result<Frame> {
        let start = Instant::now();
        let result = self.grab().await.and_then(|raw| decode_frame(&raw));
        self.record(start, result.is_ok());
        if let Ok(frame) = &result {
            tracing::debug!(
                "Captured {}x{} frame from {}",
                frame.width,
                frame.height,
                self.config.device
            );
        }
        result
    }

    fn metrics(&self) -> CaptureMetrics {
        self.metrics.lock().map(|m| *m).unwrap_or_default()
    }
}

fn decode_frame(raw: &[u8]) -> Result<Frame> {
    let img = image::load_from_memory(raw)
        .map_err(|err| capture_error(format!("failed to decode camera frame: {err}")))?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    let frame = Frame::from_rgb(width, height, rgb.into_raw());
    if frame.is_empty() {
        return Err(capture_error("camera returned an empty frame"));
    }
    Ok(frame)
}
