//! Camera abstraction: one frame per call.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use homemon_types::{frame::Frame, MonitorError, Result};
use tracing::info;

mod command;

pub use command::CommandCamera;

/// Running capture counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CaptureMetrics {
    pub captured: u64,
    pub failed: u64,
    pub last_capture_ms: Option<u64>,
}

#[async_trait]
pub trait CaptureSource: Send + Sync {
    /// Grab a single frame. Fails with [`MonitorError::Capture`] when the
    /// device cannot be opened or yields nothing.
    async fn capture(&self) -> Result<Frame>;
    fn metrics(&self) -> CaptureMetrics;
}

/// Synthetic camera for dry runs and tests.
#[derive(Clone)]
pub struct MockCamera {
    width: u32,
    height: u32,
    failing: Arc<AtomicBool>,
    captured: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl MockCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            failing: Arc::new(AtomicBool::new(false)),
            captured: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Make subsequent captures fail as if the device were unplugged.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new(64, 48)
    }
}

#[async_trait]
impl CaptureSource for MockCamera {
    async fn capture(&self) -> Result<Frame> {
        if self.failing.load(Ordering::SeqCst) {
            self.failed.fetch_add(1, Ordering::SeqCst);
            return Err(capture_error("cannot open camera (mock device offline)"));
        }
        let count = self.captured.fetch_add(1, Ordering::SeqCst);
        let shade = (count % 256) as u8;
        info!("Mock camera frame {} ({}x{})", count, self.width, self.height);
        Ok(Frame::solid(self.width, self.height, [shade, 128, 255 - shade]))
    }

    fn metrics(&self) -> CaptureMetrics {
        CaptureMetrics {
            captured: self.captured.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            last_capture_ms: None,
        }
    }
}

/// Generate an error aligned with capture semantics.
pub fn capture_error(message: impl Into<String>) -> MonitorError {
    MonitorError::Capture(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_camera_produces_consistent_frames() {
        let camera = MockCamera::new(8, 6);
        let frame = camera.capture().await.expect("frame");
        assert_eq!((frame.width, frame.height), (8, 6));
        assert!(frame.is_consistent());
        assert_eq!(camera.metrics().captured, 1);
    }

    #[tokio::test]
    async fn failing_mock_camera_reports_capture_error() {
        let camera = MockCamera::default();
        camera.set_failing(true);
        let err = camera.capture().await.expect_err("offline camera");
        assert!(matches!(err, MonitorError::Capture(_)));
        assert_eq!(camera.metrics().failed, 1);

        camera.set_failing(false);
        assert!(camera.capture().await.is_ok());
    }
}
