use thiserror::Error;

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;

/// Unified error type covering the failure classes of a capture cycle.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Camera could not be opened or returned no frame.
    #[error("capture error: {0}")]
    Capture(String),
    /// Local archive I/O or encoding failure.
    #[error("write error: {0}")]
    Write(String),
    /// Remote tool or network failure.
    #[error("upload error: {0}")]
    Upload(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
