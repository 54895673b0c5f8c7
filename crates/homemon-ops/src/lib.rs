//! Operational helpers: tracing setup, the status log, startup probe.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use chrono::{Local, NaiveDateTime};
use homemon_types::{config::OpsConfig, MonitorError, Result};
use tokio::net::{lookup_host, UdpSocket};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| ops_error(format!("failed to create log filter: {err}")))?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| ops_error(format!("tracing init error: {err}")))?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

impl StatusLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLevel::Info => "INFO",
            StatusLevel::Warning => "WARNING",
            StatusLevel::Error => "ERROR",
        }
    }
}

/// Append-only status log handed to the capture cycle.
pub trait StatusLog: Send + Sync {
    fn record(&self, level: StatusLevel, message: &str);

    /// File backing the log, if any; uploaded alongside captures.
    fn path(&self) -> Option<&Path>;

    fn info(&self, message: &str) {
        self.record(StatusLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.record(StatusLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.record(StatusLevel::Error, message);
    }
}

/// `MM/DD/YYYY HH:MM:SS AM - LEVEL - message`
pub fn format_status_line(at: NaiveDateTime, level: StatusLevel, message: &str) -> String {
    format!(
        "{} - {} - {}",
        at.format("%m/%d/%Y %I:%M:%S %p"),
        level.as_str(),
        message
    )
}

fn mirror_to_tracing(level: StatusLevel, message: &str) {
    match level {
        StatusLevel::Info => info!("{message}"),
        StatusLevel::Warning => warn!("{message}"),
        StatusLevel::Error => error!("{message}"),
    }
}

/// Status log appended to a file in the working directory.
pub struct FileStatusLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileStatusLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| {
                ops_error(format!("failed to open log file {}: {err}", path.display()))
            })?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }
}

impl StatusLog for FileStatusLog {
    fn record(&self, level: StatusLevel, message: &str) {
        mirror_to_tracing(level, message);
        let line = format_status_line(Local::now().naive_local(), level, message);
        let written = self
            .file
            .lock()
            .map_err(|_| ops_error("log file lock poisoned"))
            .and_then(|mut file| {
                writeln!(file, "{line}")
                    .and_then(|_| file.flush())
                    .map_err(|err| ops_error(format!("log write failed: {err}")))
            });
        if let Err(err) = written {
            warn!("Status line dropped ({}): {}", err, line);
        }
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// In-memory status log for tests and dry runs.
#[derive(Clone, Default)]
pub struct MemoryStatusLog {
    lines: Arc<Mutex<Vec<(StatusLevel, String)>>>,
    path: Option<PathBuf>,
}

impl MemoryStatusLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend the log lives at `path` so that it gets uploaded.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            lines: Arc::default(),
            path: Some(path.into()),
        }
    }

    pub fn snapshot(&self) -> Vec<(StatusLevel, String)> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn count(&self, level: StatusLevel) -> usize {
        self.snapshot().iter().filter(|(l, _)| *l == level).count()
    }
}

impl StatusLog for MemoryStatusLog {
    fn record(&self, level: StatusLevel, message: &str) {
        mirror_to_tracing(level, message);
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, message.to_string()));
        }
    }

    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Resolve `target` and report which local address traffic would leave from.
/// Nothing is sent; a UDP `connect` only selects a route.
pub async fn probe_egress_address(target: &str) -> Result<IpAddr> {
    let remote = lookup_host(target)
        .await
        .map_err(|err| ops_error(format!("failed to resolve {target}: {err}")))?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| ops_error(format!("no IPv4 address for {target}")))?;

    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(|err| ops_error(format!("failed to bind probe socket: {err}")))?;
    socket
        .connect(remote)
        .await
        .map_err(|err| ops_error(format!("no route to {remote}: {err}")))?;
    let local = socket
        .local_addr()
        .map_err(|err| ops_error(format!("failed to read local address: {err}")))?;
    Ok(local.ip())
}

pub fn ops_error(message: impl Into<String>) -> MonitorError {
    MonitorError::Ops(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;

    #[test]
    fn status_line_uses_twelve_hour_clock() {
        let at = NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_opt(15, 4, 5))
            .expect("valid timestamp");
        assert_eq!(
            format_status_line(at, StatusLevel::Error, "Cannot open camera."),
            "01/02/2024 03:04:05 PM - ERROR - Cannot open camera."
        );
    }

    #[test]
    fn file_log_appends_across_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("home-monitor.log");

        let log = FileStatusLog::open(&path).expect("open log");
        log.info("Capture saved.");
        drop(log);
        let log = FileStatusLog::open(&path).expect("reopen log");
        log.warn("Upload failed.");
        assert_eq!(log.path(), Some(path.as_path()));

        let contents = fs::read_to_string(&path).expect("read log");
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" - INFO - Capture saved."));
        assert!(lines[1].ends_with(" - WARNING - Upload failed."));
    }

    #[test]
    fn memory_log_counts_levels() {
        let log = MemoryStatusLog::new();
        log.info("a");
        log.error("b");
        log.error("c");
        assert_eq!(log.count(StatusLevel::Error), 2);
        assert_eq!(log.count(StatusLevel::Info), 1);
        assert!(log.path().is_none());
    }

    #[tokio::test]
    async fn unresolvable_probe_target_is_error() {
        let err = probe_egress_address("not a host")
            .await
            .expect_err("invalid target");
        assert!(matches!(err, MonitorError::Ops(_)));
    }

    #[tokio::test]
    async fn loopback_probe_reports_loopback() {
        let ip = probe_egress_address("127.0.0.1:9")
            .await
            .expect("loopback route");
        assert!(ip.is_loopback());
    }
}
