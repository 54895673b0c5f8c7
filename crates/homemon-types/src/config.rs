use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{MonitorError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub program: String,
    /// Arguments passed to `program`; `{device}` is substituted.
    pub args: Vec<String>,
    pub device: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".into(),
            args: [
                "-hide_banner",
                "-loglevel",
                "error",
                "-f",
                "v4l2",
                "-i",
                "{device}",
                "-frames:v",
                "1",
                "-f",
                "image2pipe",
                "-vcodec",
                "png",
                "-",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            device: "/dev/video0".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub root: String,
    pub jpeg_quality: u8,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            root: "archive".into(),
            jpeg_quality: 90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploaderConfig {
    pub program: String,
    pub remote_root: String,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            program: "onedrive-cli".into(),
            remote_root: "home-monitor".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    pub log_level: String,
    pub log_file: String,
    /// `host:port` used for the startup egress probe.
    pub probe_target: String,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            log_file: "home-monitor.log".into(),
            probe_target: "google.com:80".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub interval_minutes: f64,
    /// Per-step timeout for collaborator calls; `None` waits indefinitely.
    pub step_timeout_secs: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 1.0,
            step_timeout_secs: None,
        }
    }
}

/// Convert a positive, finite number of minutes into a sleep interval.
pub fn interval_from_minutes(minutes: f64) -> Result<Duration> {
    if !minutes.is_finite() || minutes <= 0.0 {
        return Err(MonitorError::Configuration(format!(
            "interval must be a positive number of minutes, got {minutes}"
        )));
    }
    Duration::try_from_secs_f64(minutes * 60.0).map_err(|err| {
        MonitorError::Configuration(format!("interval of {minutes} minutes is out of range: {err}"))
    })
}

impl SchedulerConfig {
    pub fn interval(&self) -> Result<Duration> {
        interval_from_minutes(self.interval_minutes)
    }

    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub camera: CameraConfig,
    pub archive: ArchiveConfig,
    pub uploader: UploaderConfig,
    pub ops: OpsConfig,
    pub scheduler: SchedulerConfig,
}

impl MonitorConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            MonitorError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            MonitorError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.scheduler.interval()?;
        if self.scheduler.step_timeout_secs == Some(0) {
            return Err(MonitorError::Configuration(
                "scheduler.step_timeout_secs must be greater than zero when set".into(),
            ));
        }
        if !(1..=100).contains(&self.archive.jpeg_quality) {
            return Err(MonitorError::Configuration(
                "archive.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        let required = [
            ("camera.program", &self.camera.program),
            ("archive.root", &self.archive.root),
            ("uploader.program", &self.uploader.program),
            ("uploader.remote_root", &self.uploader.remote_root),
            ("ops.log_file", &self.ops.log_file),
            ("ops.probe_target", &self.ops.probe_target),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(MonitorError::Configuration(format!(
                    "{name} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn load_partial_config_from_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("home-monitor.toml");
        fs::write(
            &path,
            r#"
[scheduler]
interval_minutes = 0.5
step_timeout_secs = 20

[uploader]
remote_root = "cams/front-door"
"#,
        )
        .expect("write temp config");

        let loaded = MonitorConfig::from_file(&path).expect("load config");
        assert_eq!(loaded.scheduler.interval_minutes, 0.5);
        assert_eq!(
            loaded.scheduler.interval().expect("interval"),
            Duration::from_secs(30)
        );
        assert_eq!(loaded.scheduler.step_timeout(), Some(Duration::from_secs(20)));
        assert_eq!(loaded.uploader.remote_root, "cams/front-door");
        assert_eq!(loaded.uploader.program, "onedrive-cli");
        assert_eq!(loaded.archive.root, "archive");
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let err = MonitorConfig::from_file("/nonexistent/home-monitor.toml")
            .expect_err("missing file");
        assert!(matches!(err, MonitorError::Configuration(_)));
    }

    #[test]
    fn validate_configuration_rules() {
        let mut config = MonitorConfig::default();
        assert!(config.validate().is_ok());

        config.scheduler.interval_minutes = 0.0;
        assert!(config.validate().is_err());
        config.scheduler.interval_minutes = f64::NAN;
        assert!(config.validate().is_err());
        config.scheduler.interval_minutes = 1e300;
        assert!(matches!(
            config.validate(),
            Err(MonitorError::Configuration(_))
        ));
        config.scheduler.interval_minutes = 1.0;

        config.scheduler.step_timeout_secs = Some(0);
        assert!(config.validate().is_err());
        config.scheduler.step_timeout_secs = None;

        config.archive.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.archive.jpeg_quality = 75;

        config.uploader.remote_root = "  ".into();
        assert!(config.validate().is_err());
        config.uploader.remote_root = "home-monitor".into();
        assert!(config.validate().is_ok());
    }
}
