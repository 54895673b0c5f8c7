use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use homemon_archive::{FsArchive, LocalArchive};
use homemon_camera::{CaptureSource, CommandCamera, MockCamera};
use homemon_ops::{init_tracing, probe_egress_address, FileStatusLog, StatusLog};
use homemon_orchestrator::{CaptureCycle, Scheduler};
use homemon_types::{clock::SystemClock, config::MonitorConfig};
use homemon_uploader::{NullUploader, OneDriveCliUploader, RemoteUploader};
use tracing::info;

/// Take a picture every few minutes, archive it by date, push it to
/// OneDrive and delete the local copy.
#[derive(Debug, Parser)]
#[command(name = "home-monitor", version)]
struct Cli {
    /// Interval between captures, in minutes.
    #[arg(value_name = "interval-minutes")]
    interval_minutes: Option<f64>,

    /// Optional TOML file overriding the built-in defaults.
    #[arg(long, env = "HOME_MONITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Stop after this many cycles instead of running forever.
    #[arg(long)]
    cycles: Option<u64>,

    /// Use a synthetic camera and skip uploads.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config.ops)?;

    let log: Arc<dyn StatusLog> = Arc::new(FileStatusLog::open(&config.ops.log_file)?);
    if cli.dry_run {
        log.info("Started in dry-run mode");
    } else {
        // Uploads need a route out; failing here aborts before the loop.
        let egress = probe_egress_address(&config.ops.probe_target)
            .await
            .context("startup connectivity check failed")?;
        log.info(&format!("Started at {egress}"));
    }

    let mut scheduler = Scheduler::from_minutes(config.scheduler.interval_minutes)?;
    if let Some(cycles) = cli.cycles {
        scheduler = scheduler.with_max_cycles(cycles);
    }
    info!(
        "Capturing every {:?} into {}",
        scheduler.interval(),
        config.archive.root
    );

    let archive = FsArchive::new(&config.archive);
    if cli.dry_run {
        run(&config, &scheduler, MockCamera::default(), archive, NullUploader, log).await
    } else {
        let camera = CommandCamera::new(config.camera.clone())?;
        let uploader = OneDriveCliUploader::new(&config.uploader);
        run(&config, &scheduler, camera, archive, uploader, log).await
    }
}

async fn run<C, A, U>(
    config: &MonitorConfig,
    scheduler: &Scheduler,
    camera: C,
    archive: A,
    uploader: U,
    log: Arc<dyn StatusLog>,
) -> Result<()>
where
    C: CaptureSource,
    A: LocalArchive,
    U: RemoteUploader,
{
    let mut cycle = CaptureCycle::new(camera, archive, uploader, Arc::new(SystemClock), log)
        .with_step_timeout(config.scheduler.step_timeout());
    let completed = scheduler.run(&mut cycle).await;
    info!(
        "Finished after {} cycles ({} frames captured)",
        completed,
        cycle.camera().metrics().captured
    );
    Ok(())
}

fn load_config(cli: &Cli) -> Result<MonitorConfig> {
    let mut config = match &cli.config {
        Some(path) => MonitorConfig::from_file(path)?,
        None => MonitorConfig::default(),
    };
    if let Some(minutes) = cli.interval_minutes {
        config.scheduler.interval_minutes = minutes;
    }
    config.validate()?;
    Ok(config)
}
