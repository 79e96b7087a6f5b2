//! sentineld - safety monitoring daemon
//!
//! This daemon:
//! 1. Loads configuration (JSON file + env overrides)
//! 2. Constructs the Detector and FaceID capabilities (fatal on failure)
//! 3. Starts the pipeline: per-camera capture, batch dispatch,
//!    tracking + violation engine
//! 4. Drains the alert channel to a JSON-lines file and the log
//! 5. Shuts every stage down on SIGINT within bounded latency

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::RecvTimeoutError;

use safety_sentinel::detect::backends::open_model_set;
use safety_sentinel::faceid::open_identifier;
use safety_sentinel::{JsonlAlertWriter, ModelRegistry, Pipeline, SentinelConfig};

/// Poll interval for the alert drain loop; bounds shutdown latency.
const ALERT_POLL: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "sentineld", about = "Multi-camera PPE/fire safety monitoring daemon")]
struct Args {
    /// Config file path (falls back to the SENTINEL_CONFIG env var, then
    /// built-in demo defaults).
    #[arg(long, env = "SENTINEL_CONFIG")]
    config: Option<PathBuf>,

    /// Override the alert output file.
    #[arg(long)]
    alerts: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = SentinelConfig::load_from(args.config.as_deref())?;
    if let Some(path) = args.alerts {
        cfg.alerts_path = path;
    }

    let mut registry = ModelRegistry::new();
    for spec in &cfg.models {
        let backend = open_model_set(&spec.path, cfg.conf_threshold, cfg.iou_threshold)
            .with_context(|| format!("loading model set '{}'", spec.name))?;
        registry.register(backend);
    }

    let faceid = match &cfg.face.source {
        Some(source) => Some(
            open_identifier(source, cfg.face.accept_threshold)
                .context("loading face identifier")?,
        ),
        None => None,
    };
    if faceid.is_none() {
        log::info!("face identification disabled (no face source configured)");
    }

    let pipeline = Pipeline::start(&cfg, registry, faceid)?;

    let shutdown = pipeline.shutdown_handle();
    ctrlc::set_handler(move || {
        log::info!("interrupt received, shutting down");
        shutdown.trigger();
    })
    .context("install interrupt handler")?;

    let mut writer = JsonlAlertWriter::create(&cfg.alerts_path)?;
    log::info!(
        "sentineld running: {} cameras, alerts -> {}",
        cfg.cameras.len(),
        writer.path().display()
    );

    let alerts = pipeline.alerts().clone();
    let shutdown = pipeline.shutdown_handle();
    let mut alert_count = 0u64;
    loop {
        match alerts.recv_timeout(ALERT_POLL) {
            Ok(alert) => {
                alert_count += 1;
                log::warn!(
                    "alert #{}: {:?} camera={} track={:?} person={:?} violations={:?}",
                    alert_count,
                    alert.kind,
                    alert.camera_id,
                    alert.track_id,
                    alert.person_name,
                    alert.violations
                );
                if let Err(e) = writer.append(&alert) {
                    log::error!("failed to persist alert: {e:#}");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if shutdown.is_set() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    pipeline.stop();
    log::info!("sentineld stopped after {} alerts", alert_count);
    Ok(())
}
