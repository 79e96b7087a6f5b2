//! Pipeline assembly: queues, stage threads, and shutdown.
//!
//! Three independently scheduled stages communicate exclusively through
//! queues; frame ownership transfers fully at each hop:
//!
//! ```text
//! capture (per camera) -> [bounded frame queue] -> dispatch -> Detector
//!     -> [results queue] -> violation engine -> [alert queue] -> sink
//! ```
//!
//! Every blocking read uses a short timeout and re-checks the shared
//! shutdown flag, so a stop signal reaches all stages within bounded
//! latency. No stage holds a lock across a blocking call, and no stage's
//! transient failure can take down a sibling.

mod dispatch;
pub mod queue;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::alert::Alert;
use crate::config::SentinelConfig;
use crate::detect::registry::ModelRegistry;
use crate::detect::result::DetectionBatch;
use crate::faceid::FaceIdentifier;
use crate::ingest::capture_loop;
use crate::track::TrackerRegistry;
use crate::violation::ViolationEngine;

use queue::frame_queue;

/// Poll interval for the violation stage's blocking read; bounds shutdown
/// latency.
const RESULTS_POLL: Duration = Duration::from_millis(250);

/// Shared stop signal. Cloned into every stage thread.
#[derive(Clone)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Sleep up to `duration`, waking early when the flag is triggered.
    pub(crate) fn sleep(&self, duration: Duration) {
        let step = Duration::from_millis(50);
        let mut remaining = duration;
        while !self.is_set() && remaining > Duration::ZERO {
            let chunk = remaining.min(step);
            std::thread::sleep(chunk);
            remaining = remaining.saturating_sub(chunk);
        }
    }
}

impl Default for ShutdownFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// A running pipeline: stage threads plus the alert channel receiver.
pub struct Pipeline {
    shutdown: ShutdownFlag,
    workers: Vec<JoinHandle<()>>,
    alerts: Receiver<Alert>,
}

impl Pipeline {
    /// Start all stages. Fails fast when a capability cannot be
    /// constructed or warmed up; after this returns, stage failures are
    /// transient by design.
    pub fn start(
        config: &SentinelConfig,
        mut registry: ModelRegistry,
        faceid: Option<Box<dyn FaceIdentifier>>,
    ) -> Result<Self> {
        if config.cameras.is_empty() {
            bail!("no cameras configured");
        }
        if registry.is_empty() {
            bail!("no model sets loaded");
        }
        registry.warm_up_all()?;

        let (frame_tx, frame_rx) = frame_queue(config.frame_queue_capacity);
        let (results_tx, results_rx) = unbounded::<DetectionBatch>();
        let (alert_tx, alert_rx) = unbounded::<Alert>();

        let shutdown = ShutdownFlag::new();
        let mut workers = Vec::with_capacity(config.cameras.len() + 2);

        for camera in &config.cameras {
            let camera = camera.clone();
            let queue = frame_tx.clone();
            let flag = shutdown.clone();
            let target_fps = config.target_fps;
            let handle = std::thread::Builder::new()
                .name(format!("capture-{}", camera.id))
                .spawn(move || capture_loop(camera, queue, target_fps, flag))
                .context("spawn capture thread")?;
            workers.push(handle);
        }
        // The stage threads hold the only producer clones from here on, so
        // the channels disconnect once they stop.
        drop(frame_tx);

        let batch_size = config.batch_size;
        let flag = shutdown.clone();
        workers.push(
            std::thread::Builder::new()
                .name("dispatch".to_string())
                .spawn(move || {
                    dispatch::dispatch_loop(frame_rx, results_tx, registry, batch_size, flag)
                })
                .context("spawn dispatch thread")?,
        );

        let engine = ViolationEngine::new(
            config.violations.clone(),
            TrackerRegistry::new(config.tracker.clone()),
            faceid,
        );
        let flag = shutdown.clone();
        workers.push(
            std::thread::Builder::new()
                .name("violation".to_string())
                .spawn(move || engine_loop(results_rx, alert_tx, engine, flag))
                .context("spawn violation thread")?,
        );

        log::info!(
            "pipeline started: {} cameras, frame queue capacity {}, batch size {}",
            config.cameras.len(),
            config.frame_queue_capacity,
            config.batch_size
        );

        Ok(Self {
            shutdown,
            workers,
            alerts: alert_rx,
        })
    }

    /// Alert channel receiver. At-least-once delivery to whoever drains it.
    pub fn alerts(&self) -> &Receiver<Alert> {
        &self.alerts
    }

    pub fn shutdown_handle(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    /// Trigger shutdown and join every stage thread.
    pub fn stop(self) {
        self.shutdown.trigger();
        for worker in self.workers {
            if let Err(e) = worker.join() {
                log::error!("stage thread panicked: {e:?}");
            }
        }
        log::info!("pipeline stopped");
    }
}

/// Violation stage loop: single consumer of the results queue, so per-track
/// state never sees concurrent access.
fn engine_loop(
    results: Receiver<DetectionBatch>,
    alerts: Sender<Alert>,
    mut engine: ViolationEngine,
    shutdown: ShutdownFlag,
) {
    while !shutdown.is_set() {
        match results.recv_timeout(RESULTS_POLL) {
            Ok(batch) => {
                for alert in engine.process(batch) {
                    if alerts.send(alert).is_err() {
                        log::debug!("violation stage: alert consumer gone, stopping");
                        return;
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                log::debug!("violation stage: dispatch gone, stopping");
                return;
            }
        }
    }
}
