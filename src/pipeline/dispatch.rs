//! Batch dispatch stage: frame queue in, detection batches out.
//!
//! Collects up to `batch_size` frames with non-blocking polls and hands the
//! batch to the model registry in one call. Partial batches are dispatched
//! immediately; the stage never waits for a batch to fill. A detector
//! failure drops the whole batch and the loop continues — this is the only
//! stage allowed to block on the Detector capability.

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::detect::registry::ModelRegistry;
use crate::detect::result::DetectionBatch;
use crate::frame::Frame;
use crate::pipeline::ShutdownFlag;

/// Idle sleep when the frame queue is empty, keeping the poll loop cheap
/// without adding meaningful dispatch latency.
const IDLE_SLEEP: Duration = Duration::from_millis(5);

pub(crate) fn dispatch_loop(
    frames: Receiver<Frame>,
    results: Sender<DetectionBatch>,
    mut registry: ModelRegistry,
    batch_size: usize,
    shutdown: ShutdownFlag,
) {
    log::info!(
        "dispatch stage running: batch size {}, model sets {:?}",
        batch_size,
        registry.names()
    );

    while !shutdown.is_set() {
        let mut batch: Vec<Frame> = Vec::with_capacity(batch_size);
        let mut producers_gone = false;
        while batch.len() < batch_size {
            match frames.try_recv() {
                Ok(frame) => batch.push(frame),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    producers_gone = true;
                    break;
                }
            }
        }

        if batch.is_empty() {
            if producers_gone {
                log::debug!("dispatch stage: all capture threads gone, stopping");
                return;
            }
            std::thread::sleep(IDLE_SLEEP);
            continue;
        }

        let per_frame = match registry.detect_all(&batch) {
            Ok(per_frame) => per_frame,
            Err(e) => {
                log::warn!("inference failed, dropping batch of {}: {e:#}", batch.len());
                continue;
            }
        };

        for (frame, detections) in batch.into_iter().zip(per_frame) {
            let result = DetectionBatch {
                camera_id: frame.camera_id,
                detections,
                frame,
            };
            if results.send(result).is_err() {
                log::debug!("dispatch stage: results consumer gone, stopping");
                return;
            }
        }
    }
}
