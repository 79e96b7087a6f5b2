//! Frame queue facade.
//!
//! The frame queue is the only bounded queue in the pipeline: capacity is
//! fixed at startup and a push against a full queue drops the incoming
//! frame instead of blocking the producer. Results and alerts ride plain
//! unbounded channels; their volume is far lower and dropping them would
//! lose confirmed signals.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::frame::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    Dropped,
}

/// Producer side of the bounded frame queue. Cloned into every capture
/// thread.
#[derive(Clone)]
pub struct FrameQueue {
    tx: Sender<Frame>,
}

impl FrameQueue {
    /// Non-blocking push: the newest frame is dropped when the queue is
    /// full, and also when the consumer is gone during shutdown.
    pub fn push(&self, frame: Frame) -> PushOutcome {
        match self.tx.try_send(frame) {
            Ok(()) => PushOutcome::Queued,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => PushOutcome::Dropped,
        }
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

pub fn frame_queue(capacity: usize) -> (FrameQueue, Receiver<Frame>) {
    let (tx, rx) = bounded(capacity);
    (FrameQueue { tx }, rx)
}
