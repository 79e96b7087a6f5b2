use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::Frame;

/// Detector backend trait: one loaded model set.
///
/// A backend takes a batch of frames and returns one ordered detection list
/// per input frame. Index alignment with the input batch is part of the
/// contract; the registry rejects a result whose length differs from the
/// batch.
///
/// Backends run on the dispatch thread only. A failed `detect_batch` drops
/// the batch upstream; it must not leave the backend in a broken state for
/// the next call.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a batch of frames.
    fn detect_batch(&mut self, frames: &[Frame]) -> Result<Vec<Vec<Detection>>>;

    /// Optional warm-up hook, called once at pipeline startup. Failure here
    /// is fatal, unlike runtime detect failures.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
