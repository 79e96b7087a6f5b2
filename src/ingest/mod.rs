//! Frame ingestion: video sources and the per-camera capture loop.
//!
//! One capture loop runs per configured camera. The loop is responsible for:
//! - Opening the source, retrying forever on failure with a fixed backoff
//! - Reopening on end-of-stream (loop semantics for finite files)
//! - Pacing reads to the target frame rate
//! - Pushing frames to the shared bounded queue without ever blocking;
//!   when the queue is full the newest frame is dropped
//!
//! Real decoders (RTSP, container formats) are external capabilities behind
//! the `VideoSource` trait; this build ships the synthetic `stub://` source.

mod synthetic;

pub use synthetic::SyntheticSource;

use std::time::{Duration, Instant, SystemTime};

use anyhow::{bail, Result};

use crate::config::CameraFeed;
use crate::frame::Frame;
use crate::pipeline::queue::{FrameQueue, PushOutcome};
use crate::pipeline::ShutdownFlag;

/// Fixed delay before reopening a source that failed to open or read.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

const DEFAULT_STUB_WIDTH: u32 = 640;
const DEFAULT_STUB_HEIGHT: u32 = 480;

/// One decoded frame as produced by a source, before ingestion stamps
/// camera identity, sequence, and capture time onto it.
pub struct SourceFrame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Sequential frame reader with explicit end-of-stream signaling.
pub trait VideoSource: Send {
    /// (Re)open the underlying stream.
    fn connect(&mut self) -> Result<()>;

    /// Read the next frame. `Ok(None)` signals end-of-stream; the capture
    /// loop reopens the source. Errors are treated as a lost stream and
    /// retried after the reconnect delay.
    fn next_frame(&mut self) -> Result<Option<SourceFrame>>;
}

/// Construct a source for a camera URL.
///
/// `stub://name` yields a synthetic source; `stub://name?frames=N` makes it
/// finite, ending the stream every N frames. Anything else needs a real
/// decoder build.
pub fn open_source(url: &str) -> Result<Box<dyn VideoSource>> {
    let Some(rest) = url.strip_prefix("stub://") else {
        bail!("cannot open '{url}': this build has no stream decoder, only stub:// sources");
    };

    let (name, query) = match rest.split_once('?') {
        Some((name, query)) => (name, Some(query)),
        None => (rest, None),
    };
    if name.is_empty() {
        bail!("stub source needs a name, e.g. stub://camera-0");
    }
    let mut source = SyntheticSource::new(url, DEFAULT_STUB_WIDTH, DEFAULT_STUB_HEIGHT);
    if let Some(query) = query {
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("frames", value)) => {
                    let frames: u64 = value
                        .parse()
                        .map_err(|_| anyhow::anyhow!("bad frames value in '{url}'"))?;
                    source = source.with_frame_limit(frames);
                }
                _ => bail!("unsupported stub source option '{pair}' in '{url}'"),
            }
        }
    }
    Ok(Box::new(source))
}

/// Per-camera capture loop: the frame-source pipeline stage.
///
/// Runs until the shutdown flag is set. Never propagates an error; source
/// failures are logged and retried forever, which is intended for
/// long-running feeds (and a known risk for permanently broken inputs).
pub(crate) fn capture_loop(
    camera: CameraFeed,
    queue: FrameQueue,
    target_fps: u32,
    shutdown: ShutdownFlag,
) {
    let interval = Duration::from_secs_f64(1.0 / target_fps.max(1) as f64);
    let mut seq: u64 = 0;

    while !shutdown.is_set() {
        let mut source = match open_source(&camera.url) {
            Ok(source) => source,
            Err(e) => {
                log::warn!("camera {}: cannot open source: {e:#}", camera.id);
                shutdown.sleep(RECONNECT_DELAY);
                continue;
            }
        };
        if let Err(e) = source.connect() {
            log::warn!("camera {}: connect failed: {e:#}", camera.id);
            shutdown.sleep(RECONNECT_DELAY);
            continue;
        }
        log::info!("camera {}: source connected ({})", camera.id, camera.url);

        let mut stream_lost = false;
        while !shutdown.is_set() {
            let started = Instant::now();

            match source.next_frame() {
                Ok(Some(raw)) => {
                    seq += 1;
                    let frame = Frame::new(
                        camera.id,
                        seq,
                        SystemTime::now(),
                        raw.pixels,
                        raw.width,
                        raw.height,
                    );
                    if queue.push(frame) == PushOutcome::Dropped {
                        log::debug!("camera {}: frame queue full, dropping frame", camera.id);
                    }
                }
                Ok(None) => {
                    log::info!("camera {}: stream ended, reopening", camera.id);
                    break;
                }
                Err(e) => {
                    log::warn!("camera {}: read failed: {e:#}", camera.id);
                    stream_lost = true;
                    break;
                }
            }

            let elapsed = started.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }

        if stream_lost {
            shutdown.sleep(RECONNECT_DELAY);
        }
    }

    log::debug!("camera {}: capture loop stopped", camera.id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_source_parses_stub_urls() {
        assert!(open_source("stub://camera-0").is_ok());
        assert!(open_source("stub://camera-0?frames=5").is_ok());
        assert!(open_source("stub://camera-0?frames=abc").is_err());
        assert!(open_source("stub://camera-0?loop=1").is_err());
        assert!(open_source("stub://").is_err());
        assert!(open_source("rtsp://10.0.0.5/stream").is_err());
    }
}
