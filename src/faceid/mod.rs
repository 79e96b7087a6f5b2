//! Face identification capability boundary.
//!
//! The violation engine hands a cropped person image to a `FaceIdentifier`
//! and gets back a name, or the `UNKNOWN_IDENTITY` sentinel when nothing in
//! the enrolled store matches above the acceptance threshold. Detection,
//! embedding, and nearest-neighbor matching live behind this trait; the
//! pipeline treats the capability as pure.
//!
//! Identification failures are per-frame: the engine logs them and retries
//! on the next frame while the track is unresolved.

use anyhow::{bail, Result};
use image::RgbImage;

/// Sentinel returned when no enrolled identity matches.
pub const UNKNOWN_IDENTITY: &str = "unknown";

pub trait FaceIdentifier: Send {
    /// Capability identifier.
    fn name(&self) -> &'static str;

    /// Identify the person in `face`. Returns a resolved name, or
    /// [`UNKNOWN_IDENTITY`] when no match clears the acceptance threshold.
    fn identify(&mut self, face: &RgbImage) -> Result<String>;
}

/// Construct a face identifier from its configured source.
///
/// `stub://<name>` resolves every query to `<name>` (or to the unknown
/// sentinel for `stub://unknown`); real embedding stores are external and
/// rejected at startup in this build.
pub fn open_identifier(source: &str, accept_threshold: f32) -> Result<Box<dyn FaceIdentifier>> {
    if !(0.0..=1.0).contains(&accept_threshold) {
        bail!("face acceptance threshold must be within [0, 1], got {accept_threshold}");
    }
    match source.strip_prefix("stub://") {
        Some(name) if !name.is_empty() => Ok(Box::new(StubIdentifier::resolving(name.to_string()))),
        Some(_) => bail!("stub face identifier needs a name, e.g. stub://amir"),
        None => bail!(
            "cannot load face store '{source}': this build has no embedding backend, only stub:// identifiers"
        ),
    }
}

// ----------------------------------------------------------------------------
// Stub identifier for tests and demo configs
// ----------------------------------------------------------------------------

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

enum StubMode {
    Resolving(String),
    Unknown,
    Failing,
}

/// Stub identifier with a scriptable outcome and an observable call count.
pub struct StubIdentifier {
    mode: StubMode,
    calls: Arc<AtomicUsize>,
}

impl StubIdentifier {
    /// Always resolves to `name`.
    pub fn resolving(name: String) -> Self {
        Self {
            mode: StubMode::Resolving(name),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always answers with the unknown sentinel.
    pub fn unknown() -> Self {
        Self {
            mode: StubMode::Unknown,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always fails, for exercising the retry-next-frame path.
    pub fn failing() -> Self {
        Self {
            mode: StubMode::Failing,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle that keeps counting after the identifier moves into the engine.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl FaceIdentifier for StubIdentifier {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn identify(&mut self, _face: &RgbImage) -> Result<String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match &self.mode {
            StubMode::Resolving(name) => Ok(name.clone()),
            StubMode::Unknown => Ok(UNKNOWN_IDENTITY.to_string()),
            StubMode::Failing => bail!("face store unavailable"),
        }
    }
}
