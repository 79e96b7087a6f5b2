//! safety-sentinel: multi-camera PPE and fire safety monitoring.
//!
//! The crate is a streaming pipeline:
//!
//! ```text
//! capture (per camera) -> [bounded frame queue] -> batch dispatch
//!     -> Detector capability -> [results queue]
//!     -> tracking + violation engine -> [alert queue] -> sink
//! ```
//!
//! Frames are ingested at a capped rate per camera and dropped (newest
//! first) when the bounded queue is full, so memory stays bounded no matter
//! how slow inference runs. Detections feed a per-camera IoU tracker; each
//! track carries a violation state machine with temporal confirmation and
//! per-kind alert cooldown. Fire/smoke detections bypass tracking and are
//! forwarded as environmental alerts every frame they appear.
//!
//! Detectors, face identification, and real stream decoders are external
//! capabilities behind traits; this crate ships synthetic `stub://`
//! implementations for tests and demo runs.

pub mod alert;
pub mod config;
pub mod detect;
pub mod faceid;
pub mod frame;
pub mod geometry;
pub mod ingest;
pub mod pipeline;
pub mod track;
pub mod violation;

pub use alert::{Alert, AlertKind, JsonlAlertWriter};
pub use config::{CameraFeed, SentinelConfig};
pub use detect::{DetectorBackend, ModelRegistry};
pub use faceid::{FaceIdentifier, UNKNOWN_IDENTITY};
pub use frame::Frame;
pub use geometry::BBox;
pub use pipeline::Pipeline;
pub use track::TrackerConfig;
pub use violation::ViolationConfig;
