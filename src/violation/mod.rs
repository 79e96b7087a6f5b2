//! Violation engine: the tracking + decision stage.
//!
//! Consumes detection batches, one camera frame at a time, and is
//! responsible for:
//! - Partitioning detections into persons, environmental classes, PPE items
//! - Updating the camera's tracker with the person boxes
//! - Resolving identity at most once per track via the FaceID capability
//! - Classifying PPE per track: explicit "no-X" items overlapping the
//!   person are immediate violations; required items with no overlapping
//!   compliant detection become "missing-X" violations
//! - Temporal confirmation with a per-track counter shared across kinds,
//!   then per-kind cooldown-gated alert emission
//! - Forwarding fire/smoke as environmental alerts every frame they
//!   appear, with no tracking, cooldown, or dedup
//!
//! The engine runs on a single consumer thread, so per-track and per-camera
//! state never sees concurrent access. Scaling to multiple workers would
//! require partitioning strictly by camera id.

pub mod state;

pub use state::{PersonState, PersonStateMap};

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;

use crate::alert::{Alert, AlertKind};
use crate::detect::result::{Detection, DetectionBatch};
use crate::faceid::{FaceIdentifier, UNKNOWN_IDENTITY};
use crate::geometry::BBox;
use crate::track::{Track, TrackerRegistry};

pub const PERSON_LABEL: &str = "person";
pub const ENVIRONMENTAL_LABELS: [&str; 2] = ["fire", "smoke"];
const NEGATIVE_PREFIX: &str = "no-";
const MISSING_PREFIX: &str = "missing-";

#[derive(Clone, Debug)]
pub struct ViolationConfig {
    /// Consecutive qualifying frames before an alert may fire.
    pub confirm_frames: u32,
    /// Minimum gap between alerts of the same kind for one track.
    pub cooldown: Duration,
    /// PPE classes every tracked person must carry (e.g. helmet, vest).
    pub required_ppe: Vec<String>,
}

impl Default for ViolationConfig {
    fn default() -> Self {
        Self {
            confirm_frames: 3,
            cooldown: Duration::from_secs(10),
            required_ppe: vec!["helmet".to_string(), "vest".to_string()],
        }
    }
}

pub struct ViolationEngine {
    config: ViolationConfig,
    trackers: TrackerRegistry,
    states: PersonStateMap,
    faceid: Option<Box<dyn FaceIdentifier>>,
    active_by_camera: HashMap<u32, HashSet<u64>>,
}

impl ViolationEngine {
    pub fn new(
        config: ViolationConfig,
        trackers: TrackerRegistry,
        faceid: Option<Box<dyn FaceIdentifier>>,
    ) -> Self {
        Self {
            config,
            trackers,
            states: PersonStateMap::new(),
            faceid,
            active_by_camera: HashMap::new(),
        }
    }

    /// Process one camera frame's detections; returns the alerts to emit.
    pub fn process(&mut self, batch: DetectionBatch) -> Vec<Alert> {
        let mut persons: Vec<Detection> = Vec::new();
        let mut environmental: Vec<&Detection> = Vec::new();
        let mut items: Vec<&Detection> = Vec::new();
        for detection in &batch.detections {
            if detection.label == PERSON_LABEL {
                persons.push(detection.clone());
            } else if ENVIRONMENTAL_LABELS.contains(&detection.label.as_str()) {
                environmental.push(detection);
            } else {
                items.push(detection);
            }
        }

        let tracker = self.trackers.tracker_for(batch.camera_id);
        let tracks = tracker.update(&persons);
        // The update's return value is empty on a no-detection frame even
        // while tracks are still alive inside the buffer, so eviction keys
        // off the tracker's active set instead.
        let alive: HashSet<u64> = tracker.active().iter().map(|t| t.id).collect();
        self.evict_dead_states(batch.camera_id, alive);

        let mut alerts = Vec::new();
        for track in &tracks {
            let state = self.states.get_or_insert(track.id);

            if !state.is_resolved() {
                if let Some(faceid) = self.faceid.as_mut() {
                    if let Some(face) = batch.frame.crop(&track.bbox) {
                        match faceid.identify(&face) {
                            Ok(name) if name != UNKNOWN_IDENTITY => {
                                log::info!(
                                    "camera {}: track {} identified as {}",
                                    batch.camera_id,
                                    track.id,
                                    name
                                );
                                state.resolve(name);
                            }
                            Ok(_) => {}
                            Err(e) => {
                                // Still unknown for this frame only; retried
                                // next frame while unresolved.
                                log::debug!(
                                    "face identification failed for track {}: {e:#}",
                                    track.id
                                );
                            }
                        }
                    }
                }
            }

            let violations = classify_ppe(&track.bbox, &items, &self.config.required_ppe);
            state.observe(violations, self.config.confirm_frames);

            if state.is_confirmed(self.config.confirm_frames) {
                let kinds = state.alert_kinds(batch.frame.timestamp, self.config.cooldown);
                if !kinds.is_empty() {
                    alerts.push(ppe_alert(&batch, track, state.display_name(), kinds));
                }
            }
        }

        for detection in &environmental {
            alerts.push(Alert {
                kind: AlertKind::Environmental,
                camera_id: batch.camera_id,
                track_id: None,
                person_name: None,
                violations: vec![detection.label.clone()],
                timestamp: batch.frame.timestamp,
                bbox: detection.bbox,
            });
        }

        alerts
    }

    /// Drop person states whose track left the camera's active set, so the
    /// state map stays bounded on long-running feeds. A returning person
    /// gets a fresh track id and re-resolves identity.
    fn evict_dead_states(&mut self, camera_id: u32, alive: HashSet<u64>) {
        if let Some(previous) = self.active_by_camera.get(&camera_id) {
            for track_id in previous.difference(&alive) {
                if self.states.remove(*track_id).is_some() {
                    log::debug!("track {} gone, dropping person state", track_id);
                }
            }
        }
        self.active_by_camera.insert(camera_id, alive);
    }
}

fn ppe_alert(batch: &DetectionBatch, track: &Track, name: &str, kinds: Vec<String>) -> Alert {
    Alert {
        kind: AlertKind::PpeViolation,
        camera_id: batch.camera_id,
        track_id: Some(track.id),
        person_name: Some(name.to_string()),
        violations: kinds,
        timestamp: batch.frame.timestamp,
        bbox: track.bbox,
    }
}

/// Classify one tracked person against the PPE items in the frame.
///
/// Overlap is the plain rectangle test, not IoU: a helmet box touching the
/// person box counts. Items whose label carries the explicit negative
/// prefix are immediate violations; everything else overlapping is recorded
/// as present, and required classes with no present item become
/// "missing-X".
fn classify_ppe(person: &BBox, items: &[&Detection], required: &[String]) -> BTreeSet<String> {
    let mut violations = BTreeSet::new();
    let mut present: HashSet<&str> = HashSet::new();

    for item in items {
        if !item.bbox.overlaps(person) {
            continue;
        }
        if item.label.starts_with(NEGATIVE_PREFIX) {
            violations.insert(item.label.clone());
        } else {
            present.insert(item.label.as_str());
        }
    }

    for class in required {
        if !present.contains(class.as_str()) {
            violations.insert(format!("{MISSING_PREFIX}{class}"));
        }
    }

    violations
}
