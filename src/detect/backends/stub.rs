//! Scripted stub backend.
//!
//! Replays a fixed per-frame detection script. Used by tests and by the
//! `stub://` demo model sets, the same way ingestion falls back to synthetic
//! sources for `stub://` camera URLs.

use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::Frame;
use crate::geometry::BBox;

pub struct ScriptedBackend {
    name: &'static str,
    script: Vec<Vec<Detection>>,
    cursor: usize,
    looping: bool,
    conf_threshold: f32,
}

impl ScriptedBackend {
    /// A backend that plays `script` once, then returns empty lists.
    pub fn new(name: &'static str, script: Vec<Vec<Detection>>) -> Self {
        Self {
            name,
            script,
            cursor: 0,
            looping: false,
            conf_threshold: 0.0,
        }
    }

    /// A backend that replays `script` forever.
    pub fn looping(name: &'static str, script: Vec<Vec<Detection>>) -> Self {
        Self {
            looping: true,
            ..Self::new(name, script)
        }
    }

    /// Apply a confidence floor, the way a real model set filters its own
    /// raw outputs before returning them.
    pub fn with_conf_threshold(mut self, threshold: f32) -> Self {
        self.conf_threshold = threshold;
        self
    }

    fn next_entry(&mut self) -> Vec<Detection> {
        if self.script.is_empty() {
            return Vec::new();
        }
        if self.cursor >= self.script.len() {
            if !self.looping {
                return Vec::new();
            }
            self.cursor = 0;
        }
        let entry = self.script[self.cursor].clone();
        self.cursor += 1;
        entry
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn detect_batch(&mut self, frames: &[Frame]) -> Result<Vec<Vec<Detection>>> {
        Ok(frames
            .iter()
            .map(|_| {
                self.next_entry()
                    .into_iter()
                    .filter(|d| d.score >= self.conf_threshold)
                    .collect()
            })
            .collect())
    }
}

/// Demo script for `stub://ppe-demo`: a worker walks through frame, loses
/// their helmet for a stretch, then recovers it.
pub(super) fn ppe_demo_script() -> Vec<Vec<Detection>> {
    let mut script = Vec::with_capacity(60);
    for i in 0..60u32 {
        let x = 40.0 + i as f32 * 4.0;
        let person = BBox::new(x, 80.0, x + 120.0, 400.0);
        let head = BBox::new(x + 30.0, 80.0, x + 90.0, 140.0);
        let torso = BBox::new(x + 20.0, 150.0, x + 100.0, 280.0);

        let mut detections = vec![
            Detection::new(person, 0.91, "person"),
            Detection::new(torso, 0.82, "vest"),
        ];
        if (20..40).contains(&i) {
            detections.push(Detection::new(head, 0.78, "no-helmet"));
        } else {
            detections.push(Detection::new(head, 0.84, "helmet"));
        }
        script.push(detections);
    }
    script
}

/// Demo script for `stub://fire-demo`: mostly clear, a short fire episode.
pub(super) fn fire_demo_script() -> Vec<Vec<Detection>> {
    let mut script = vec![Vec::new(); 100];
    for entry in script.iter_mut().take(55).skip(50) {
        entry.push(Detection::new(
            BBox::new(500.0, 300.0, 600.0, 420.0),
            0.74,
            "fire",
        ));
    }
    script
}
