use anyhow::{bail, Context, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Registry of loaded model sets.
///
/// The dispatch stage queries every registered model set once per batch and
/// concatenates their outputs per frame index, so downstream stages see a
/// single detection list per frame and stay agnostic to how many models
/// produced it.
pub struct ModelRegistry {
    backends: Vec<Box<dyn DetectorBackend>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
        }
    }

    pub fn register(&mut self, backend: Box<dyn DetectorBackend>) {
        log::info!("registered model set '{}'", backend.name());
        self.backends.push(backend);
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Warm up every model set. Called once at startup; any failure aborts
    /// pipeline startup.
    pub fn warm_up_all(&mut self) -> Result<()> {
        for backend in &mut self.backends {
            backend
                .warm_up()
                .with_context(|| format!("warm-up failed for model set '{}'", backend.name()))?;
        }
        Ok(())
    }

    /// Run every model set over `frames` and merge outputs per frame index.
    ///
    /// Input order is preserved exactly: `result[i]` holds the concatenated
    /// detections for `frames[i]`. Malformed detections are dropped and
    /// logged here so they never reach the tracker.
    pub fn detect_all(&mut self, frames: &[Frame]) -> Result<Vec<Vec<Detection>>> {
        let mut merged: Vec<Vec<Detection>> = vec![Vec::new(); frames.len()];

        for backend in &mut self.backends {
            let per_frame = backend
                .detect_batch(frames)
                .with_context(|| format!("model set '{}' failed", backend.name()))?;
            if per_frame.len() != frames.len() {
                bail!(
                    "model set '{}' returned {} result lists for a batch of {}",
                    backend.name(),
                    per_frame.len(),
                    frames.len()
                );
            }
            for (slot, detections) in merged.iter_mut().zip(per_frame) {
                for detection in detections {
                    if detection.is_well_formed() {
                        slot.push(detection);
                    } else {
                        log::warn!(
                            "dropping malformed detection from model set '{}': {:?}",
                            backend.name(),
                            detection
                        );
                    }
                }
            }
        }

        Ok(merged)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BBox;
    use std::time::UNIX_EPOCH;

    struct FixedBackend {
        name: &'static str,
        label: &'static str,
        score: f32,
    }

    impl DetectorBackend for FixedBackend {
        fn name(&self) -> &'static str {
            self.name
        }

        fn detect_batch(&mut self, frames: &[Frame]) -> Result<Vec<Vec<Detection>>> {
            Ok(frames
                .iter()
                .map(|_| {
                    vec![Detection::new(
                        BBox::new(0.0, 0.0, 10.0, 10.0),
                        self.score,
                        self.label,
                    )]
                })
                .collect())
        }
    }

    struct FailingBackend;

    impl DetectorBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn detect_batch(&mut self, _frames: &[Frame]) -> Result<Vec<Vec<Detection>>> {
            bail!("inference device lost")
        }
    }

    struct ShortBackend;

    impl DetectorBackend for ShortBackend {
        fn name(&self) -> &'static str {
            "short"
        }

        fn detect_batch(&mut self, _frames: &[Frame]) -> Result<Vec<Vec<Detection>>> {
            Ok(vec![])
        }
    }

    fn frames(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame::new(0, i as u64, UNIX_EPOCH, vec![0u8; 4 * 4 * 3], 4, 4))
            .collect()
    }

    #[test]
    fn concatenates_model_sets_per_frame_in_registration_order() {
        let mut registry = ModelRegistry::new();
        registry.register(Box::new(FixedBackend {
            name: "ppe",
            label: "helmet",
            score: 0.8,
        }));
        registry.register(Box::new(FixedBackend {
            name: "fire",
            label: "fire",
            score: 0.7,
        }));

        let result = registry.detect_all(&frames(2)).unwrap();
        assert_eq!(result.len(), 2);
        for per_frame in &result {
            assert_eq!(per_frame.len(), 2);
            assert_eq!(per_frame[0].label, "helmet");
            assert_eq!(per_frame[1].label, "fire");
        }
    }

    #[test]
    fn backend_failure_propagates_so_the_batch_is_dropped() {
        let mut registry = ModelRegistry::new();
        registry.register(Box::new(FailingBackend));
        assert!(registry.detect_all(&frames(1)).is_err());
    }

    #[test]
    fn misaligned_result_length_is_an_error() {
        let mut registry = ModelRegistry::new();
        registry.register(Box::new(ShortBackend));
        assert!(registry.detect_all(&frames(2)).is_err());
    }

    #[test]
    fn malformed_detections_are_dropped_not_fatal() {
        struct MalformedBackend;

        impl DetectorBackend for MalformedBackend {
            fn name(&self) -> &'static str {
                "malformed"
            }

            fn detect_batch(&mut self, frames: &[Frame]) -> Result<Vec<Vec<Detection>>> {
                Ok(frames
                    .iter()
                    .map(|_| {
                        vec![
                            Detection::new(BBox::new(0.0, 0.0, 5.0, 5.0), 0.9, "person"),
                            Detection::new(BBox::new(0.0, 0.0, 5.0, 5.0), 0.9, ""),
                        ]
                    })
                    .collect())
            }
        }

        let mut registry = ModelRegistry::new();
        registry.register(Box::new(MalformedBackend));

        let result = registry.detect_all(&frames(1)).unwrap();
        assert_eq!(result[0].len(), 1);
        assert_eq!(result[0][0].label, "person");
    }
}
