use crate::frame::Frame;
use crate::geometry::BBox;

/// One detection from a model set: box, confidence, class label.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BBox,
    pub score: f32,
    pub label: String,
}

impl Detection {
    pub fn new(bbox: BBox, score: f32, label: impl Into<String>) -> Self {
        Self {
            bbox,
            score,
            label: label.into(),
        }
    }

    /// A detection the pipeline can act on: finite box, score in [0, 1],
    /// non-empty label. Anything else is dropped-and-logged by the registry
    /// rather than crossing a stage boundary.
    pub fn is_well_formed(&self) -> bool {
        let coords = [self.bbox.x1, self.bbox.y1, self.bbox.x2, self.bbox.y2];
        coords.iter().all(|c| c.is_finite())
            && self.score.is_finite()
            && (0.0..=1.0).contains(&self.score)
            && !self.label.is_empty()
    }
}

/// Detections for one frame, re-associated with its camera after a batched
/// inference call. Owns the originating frame; ownership moves downstream
/// with the result.
pub struct DetectionBatch {
    pub camera_id: u32,
    pub frame: Frame,
    pub detections: Vec<Detection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_detections() {
        let good = Detection::new(BBox::new(0.0, 0.0, 10.0, 10.0), 0.9, "person");
        assert!(good.is_well_formed());

        let nan_box = Detection::new(BBox::new(f32::NAN, 0.0, 10.0, 10.0), 0.9, "person");
        assert!(!nan_box.is_well_formed());

        let bad_score = Detection::new(BBox::new(0.0, 0.0, 10.0, 10.0), 1.5, "person");
        assert!(!bad_score.is_well_formed());

        let no_label = Detection::new(BBox::new(0.0, 0.0, 10.0, 10.0), 0.9, "");
        assert!(!no_label.is_well_formed());
    }
}
