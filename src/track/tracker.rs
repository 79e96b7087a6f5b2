//! Per-camera multi-object tracker.
//!
//! Greedy IoU association, deliberately simpler than assignment-optimal
//! matching: each track takes the best still-unmatched detection above the
//! match threshold, in track order. Within one update call a detection is
//! assigned to at most one track and a track to at most one detection.

use std::sync::Arc;

use crate::detect::result::Detection;
use crate::geometry::BBox;
use crate::track::registry::TrackIdAllocator;

/// One tracked identity on a single camera.
#[derive(Clone, Debug)]
pub struct Track {
    /// Unique id, never reused while any track is active.
    pub id: u64,
    pub bbox: BBox,
    pub score: f32,
    /// Update calls this track has lived through.
    pub age: u32,
    /// Matched detections over the track's lifetime.
    pub hits: u32,
    /// Frames since the last match; reset to 0 on any match.
    pub misses: u32,
    pub activated: bool,
}

impl Track {
    fn new(id: u64, bbox: BBox, score: f32) -> Self {
        Self {
            id,
            bbox,
            score,
            age: 0,
            hits: 1,
            misses: 0,
            activated: true,
        }
    }

    fn update(&mut self, bbox: BBox, score: f32) {
        self.bbox = bbox;
        self.score = score;
        self.hits += 1;
        self.misses = 0;
    }

    fn mark_missed(&mut self, buffer: u32) {
        self.misses += 1;
        if self.misses > buffer {
            self.activated = false;
        }
    }
}

#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// Minimum detection score for association and track creation.
    pub track_threshold: f32,
    /// Missed frames a track survives before deactivation.
    pub track_buffer: u32,
    /// Minimum IoU for a track/detection match.
    pub match_threshold: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            track_threshold: 0.5,
            track_buffer: 30,
            match_threshold: 0.8,
        }
    }
}

/// Tracker for one camera. No cross-camera identity linking; ids come from
/// the shared allocator so they stay unique across cameras.
pub struct IouTracker {
    config: TrackerConfig,
    ids: Arc<TrackIdAllocator>,
    tracks: Vec<Track>,
}

impl IouTracker {
    pub fn new(config: TrackerConfig, ids: Arc<TrackIdAllocator>) -> Self {
        Self {
            config,
            ids,
            tracks: Vec::new(),
        }
    }

    /// Advance the tracker one frame and return the active set.
    ///
    /// Detections below the track threshold are split off and currently not
    /// associated (reserved for a second, low-confidence pass).
    pub fn update(&mut self, detections: &[Detection]) -> Vec<Track> {
        for track in &mut self.tracks {
            track.age += 1;
        }

        if detections.is_empty() {
            for track in &mut self.tracks {
                track.mark_missed(self.config.track_buffer);
            }
            self.prune();
            return Vec::new();
        }

        let (high, _low): (Vec<&Detection>, Vec<&Detection>) = detections
            .iter()
            .partition(|d| d.score >= self.config.track_threshold);

        // IoU matrix over the pre-update track boxes.
        let iou: Vec<Vec<f32>> = self
            .tracks
            .iter()
            .map(|t| high.iter().map(|d| t.bbox.iou(&d.bbox)).collect())
            .collect();

        let mut detection_used = vec![false; high.len()];
        let mut track_matched = vec![false; self.tracks.len()];

        for (ti, row) in iou.iter().enumerate() {
            let mut best: Option<usize> = None;
            let mut best_iou = self.config.match_threshold;
            for (di, &value) in row.iter().enumerate() {
                if !detection_used[di] && value > best_iou {
                    best_iou = value;
                    best = Some(di);
                }
            }
            if let Some(di) = best {
                self.tracks[ti].update(high[di].bbox, high[di].score);
                detection_used[di] = true;
                track_matched[ti] = true;
            }
        }

        for (di, used) in detection_used.iter().enumerate() {
            if !used {
                let id = self.ids.next_id();
                log::debug!("track {} created", id);
                self.tracks.push(Track::new(id, high[di].bbox, high[di].score));
            }
        }

        for (ti, matched) in track_matched.iter().enumerate() {
            if !matched {
                self.tracks[ti].mark_missed(self.config.track_buffer);
            }
        }

        self.prune();
        self.tracks.clone()
    }

    pub fn active(&self) -> &[Track] {
        &self.tracks
    }

    fn prune(&mut self) {
        self.tracks.retain(|track| {
            if !track.activated {
                log::debug!("track {} removed after {} misses", track.id, track.misses);
            }
            track.activated
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(config: TrackerConfig) -> IouTracker {
        IouTracker::new(config, Arc::new(TrackIdAllocator::new()))
    }

    fn det(x: f32, y: f32, score: f32) -> Detection {
        Detection::new(BBox::new(x, y, x + 50.0, y + 100.0), score, "person")
    }

    #[test]
    fn disjoint_detections_create_distinct_tracks() {
        let mut tracker = tracker(TrackerConfig::default());

        let tracks = tracker.update(&[det(0.0, 0.0, 0.9), det(300.0, 0.0, 0.9)]);
        assert_eq!(tracks.len(), 2);
        assert_ne!(tracks[0].id, tracks[1].id);
        assert!(tracks.iter().all(|t| t.hits == 1 && t.misses == 0));
    }

    #[test]
    fn one_update_never_double_assigns() {
        let mut tracker = tracker(TrackerConfig {
            match_threshold: 0.1,
            ..TrackerConfig::default()
        });

        tracker.update(&[det(0.0, 0.0, 0.9), det(10.0, 0.0, 0.9)]);
        // Two overlapping detections near both tracks: each may match at
        // most one track and vice versa.
        let tracks = tracker.update(&[det(2.0, 0.0, 0.9), det(12.0, 0.0, 0.9)]);

        assert_eq!(tracks.len(), 2);
        let matched: Vec<u64> = tracks.iter().filter(|t| t.hits == 2).map(|t| t.id).collect();
        assert_eq!(matched.len(), 2, "both tracks matched exactly once");
    }

    #[test]
    fn match_resets_miss_counter() {
        let mut tracker = tracker(TrackerConfig::default());

        tracker.update(&[det(0.0, 0.0, 0.9)]);
        tracker.update(&[]);
        let tracks = tracker.update(&[det(0.0, 0.0, 0.9)]);

        // The empty update returns nothing, but the track survives with one
        // miss and is recovered by the next match.
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].misses, 0);
        assert_eq!(tracks[0].hits, 2);
    }

    #[test]
    fn track_deactivates_exactly_when_misses_exceed_buffer() {
        let buffer = 3;
        let mut tracker = tracker(TrackerConfig {
            track_buffer: buffer,
            ..TrackerConfig::default()
        });

        tracker.update(&[det(0.0, 0.0, 0.9)]);
        for expected_misses in 1..=buffer {
            tracker.update(&[]);
            assert_eq!(tracker.active().len(), 1, "still alive within the buffer");
            assert_eq!(tracker.active()[0].misses, expected_misses);
        }

        tracker.update(&[]);
        assert!(tracker.active().is_empty(), "removed once misses exceed buffer");
    }

    #[test]
    fn empty_update_returns_empty_set() {
        let mut tracker = tracker(TrackerConfig::default());
        tracker.update(&[det(0.0, 0.0, 0.9)]);

        let tracks = tracker.update(&[]);
        assert!(tracks.is_empty());
        assert_eq!(tracker.active().len(), 1);
    }

    #[test]
    fn low_confidence_detections_neither_match_nor_create() {
        let mut tracker = tracker(TrackerConfig::default());

        tracker.update(&[det(0.0, 0.0, 0.9)]);
        let tracks = tracker.update(&[det(0.0, 0.0, 0.3)]);

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].misses, 1, "low-confidence detection is not a match");
        assert_eq!(tracks[0].hits, 1, "and does not create a second track");
    }

    #[test]
    fn unmatched_far_detection_creates_a_new_track() {
        let mut tracker = tracker(TrackerConfig::default());

        tracker.update(&[det(0.0, 0.0, 0.9)]);
        let tracks = tracker.update(&[det(0.0, 0.0, 0.9), det(400.0, 0.0, 0.9)]);

        assert_eq!(tracks.len(), 2);
        let ids: Vec<u64> = tracks.iter().map(|t| t.id).collect();
        assert_ne!(ids[0], ids[1]);
    }
}
