use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::track::tracker::{IouTracker, TrackerConfig};

/// Process-wide track-id allocator.
///
/// Owned by the registry and shared by every tracker instance it creates,
/// so ids stay unique across cameras and under concurrent creation.
pub struct TrackIdAllocator {
    next: AtomicU64,
}

impl TrackIdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for TrackIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// One tracker instance per camera, created lazily on first sight.
pub struct TrackerRegistry {
    config: TrackerConfig,
    ids: Arc<TrackIdAllocator>,
    trackers: HashMap<u32, IouTracker>,
}

impl TrackerRegistry {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            ids: Arc::new(TrackIdAllocator::new()),
            trackers: HashMap::new(),
        }
    }

    pub fn tracker_for(&mut self, camera_id: u32) -> &mut IouTracker {
        let config = &self.config;
        let ids = &self.ids;
        self.trackers.entry(camera_id).or_insert_with(|| {
            log::info!("initializing tracker for camera {}", camera_id);
            IouTracker::new(config.clone(), Arc::clone(ids))
        })
    }

    pub fn camera_count(&self) -> usize {
        self.trackers.len()
    }
}
