pub mod registry;
pub mod tracker;

pub use registry::{TrackIdAllocator, TrackerRegistry};
pub use tracker::{IouTracker, Track, TrackerConfig};
