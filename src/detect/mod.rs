pub mod backend;
pub mod backends;
pub mod registry;
pub mod result;

pub use backend::DetectorBackend;
pub use registry::ModelRegistry;
pub use result::{Detection, DetectionBatch};
