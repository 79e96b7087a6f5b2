//! Detector backend implementations.
//!
//! Real model sets (ONNX/TensorRT/...) are external capabilities loaded by
//! whoever embeds the pipeline; this build ships the scripted stub backends
//! used by tests and `stub://` demo configurations.

mod stub;

pub use stub::ScriptedBackend;

use anyhow::{bail, Result};

use crate::detect::backend::DetectorBackend;

/// Construct a model set from its configured path.
///
/// `stub://` paths resolve to the built-in demo scripts; anything else needs
/// a real inference backend and is rejected at startup (capability
/// construction failure is fatal by design). The NMS IoU threshold is
/// forwarded to real backends; the scripted stubs have nothing to suppress.
pub fn open_model_set(
    path: &str,
    conf_threshold: f32,
    _iou_threshold: f32,
) -> Result<Box<dyn DetectorBackend>> {
    match path {
        "stub://ppe-demo" => Ok(Box::new(
            ScriptedBackend::looping("stub-ppe", stub::ppe_demo_script())
                .with_conf_threshold(conf_threshold),
        )),
        "stub://fire-demo" => Ok(Box::new(
            ScriptedBackend::looping("stub-fire", stub::fire_demo_script())
                .with_conf_threshold(conf_threshold),
        )),
        other if other.starts_with("stub://") => {
            bail!("unknown stub model set '{other}' (expected stub://ppe-demo or stub://fire-demo)")
        }
        other => {
            bail!("cannot load model set '{other}': this build has no inference backend, only stub:// model sets")
        }
    }
}
