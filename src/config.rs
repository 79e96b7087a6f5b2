//! Daemon configuration.
//!
//! Loaded once at startup: a JSON config file named by `SENTINEL_CONFIG`
//! (every field optional, defaults below), then selective env-var
//! overrides, then validation. Defaults run the synthetic demo setup so the
//! daemon starts without any file present.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::track::TrackerConfig;
use crate::violation::ViolationConfig;

const DEFAULT_CAMERA_URL: &str = "stub://camera-0";
const DEFAULT_TARGET_FPS: u32 = 10;
const DEFAULT_FRAME_QUEUE_CAPACITY: usize = 50;
const DEFAULT_BATCH_SIZE: usize = 4;
const DEFAULT_CONF_THRESHOLD: f32 = 0.3;
const DEFAULT_IOU_THRESHOLD: f32 = 0.4;
const DEFAULT_TRACK_BUFFER: u32 = 30;
const DEFAULT_MATCH_THRESHOLD: f32 = 0.8;
const DEFAULT_CONFIRM_FRAMES: u32 = 3;
const DEFAULT_COOLDOWN_SECS: u64 = 10;
const DEFAULT_FACE_ACCEPT_THRESHOLD: f32 = 0.5;
const DEFAULT_ALERTS_PATH: &str = "alerts.jsonl";

fn default_required_ppe() -> Vec<String> {
    vec!["helmet".to_string(), "vest".to_string()]
}

fn default_models() -> Vec<ModelSpec> {
    vec![
        ModelSpec {
            name: "ppe".to_string(),
            path: "stub://ppe-demo".to_string(),
        },
        ModelSpec {
            name: "fire".to_string(),
            path: "stub://fire-demo".to_string(),
        },
    ]
}

#[derive(Debug, Deserialize, Default)]
struct SentinelConfigFile {
    cameras: Option<Vec<CameraFile>>,
    target_fps: Option<u32>,
    frame_queue_capacity: Option<usize>,
    inference: Option<InferenceFile>,
    tracker: Option<TrackerFile>,
    violations: Option<ViolationsFile>,
    face: Option<FaceFile>,
    alerts: Option<AlertsFile>,
}

#[derive(Debug, Deserialize)]
struct CameraFile {
    id: u32,
    url: String,
}

#[derive(Debug, Deserialize, Default)]
struct InferenceFile {
    batch_size: Option<usize>,
    conf_threshold: Option<f32>,
    iou_threshold: Option<f32>,
    models: Option<Vec<ModelFile>>,
}

#[derive(Debug, Deserialize)]
struct ModelFile {
    name: String,
    path: String,
}

#[derive(Debug, Deserialize, Default)]
struct TrackerFile {
    track_threshold: Option<f32>,
    track_buffer: Option<u32>,
    match_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct ViolationsFile {
    confirm_frames: Option<u32>,
    cooldown_seconds: Option<u64>,
    required_ppe: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct FaceFile {
    source: Option<String>,
    accept_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct AlertsFile {
    path: Option<PathBuf>,
}

/// One configured camera feed.
#[derive(Clone, Debug)]
pub struct CameraFeed {
    pub id: u32,
    pub url: String,
}

/// One model set to load into the registry.
#[derive(Clone, Debug)]
pub struct ModelSpec {
    pub name: String,
    pub path: String,
}

#[derive(Clone, Debug)]
pub struct FaceSettings {
    /// Face store source; `None` disables identity resolution.
    pub source: Option<String>,
    pub accept_threshold: f32,
}

#[derive(Clone, Debug)]
pub struct SentinelConfig {
    pub cameras: Vec<CameraFeed>,
    pub target_fps: u32,
    pub frame_queue_capacity: usize,
    pub batch_size: usize,
    pub conf_threshold: f32,
    /// Non-maximum-suppression IoU threshold handed to the model sets.
    pub iou_threshold: f32,
    pub models: Vec<ModelSpec>,
    pub tracker: TrackerConfig,
    pub violations: ViolationConfig,
    pub face: FaceSettings,
    pub alerts_path: PathBuf,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self::from_file(SentinelConfigFile::default())
    }
}

impl SentinelConfig {
    /// Load from the file named by `SENTINEL_CONFIG` (defaults apply when
    /// unset), then env overrides, then validation.
    pub fn load() -> Result<Self> {
        let path = std::env::var("SENTINEL_CONFIG").ok();
        Self::load_from(path.as_deref().map(Path::new))
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => SentinelConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SentinelConfigFile) -> Self {
        let cameras = file
            .cameras
            .map(|cameras| {
                cameras
                    .into_iter()
                    .map(|c| CameraFeed { id: c.id, url: c.url })
                    .collect()
            })
            .unwrap_or_else(|| {
                vec![CameraFeed {
                    id: 0,
                    url: DEFAULT_CAMERA_URL.to_string(),
                }]
            });

        let inference = file.inference.unwrap_or_default();
        let conf_threshold = inference.conf_threshold.unwrap_or(DEFAULT_CONF_THRESHOLD);
        let models = inference
            .models
            .map(|models| {
                models
                    .into_iter()
                    .map(|m| ModelSpec {
                        name: m.name,
                        path: m.path,
                    })
                    .collect()
            })
            .unwrap_or_else(default_models);

        let tracker_file = file.tracker.unwrap_or_default();
        let tracker = TrackerConfig {
            // The tracker's association floor follows the detection
            // confidence threshold unless configured separately.
            track_threshold: tracker_file.track_threshold.unwrap_or(conf_threshold),
            track_buffer: tracker_file.track_buffer.unwrap_or(DEFAULT_TRACK_BUFFER),
            match_threshold: tracker_file
                .match_threshold
                .unwrap_or(DEFAULT_MATCH_THRESHOLD),
        };

        let violations_file = file.violations.unwrap_or_default();
        let violations = ViolationConfig {
            confirm_frames: violations_file
                .confirm_frames
                .unwrap_or(DEFAULT_CONFIRM_FRAMES),
            cooldown: Duration::from_secs(
                violations_file.cooldown_seconds.unwrap_or(DEFAULT_COOLDOWN_SECS),
            ),
            required_ppe: violations_file
                .required_ppe
                .unwrap_or_else(default_required_ppe),
        };

        let face_file = file.face.unwrap_or_default();
        let face = FaceSettings {
            source: face_file.source,
            accept_threshold: face_file
                .accept_threshold
                .unwrap_or(DEFAULT_FACE_ACCEPT_THRESHOLD),
        };

        Self {
            cameras,
            target_fps: file.target_fps.unwrap_or(DEFAULT_TARGET_FPS),
            frame_queue_capacity: file
                .frame_queue_capacity
                .unwrap_or(DEFAULT_FRAME_QUEUE_CAPACITY),
            batch_size: inference.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            conf_threshold,
            iou_threshold: inference.iou_threshold.unwrap_or(DEFAULT_IOU_THRESHOLD),
            models,
            tracker,
            violations,
            face,
            alerts_path: file
                .alerts
                .and_then(|alerts| alerts.path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ALERTS_PATH)),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(fps) = std::env::var("SENTINEL_TARGET_FPS") {
            self.target_fps = fps
                .parse()
                .map_err(|_| anyhow!("SENTINEL_TARGET_FPS must be an integer"))?;
        }
        if let Ok(path) = std::env::var("SENTINEL_ALERTS_PATH") {
            if !path.trim().is_empty() {
                self.alerts_path = PathBuf::from(path);
            }
        }
        if let Ok(source) = std::env::var("SENTINEL_FACE_SOURCE") {
            if !source.trim().is_empty() {
                self.face.source = Some(source);
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.cameras.is_empty() {
            return Err(anyhow!("at least one camera must be configured"));
        }
        let mut ids: Vec<u32> = self.cameras.iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != self.cameras.len() {
            return Err(anyhow!("camera ids must be unique"));
        }
        if self.target_fps == 0 {
            return Err(anyhow!("target_fps must be greater than zero"));
        }
        if self.frame_queue_capacity == 0 {
            return Err(anyhow!("frame_queue_capacity must be greater than zero"));
        }
        if self.batch_size == 0 {
            return Err(anyhow!("inference batch_size must be greater than zero"));
        }
        if self.models.is_empty() {
            return Err(anyhow!("at least one model set must be configured"));
        }
        for threshold in [
            self.conf_threshold,
            self.iou_threshold,
            self.tracker.track_threshold,
            self.tracker.match_threshold,
            self.face.accept_threshold,
        ] {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(anyhow!("thresholds must be within [0, 1], got {threshold}"));
            }
        }
        if self.violations.confirm_frames == 0 {
            return Err(anyhow!("confirm_frames must be greater than zero"));
        }
        if self.violations.required_ppe.iter().any(|c| c.trim().is_empty()) {
            return Err(anyhow!("required_ppe entries must be non-empty"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SentinelConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
