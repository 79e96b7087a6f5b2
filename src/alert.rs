//! Alert records and the JSON-lines writer used by the daemon.
//!
//! Alerts are delivered at-least-once over the alert channel; a consumer
//! needing idempotence should dedupe on (track_id, violations, timestamp).

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Serialize, Serializer};

use crate::geometry::BBox;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Temporally confirmed, cooldown-gated per-track violation.
    PpeViolation,
    /// Momentary fire/smoke detection; no tracking, no cooldown.
    Environmental,
}

#[derive(Clone, Debug, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub camera_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_name: Option<String>,
    pub violations: Vec<String>,
    #[serde(serialize_with = "epoch_seconds")]
    pub timestamp: SystemTime,
    pub bbox: BBox,
}

fn epoch_seconds<S: Serializer>(timestamp: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
    let seconds = timestamp
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();
    serializer.serialize_f64(seconds)
}

/// Append-only JSON-lines alert file, one record per line.
pub struct JsonlAlertWriter {
    out: BufWriter<File>,
    path: PathBuf,
}

impl JsonlAlertWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("cannot open alert file {}", path.display()))?;
        Ok(Self {
            out: BufWriter::new(file),
            path: path.to_path_buf(),
        })
    }

    pub fn append(&mut self, alert: &Alert) -> Result<()> {
        serde_json::to_writer(&mut self.out, alert)
            .with_context(|| format!("cannot serialize alert to {}", self.path.display()))?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
