//! Frame type carried through the pipeline.
//!
//! A `Frame` is an owned RGB pixel buffer plus capture metadata. It is
//! constructed only by the ingestion layer and moves stage-to-stage through
//! the queues: exactly one stage owns a frame at a time, and it is dropped
//! once the violation engine is done with it.

use std::time::SystemTime;

use image::{imageops, ImageBuffer, Rgb, RgbImage};

use crate::geometry::BBox;

/// One captured video frame, RGB, row-major.
pub struct Frame {
    pub camera_id: u32,
    /// Per-camera sequence number, monotonically increasing.
    pub seq: u64,
    /// Capture timestamp. Downstream cooldown arithmetic uses this, not the
    /// wall clock at processing time.
    pub timestamp: SystemTime,
    pub width: u32,
    pub height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    /// Create a new frame. Called only by the ingestion layer; `pixels` must
    /// be `width * height * 3` bytes of RGB data.
    pub(crate) fn new(
        camera_id: u32,
        seq: u64,
        timestamp: SystemTime,
        pixels: Vec<u8>,
        width: u32,
        height: u32,
    ) -> Self {
        debug_assert_eq!(pixels.len(), (width * height * 3) as usize);
        Self {
            camera_id,
            seq,
            timestamp,
            width,
            height,
            pixels,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Crop the region under `bbox`, clamped to the frame bounds.
    ///
    /// Returns `None` for degenerate boxes or boxes that clamp to an empty
    /// region, so callers can skip identity resolution instead of handing a
    /// zero-sized image to the FaceID capability.
    pub fn crop(&self, bbox: &BBox) -> Option<RgbImage> {
        if bbox.is_degenerate() {
            return None;
        }

        let x1 = bbox.x1.max(0.0) as u32;
        let y1 = bbox.y1.max(0.0) as u32;
        let x2 = (bbox.x2.min(self.width as f32)).max(0.0) as u32;
        let y2 = (bbox.y2.min(self.height as f32)).max(0.0) as u32;
        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        let full: ImageBuffer<Rgb<u8>, &[u8]> =
            ImageBuffer::from_raw(self.width, self.height, self.pixels.as_slice())?;
        Some(imageops::crop_imm(&full, x1, y1, x2 - x1, y2 - y1).to_image())
    }
}
