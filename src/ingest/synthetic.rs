use anyhow::Result;

use super::{SourceFrame, VideoSource};

/// Synthetic frame source for `stub://` camera URLs.
///
/// Generates deterministic patterned RGB frames. With a frame limit it
/// signals end-of-stream after the limit, which exercises the capture
/// loop's reopen path the way a finite file does.
pub struct SyntheticSource {
    name: String,
    width: u32,
    height: u32,
    frames_per_stream: Option<u64>,
    produced_this_stream: u64,
    total_produced: u64,
}

impl SyntheticSource {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            frames_per_stream: None,
            produced_this_stream: 0,
            total_produced: 0,
        }
    }

    /// Signal end-of-stream every `frames` frames, like a finite file.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frames_per_stream = Some(frames);
        self
    }

    fn generate_pixels(&self) -> Vec<u8> {
        let pixel_count = (self.width * self.height * 3) as usize;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.total_produced) % 256) as u8;
        }
        pixels
    }
}

impl VideoSource for SyntheticSource {
    fn connect(&mut self) -> Result<()> {
        self.produced_this_stream = 0;
        log::info!("SyntheticSource: connected to {} (synthetic)", self.name);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<SourceFrame>> {
        if let Some(limit) = self.frames_per_stream {
            if self.produced_this_stream >= limit {
                return Ok(None);
            }
        }

        self.produced_this_stream += 1;
        self.total_produced += 1;

        Ok(Some(SourceFrame {
            pixels: self.generate_pixels(),
            width: self.width,
            height: self.height,
        }))
    }
}
